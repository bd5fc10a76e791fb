//! Configuration for the AttendX client

use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Tunables that do not identify the project
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Keep the signed-in session in memory
    pub persist_session: bool,

    /// The request timeout
    pub request_timeout: Option<Duration>,

    /// The database schema exposed by PostgREST
    pub db_schema: String,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            persist_session: true,
            request_timeout: Some(Duration::from_secs(30)),
            db_schema: "public".to_string(),
        }
    }
}

impl ClientOptions {
    /// Set whether to persist the session
    pub fn with_persist_session(mut self, value: bool) -> Self {
        self.persist_session = value;
        self
    }

    /// Set the request timeout
    pub fn with_request_timeout(mut self, value: Option<Duration>) -> Self {
        self.request_timeout = value;
        self
    }

    /// Set the database schema
    pub fn with_db_schema(mut self, value: &str) -> Self {
        self.db_schema = value.to_string();
        self
    }
}

/// Project coordinates plus client options.
///
/// Load from the environment with [`AppConfig::from_env`], which reads a
/// `.env` file first when one is present.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub url: Url,
    pub anon_key: String,
    pub options: ClientOptions,
}

impl AppConfig {
    /// Creates a configuration, validating the URL and key.
    pub fn new(url_str: &str, anon_key: String) -> Result<Self> {
        let url = Url::parse(url_str)?;
        if anon_key.trim().is_empty() {
            return Err(Error::config("anon_key cannot be empty"));
        }
        Ok(Self {
            url,
            anon_key,
            options: ClientOptions::default(),
        })
    }

    /// Reads `ATTENDX_URL` and `ATTENDX_ANON_KEY`, falling back to
    /// `SUPABASE_URL` and `SUPABASE_ANON_KEY`. `ATTENDX_REQUEST_TIMEOUT_SECS`
    /// and `ATTENDX_DB_SCHEMA` override the defaults.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let url = env_any(&["ATTENDX_URL", "SUPABASE_URL"])
            .ok_or_else(|| Error::config("ATTENDX_URL (or SUPABASE_URL) is not set"))?;
        let key = env_any(&["ATTENDX_ANON_KEY", "SUPABASE_ANON_KEY"])
            .ok_or_else(|| Error::config("ATTENDX_ANON_KEY (or SUPABASE_ANON_KEY) is not set"))?;

        let mut options = ClientOptions::default();
        if let Some(secs) = env_any(&["ATTENDX_REQUEST_TIMEOUT_SECS"]) {
            let secs: u64 = secs.parse().map_err(|_| {
                Error::config(format!("ATTENDX_REQUEST_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            options = options.with_request_timeout(Some(Duration::from_secs(secs)));
        }
        if let Some(schema) = env_any(&["ATTENDX_DB_SCHEMA"]) {
            options = options.with_db_schema(&schema);
        }

        Ok(Self::new(&url, key)?.with_options(options))
    }

    pub fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Project URL without the trailing slash `Url` adds
    pub fn base_url(&self) -> &str {
        self.url.as_str().trim_end_matches('/')
    }
}

fn env_any(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_new_valid() {
        let config = AppConfig::new("http://localhost:54321", "anon".to_string()).unwrap();
        assert_eq!(config.url.to_string(), "http://localhost:54321/");
        assert_eq!(config.base_url(), "http://localhost:54321");
        assert_eq!(config.options.db_schema, "public");
    }

    #[test]
    fn config_new_invalid_url() {
        let config = AppConfig::new("not a valid url", "anon".to_string());
        assert!(matches!(config, Err(Error::Url(_))));
    }

    #[test]
    fn config_new_empty_key() {
        match AppConfig::new("http://localhost:54321", "  ".to_string()) {
            Err(Error::Config(msg)) => assert!(msg.contains("anon_key cannot be empty")),
            other => panic!("Expected Config error for empty key, got {:?}", other),
        }
    }

    #[test]
    fn options_builder() {
        let options = ClientOptions::default()
            .with_request_timeout(None)
            .with_db_schema("school")
            .with_persist_session(false);
        assert!(options.request_timeout.is_none());
        assert_eq!(options.db_schema, "school");
        assert!(!options.persist_session);
    }
}
