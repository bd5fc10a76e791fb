//! AttendX
//!
//! Attendance tracking for schools and colleges. Students, classes,
//! attendance and announcements live in a hosted Supabase project; this crate
//! is the admin dashboard's client side: typed data access with cached reads,
//! the attendance marking sheet, low-attendance reports and exports, and the
//! route gate that keeps the dashboard admin-only.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod export;
pub mod gate;
pub mod models;
pub mod notify;
pub mod reports;
pub mod routes;
pub mod sheet;
pub mod store;
pub mod validation;

use std::sync::Arc;

use attendx_auth::{Auth, AuthOptions, Session};
use reqwest::Client;
use tracing::info;

use crate::api::Dashboard;
use crate::config::AppConfig;
use crate::gate::AuthState;
use crate::store::PostgrestStore;

pub use crate::error::{Error, Result};

/// Entry point: one HTTP client shared by auth and data access
#[derive(Debug, Clone)]
pub struct AttendX {
    config: AppConfig,
    http_client: Client,
    auth: Auth,
}

impl AttendX {
    /// Create a client for the project in `config`
    ///
    /// # Example
    ///
    /// ```
    /// use attendx::{AttendX, config::AppConfig};
    ///
    /// let config = AppConfig::new("https://your-project.supabase.co", "your-anon-key".to_string())?;
    /// let app = AttendX::new(config)?;
    /// # Ok::<(), attendx::Error>(())
    /// ```
    pub fn new(config: AppConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let auth = Auth::new(
            config.base_url(),
            &config.anon_key,
            http_client.clone(),
            AuthOptions {
                persist_session: config.options.persist_session,
            },
        );

        Ok(Self {
            config,
            http_client,
            auth,
        })
    }

    /// [`AppConfig::from_env`] followed by [`AttendX::new`]
    pub fn from_env() -> Result<Self> {
        Self::new(AppConfig::from_env()?)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    /// A data store acting for `session`, or for the anonymous role
    pub fn store(&self, session: Option<&Session>) -> PostgrestStore {
        let store = PostgrestStore::new(&self.config, self.http_client.clone());
        match session {
            Some(session) => store.with_access_token(&session.access_token),
            None => store,
        }
    }

    /// Sign in with email and password and resolve the resulting auth state
    ///
    /// ```no_run
    /// # async fn run() -> attendx::Result<()> {
    /// let app = attendx::AttendX::from_env()?;
    /// let state = app.sign_in("admin@college.edu", "secret").await?;
    /// let dashboard = app.dashboard(&state)?;
    /// let students = dashboard.students().list().await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthState> {
        let session = self.auth.sign_in_with_password(email, password).await?;
        info!(user = %session.user.id, "signed in");
        self.resolve(Some(session)).await
    }

    /// Auth state for the session currently held by the auth client
    pub async fn auth_state(&self) -> Result<AuthState> {
        self.resolve(self.auth.get_session()).await
    }

    /// Revoke the held session. Dashboards opened from it stop working once
    /// the token is rejected.
    pub async fn sign_out(&self) -> Result<()> {
        self.auth.sign_out().await?;
        Ok(())
    }

    async fn resolve(&self, session: Option<Session>) -> Result<AuthState> {
        let store = self.store(session.as_ref());
        gate::resolve_auth_state(&store, session).await
    }

    /// Open the dashboard. Only admin sessions get one.
    pub fn dashboard(&self, state: &AuthState) -> Result<Dashboard> {
        let session = state.admin_session().ok_or_else(|| {
            Error::AccessDenied("the dashboard requires an admin session".to_string())
        })?;
        let store = self.store(None).with_access_token(&session.access_token);
        Ok(Dashboard::new(Arc::new(store), session))
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::api::Dashboard;
    pub use crate::config::{AppConfig, ClientOptions};
    pub use crate::error::{Error, Result};
    pub use crate::gate::{AdminSession, AuthState};
    pub use crate::models::*;
    pub use crate::sheet::AttendanceSheet;
    pub use crate::store::{DataStore, MemoryStore, PostgrestStore};
    pub use crate::validation::{ClassForm, MessageForm, StudentForm};
    pub use crate::AttendX;
}
