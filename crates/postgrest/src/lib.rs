//! PostgREST client for the AttendX data service
//!
//! This crate talks to the table, view and RPC endpoints that the hosted
//! Supabase project exposes under `/rest/v1`.
//!
//! # Features
//!
//! - Query API (`select`, `insert`, `upsert`, `update`, `delete`)
//! - Equality filters and multi-column ordering
//! - RPC function calls
//! - Typed API error details (SQLSTATE code, message, details, hint)

use log::debug;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use url::Url;

/// SQLSTATE raised by Postgres for unique constraint violations.
pub const UNIQUE_VIOLATION: &str = "23505";

/// PostgREST code returned when a singular response has no rows.
pub const NO_ROWS: &str = "PGRST116";

/// Error body returned by PostgREST
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct PostgrestApiErrorDetails {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

impl PostgrestApiErrorDetails {
    /// Whether the error is a unique constraint violation
    pub fn is_unique_violation(&self) -> bool {
        self.code.as_deref() == Some(UNIQUE_VIOLATION)
    }

    /// Whether the error reports that no row matched
    pub fn is_no_rows(&self) -> bool {
        self.code.as_deref() == Some(NO_ROWS)
    }
}

impl fmt::Display for PostgrestApiErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(code) = &self.code {
            parts.push(format!("Code: {}", code));
        }
        if let Some(message) = &self.message {
            parts.push(format!("Message: {}", message));
        }
        if let Some(details) = &self.details {
            parts.push(format!("Details: {}", details));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("Hint: {}", hint));
        }
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum PostgrestError {
    #[error("API error: {details} (Status: {status})")]
    ApiError {
        details: PostgrestApiErrorDetails,
        status: StatusCode,
    },

    #[error("API error (unparsed): {message} (Status: {status})")]
    UnparsedApiError { message: String, status: StatusCode },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[error("JSON serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),
}

impl PostgrestError {
    /// The parsed API error body, if the service returned one
    pub fn details(&self) -> Option<&PostgrestApiErrorDetails> {
        match self {
            PostgrestError::ApiError { details, .. } => Some(details),
            _ => None,
        }
    }

    /// HTTP status of a failed API call
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            PostgrestError::ApiError { status, .. } => Some(*status),
            PostgrestError::UnparsedApiError { status, .. } => Some(*status),
            PostgrestError::NetworkError(e) => e.status(),
            _ => None,
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }
}

/// PostgREST client for one table, view or function
#[derive(Debug, Clone)]
pub struct PostgrestClient {
    base_url: String,
    table: String,
    http_client: Client,
    headers: HeaderMap,
    query_params: Vec<(String, String)>,
    rpc_params: Option<Value>,
}

impl PostgrestClient {
    /// Create a client for `table`
    pub fn new(base_url: &str, api_key: &str, table: &str, http_client: Client) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(api_key) {
            headers.insert("apikey", value);
        }
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            table: table.to_string(),
            http_client,
            headers,
            query_params: Vec::new(),
            rpc_params: None,
        }
    }

    /// Create a client that calls the stored function `function_name`
    pub fn rpc(
        base_url: &str,
        api_key: &str,
        function_name: &str,
        params: Value,
        http_client: Client,
    ) -> Self {
        let mut client = Self::new(base_url, api_key, function_name, http_client);
        client.rpc_params = Some(params);
        client
    }

    /// Add a request header
    pub fn with_header(mut self, key: &str, value: &str) -> Result<Self, PostgrestError> {
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header value: {}", value))
        })?;
        let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|_| {
            PostgrestError::InvalidParameters(format!("Invalid header name: {}", key))
        })?;

        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    /// Send requests on behalf of a signed-in user
    pub fn with_auth(self, token: &str) -> Result<Self, PostgrestError> {
        self.with_header("Authorization", &format!("Bearer {}", token))
    }

    /// Columns to return
    pub fn select(mut self, columns: &str) -> Self {
        self.set_param("select", columns.to_string());
        self
    }

    /// Equality filter
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.query_params
            .push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Order by `column`. Repeated calls add secondary sort keys.
    pub fn order(mut self, column: &str, order: SortOrder) -> Self {
        let term = format!("{}.{}", column, order.as_str());
        match self.query_params.iter_mut().find(|(k, _)| k == "order") {
            Some((_, existing)) => {
                existing.push(',');
                existing.push_str(&term);
            }
            None => self.query_params.push(("order".to_string(), term)),
        }
        self
    }

    /// Limit the number of rows returned
    pub fn limit(mut self, count: u32) -> Self {
        self.set_param("limit", count.to_string());
        self
    }

    /// Name the columns of the unique constraint an upsert resolves against
    pub fn on_conflict(mut self, columns: &str) -> Self {
        self.set_param("on_conflict", columns.to_string());
        self
    }

    fn set_param(&mut self, key: &str, value: String) {
        match self.query_params.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = value,
            None => self.query_params.push((key.to_string(), value)),
        }
    }

    /// Fetch rows
    pub async fn execute<T: for<'de> Deserialize<'de>>(&self) -> Result<Vec<T>, PostgrestError> {
        let url = self.build_url()?;
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .headers(self.headers.clone())
            .send()
            .await?;

        let body = read_body(response).await?;
        serde_json::from_value::<Vec<T>>(body)
            .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
    }

    /// Insert one row or an array of rows
    pub async fn insert<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        let url = self.build_url()?;
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.with_prefer("return=representation"))
            .json(&values)
            .send()
            .await?;

        read_body(response).await
    }

    /// Insert rows, merging into existing rows that collide on the
    /// `on_conflict` columns
    pub async fn upsert<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        let url = self.build_url()?;
        debug!("POST (upsert) {}", url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.with_prefer("resolution=merge-duplicates,return=representation"))
            .json(&values)
            .send()
            .await?;

        read_body(response).await
    }

    /// Update rows matching the filters
    pub async fn update<T: Serialize>(&self, values: T) -> Result<Value, PostgrestError> {
        let url = self.build_url()?;
        debug!("PATCH {}", url);

        let response = self
            .http_client
            .patch(&url)
            .headers(self.with_prefer("return=representation"))
            .json(&values)
            .send()
            .await?;

        read_body(response).await
    }

    /// Delete rows matching the filters
    pub async fn delete(&self) -> Result<Value, PostgrestError> {
        let url = self.build_url()?;
        debug!("DELETE {}", url);

        let response = self
            .http_client
            .delete(&url)
            .headers(self.with_prefer("return=representation"))
            .send()
            .await?;

        read_body(response).await
    }

    /// Call the stored function (POST request)
    pub async fn call_rpc<T: for<'de> Deserialize<'de>>(&self) -> Result<T, PostgrestError> {
        let params = self.rpc_params.as_ref().ok_or_else(|| {
            PostgrestError::InvalidParameters(
                "Client was not created for RPC. Use PostgrestClient::rpc().".to_string(),
            )
        })?;
        let url = format!("{}/rest/v1/rpc/{}", self.base_url, self.table);
        debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .headers(self.headers.clone())
            .json(params)
            .send()
            .await?;

        let body = read_body(response).await?;
        serde_json::from_value::<T>(body).map_err(|e| {
            PostgrestError::DeserializationError(format!(
                "Failed to deserialize RPC response: {}",
                e
            ))
        })
    }

    fn with_prefer(&self, prefer: &'static str) -> HeaderMap {
        let mut headers = self.headers.clone();
        headers.insert(
            HeaderName::from_static("prefer"),
            HeaderValue::from_static(prefer),
        );
        headers
    }

    fn build_url(&self) -> Result<String, PostgrestError> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.table))?;

        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query_params {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.to_string())
    }
}

// Reads a response body, turning non-2xx statuses into API errors. An empty
// successful body (204 No Content) reads as `Value::Null`.
async fn read_body(response: reqwest::Response) -> Result<Value, PostgrestError> {
    let status = response.status();
    let body_text = response.text().await.map_err(|e| {
        PostgrestError::DeserializationError(format!("Failed to read response body: {}", e))
    })?;

    if !status.is_success() {
        debug!("request failed with {}: {}", status, body_text);
        return Err(match serde_json::from_str::<PostgrestApiErrorDetails>(&body_text) {
            Ok(details) => PostgrestError::ApiError { details, status },
            Err(_) => PostgrestError::UnparsedApiError {
                message: body_text,
                status,
            },
        });
    }

    if body_text.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str::<Value>(&body_text)
        .map_err(|e| PostgrestError::DeserializationError(e.to_string()))
}
