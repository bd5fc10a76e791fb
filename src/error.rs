//! Error handling for AttendX
//!
//! Every failure is scoped to one user action. `Validation` is resolved
//! locally and never reaches the service; `Conflict`, `NotFound` and
//! `Service` come back from the data store.

use attendx_auth::AuthError;
use attendx_postgrest::PostgrestError;
use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

use crate::validation::FieldErrors;

#[derive(Error, Debug)]
pub enum Error {
    /// Form input failed local validation
    #[error("Invalid input: {0}")]
    Validation(FieldErrors),

    /// Unique constraint violation
    #[error("{0}")]
    Conflict(String),

    /// Stale or unknown id
    #[error("{0}")]
    NotFound(String),

    /// Network or unexpected service failure
    #[error("{0}")]
    Service(String),

    /// The session may not open the requested route
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn conflict<T: fmt::Display>(msg: T) -> Self {
        Error::Conflict(msg.to_string())
    }

    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }

    pub fn service<T: fmt::Display>(msg: T) -> Self {
        Error::Service(msg.to_string())
    }

    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    /// Text for the transient notification shown after a failed action,
    /// falling back to `fallback` when the error carries no message.
    pub fn user_message(&self, fallback: &str) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            fallback.to_string()
        } else {
            message
        }
    }
}

impl From<PostgrestError> for Error {
    fn from(err: PostgrestError) -> Self {
        let status = err.status();
        match err.details() {
            Some(details) if details.is_unique_violation() => {
                Error::Conflict(details.message.clone().unwrap_or_else(|| err.to_string()))
            }
            Some(details) if details.is_no_rows() => {
                Error::NotFound(details.message.clone().unwrap_or_else(|| err.to_string()))
            }
            _ if status == Some(StatusCode::CONFLICT) => Error::Conflict(err.to_string()),
            _ if status == Some(StatusCode::NOT_FOUND) => Error::NotFound(err.to_string()),
            Some(details) => {
                Error::Service(details.message.clone().unwrap_or_else(|| err.to_string()))
            }
            None => Error::Service(err.to_string()),
        }
    }
}
