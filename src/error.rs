use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} rejected credentials ({status})")]
    Auth { service: &'static str, status: StatusCode },

    #[error("{service} API error {status}: {body}")]
    Api {
        service: &'static str,
        status: StatusCode,
        body: String,
    },

    #[error("{service} rate limit still exceeded after {attempts} attempts")]
    RateLimited { service: &'static str, attempts: u32 },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Schema mismatch on property {property}: expected {expected}, found {found}")]
    SchemaMismatch {
        property: String,
        expected: String,
        found: String,
    },
}

impl AppError {
    /// Errors that stop the whole pass rather than a single row.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Config(_) | AppError::Auth { .. } | AppError::SchemaMismatch { .. }
        )
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Parse(err.to_string())
    }
}
