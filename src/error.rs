use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Why a single provider call failed
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "detail", rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Provider is not configured (no credential) or is not currently active
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP status {0}")]
    Http(u16),

    /// Payload could not be translated into the shared model
    #[error("malformed payload: {0}")]
    Parse(String),

    #[error("network error: {0}")]
    Network(String),

    /// The client variant does not offer this capability
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

/// Error returned as a value by every provider call
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{provider}: {kind}")]
pub struct ProviderError {
    pub provider: String,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, kind: ProviderErrorKind) -> Self {
        Self {
            provider: provider.into(),
            kind,
        }
    }

    pub fn timeout(provider: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Timeout)
    }

    pub fn unavailable(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Unavailable(reason.into()))
    }

    pub fn parse(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Parse(reason.into()))
    }

    pub fn unsupported(provider: impl Into<String>, operation: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Unsupported(operation.into()))
    }

    /// Classifies a transport-level reqwest failure
    pub fn from_reqwest(provider: impl Into<String>, err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ProviderErrorKind::Timeout
        } else if err.is_decode() {
            ProviderErrorKind::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderErrorKind::Http(status.as_u16())
        } else {
            ProviderErrorKind::Network(err.to_string())
        };
        Self::new(provider, kind)
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Database(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            AppError::Provider(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
