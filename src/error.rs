//! Error types for the campaign dispatch service.

use std::time::Duration;

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} {id} not found")]
    NotFound { entity: String, id: String },

    #[error("Campaign {id} is {state}, cannot {action}")]
    InvalidState {
        id: String,
        state: String,
        action: String,
    },

    #[error("Mail transport unavailable: {0}")]
    TransportUnavailable(TransportError),

    #[error("Spreadsheet error: {0}")]
    Sheets(#[from] SheetsError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl Error {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// HTTP-style category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::BadRequest,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState { .. } => ErrorKind::Conflict,
            Self::TransportUnavailable(_) => ErrorKind::BadGateway,
            Self::Sheets(SheetsError::NotConfigured) => ErrorKind::ServerError,
            Self::Sheets(_) => ErrorKind::BadGateway,
            Self::Database(_) => ErrorKind::ServerError,
        }
    }
}

/// Coarse error category surfaced to API callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    BadRequest,
    Conflict,
    BadGateway,
    ServerError,
}

impl ErrorKind {
    pub fn status_code(self) -> StatusCode {
        match self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Conflict => StatusCode::CONFLICT,
            Self::BadGateway => StatusCode::BAD_GATEWAY,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::Conflict => "invalid_state",
            Self::BadGateway => "upstream_unavailable",
            Self::ServerError => "server_error",
        }
    }
}

/// Malformed input, rejected before any mutation.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Malformed request: {0}")]
    Malformed(String),
}

/// Per-recipient mail transport failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("Transport {name} could not be reached: {reason}")]
    Unavailable { name: String, reason: String },

    #[error("Transport {name} rejected message to {to}: {reason}")]
    Rejected {
        name: String,
        to: String,
        reason: String,
    },

    #[error("Send to {to} timed out after {timeout:?}")]
    Timeout { to: String, timeout: Duration },

    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),
}

impl TransportError {
    /// True when the failure means the transport itself is unreachable,
    /// rather than this one message being refused.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

/// Spreadsheet source errors.
#[derive(Debug, thiserror::Error)]
pub enum SheetsError {
    #[error("Spreadsheet API key not configured")]
    NotConfigured,

    #[error("Spreadsheet request failed: {0}")]
    Request(String),

    #[error("Spreadsheet API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid spreadsheet response: {0}")]
    InvalidResponse(String),
}

/// Database-related errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Startup configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Result type alias for the service.
pub type Result<T> = std::result::Result<T, Error>;

/// JSON error body returned by the HTTP layer.
#[derive(Debug)]
pub struct ApiError(pub Error);

/// Result type for axum handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl<E: Into<Error>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.0.kind();
        if kind == ErrorKind::ServerError || kind == ErrorKind::BadGateway {
            tracing::error!(error = %self.0, "Request failed");
        } else {
            tracing::debug!(error = %self.0, "Request rejected");
        }
        (
            kind.status_code(),
            Json(serde_json::json!({
                "error": self.0.to_string(),
                "kind": kind.as_str(),
            })),
        )
            .into_response()
    }
}
