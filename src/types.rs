// Shared error and outcome types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crate::chroma::ChromaError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid endpoint")]
    InvalidEndpoint,

    #[error("{0}")]
    Chroma(#[from] ChromaError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidEndpoint => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message placed in the `{error}` envelope returned to the UI.
    pub fn envelope_message(&self) -> String {
        match self {
            AppError::InvalidEndpoint => self.to_string(),
            other => format!("ChromaDB Error: {}", other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.envelope_message() });
        (self.status(), Json(body)).into_response()
    }
}

/// Result of an operation that may fall back to a lesser answer instead of failing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Ok(T),
    Degraded(T, String),
    Failed(String),
}

impl<T> Outcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Outcome::Degraded(..))
    }

    /// The value carried by `Ok` or `Degraded`.
    pub fn value(&self) -> Option<&T> {
        match self {
            Outcome::Ok(v) | Outcome::Degraded(v, _) => Some(v),
            Outcome::Failed(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Ok(_) => None,
            Outcome::Degraded(_, reason) | Outcome::Failed(reason) => Some(reason),
        }
    }

    /// Collapse into a plain result; a degraded value counts as success.
    pub fn into_result(self) -> Result<T, String> {
        match self {
            Outcome::Ok(v) | Outcome::Degraded(v, _) => Ok(v),
            Outcome::Failed(reason) => Err(reason),
        }
    }
}
