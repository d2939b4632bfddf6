//! Error taxonomy and the single transport translation boundary.
//!
//! Components below the handler guard return typed [`CoachwayError`]
//! values and never format transport responses themselves. The
//! [`IntoResponse`] impl here is the one place failures become HTTP.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// The main error type for the authorization and reconciliation core.
#[derive(Debug, thiserror::Error)]
pub enum CoachwayError {
    /// No caller identity signal was present at all.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Identity is known but access is denied.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// A referenced entity is absent. For webhook deliveries this is a
    /// transient, retryable condition (see [`CoachwayError::is_retryable`]).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed input; never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// A uniqueness violation the upsert paths could not resolve.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage or other dependency failure.
    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CoachwayError>;

/// JSON error body returned at the transport boundary.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_id: String,
}

impl CoachwayError {
    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether an event transport should redeliver after this failure.
    ///
    /// `NotFound` covers the reconciler's missing-org/user case under
    /// out-of-order delivery; server errors are safe to retry because
    /// every reconciliation write is idempotent. Validation failures
    /// will fail identically on every delivery, so they are final.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Internal(_) | Self::Anyhow(_))
    }

    /// Transport status for request-driven calls.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to expose to clients.
    ///
    /// Client errors (4xx) carry their real message; server errors are
    /// reduced to a generic line so dependency details stay in the logs.
    fn safe_message(&self) -> String {
        match self {
            Self::Unauthenticated(_)
            | Self::Forbidden(_)
            | Self::NotFound(_)
            | Self::Validation(_)
            | Self::Conflict(_) => self.to_string(),
            Self::Internal(_) | Self::Anyhow(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for CoachwayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_id = uuid::Uuid::new_v4().to_string();

        // Full detail goes to the server log, never the client.
        tracing::error!(
            status = status.as_u16(),
            error_id = %error_id,
            error = %self,
            "Request failed"
        );

        let body = Json(ErrorBody {
            error: self.safe_message(),
            error_id,
        });

        (status, body).into_response()
    }
}
