use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Verification and delivery errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Strict issuance found a live token for the key. The caller may
    /// switch to replace issuance or report the pending link.
    #[error("An active verification token already exists")]
    TokenConflict,

    #[error("verification store error: {0}")]
    Store(String),

    #[error("could not resolve recipient identity: {0}")]
    IdentityResolution(String),

    #[error("mail transport error: {0}")]
    Transport(String),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Unknown verification action: {0}")]
    UnknownAction(String),
}

impl VerifyError {
    /// Wrap a store error, preserving the cause for logging.
    pub fn store<E: std::error::Error>(err: E) -> Self {
        Self::Store(err.to_string())
    }

    /// Wrap an identity lookup error, preserving the cause for logging.
    pub fn identity<E: std::error::Error>(err: E) -> Self {
        Self::IdentityResolution(err.to_string())
    }
}

impl IntoResponse for VerifyError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            VerifyError::TokenConflict => (StatusCode::CONFLICT, self.to_string()),
            VerifyError::InvalidEmail => (StatusCode::BAD_REQUEST, self.to_string()),
            VerifyError::UnknownAction(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            VerifyError::Store(ref msg) => {
                tracing::error!("Store error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            VerifyError::IdentityResolution(ref msg) => {
                tracing::error!("Identity resolution error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            VerifyError::Transport(ref msg) => {
                tracing::error!("Transport error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_maps_to_409() {
        let response = VerifyError::TokenConflict.into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_store_error_is_opaque_500() {
        let response = VerifyError::Store("connection refused".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_unknown_action_maps_to_400() {
        let response = VerifyError::UnknownAction("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
