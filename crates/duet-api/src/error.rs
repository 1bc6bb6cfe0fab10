use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{debug, error};

use duet_crypto::{HashError, TokenError};
use duet_types::api::StatusMessage;

pub const MISSING_FIELDS: &str = "Please fill in all required fields";
pub const USER_EXISTS: &str = "User already exists";
pub const BAD_CREDENTIALS: &str = "User email or password is incorrect";
pub const NO_TARGET: &str = "Must supply either a conversation or a receiver";
pub const INVALID_BODY: &str = "Request body must be a JSON object with string fields";

#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing or empty required input.
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Unknown email and wrong password both land here.
    #[error("{}", BAD_CREDENTIALS)]
    InvalidCredentials,

    #[error("missing or invalid token")]
    Unauthorized,

    /// A referenced record no longer resolves.
    #[error("integrity fault: {0}")]
    Integrity(String),

    #[error(transparent)]
    Hashing(#[from] HashError),

    #[error("token signing failed: {0}")]
    TokenSigning(TokenError),

    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl ChatError {
    pub fn missing_fields() -> Self {
        Self::Validation(MISSING_FIELDS.into())
    }

    pub fn integrity(detail: impl Into<String>) -> Self {
        Self::Integrity(detail.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::Conflict(_) | Self::InvalidCredentials => {
                StatusCode::BAD_REQUEST
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Integrity(_) | Self::Hashing(_) | Self::TokenSigning(_) | Self::Store(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Malformed, mistyped or non-JSON bodies are validation failures like any
/// other bad input.
impl From<JsonRejection> for ChatError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Rejected request body: {}", rejection.body_text());
        Self::Validation(INVALID_BODY.into())
    }
}

/// Fail with a validation error if any value is empty or whitespace.
pub(crate) fn require(values: &[&str]) -> Result<(), ChatError> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(ChatError::missing_fields());
    }
    Ok(())
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Client errors carry their message; server errors are logged and kept generic.
        let message = match &self {
            Self::Validation(msg) | Self::Conflict(msg) => msg.clone(),
            Self::InvalidCredentials | Self::Unauthorized => self.to_string(),
            Self::Hashing(e) => {
                error!("Password hashing failed: {}", e);
                "Error hashing password".to_string()
            }
            Self::TokenSigning(e) => {
                error!("Token generation failed: {}", e);
                "Token generation error".to_string()
            }
            Self::Integrity(detail) => {
                error!("Data integrity fault: {}", detail);
                "Server error".to_string()
            }
            Self::Store(e) => {
                error!("Store error: {:#}", e);
                "Server error".to_string()
            }
        };

        (status, Json(StatusMessage::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ChatError::missing_fields().status(), StatusCode::BAD_REQUEST);
        assert_eq!(ChatError::Conflict(USER_EXISTS.into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ChatError::InvalidCredentials.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ChatError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ChatError::integrity("gone").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ChatError::Store(anyhow::anyhow!("disk")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn require_rejects_blank() {
        assert!(require(&["a", "b"]).is_ok());
        assert!(matches!(require(&["a", ""]), Err(ChatError::Validation(_))));
        assert!(matches!(require(&["  "]), Err(ChatError::Validation(_))));
    }

    #[test]
    fn credential_error_message() {
        assert_eq!(ChatError::InvalidCredentials.to_string(), BAD_CREDENTIALS);
    }
}
