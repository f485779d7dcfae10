use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::dto::Failure;

#[derive(Error, Debug)]
pub enum AccountError {
    #[error("First name and last name are required")]
    InvalidName,

    #[error("Please provide a valid email address")]
    InvalidEmail,

    #[error("Password must be at least 8 characters long")]
    WeakPassword,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("An account with this email already exists")]
    EmailTaken,

    #[error("Email and password are required")]
    MissingCredentials,

    // Same text for unknown email and wrong password.
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User ID is required")]
    MissingUserId,

    #[error("User not found")]
    UserNotFound,

    /// Body that is not JSON of the expected shape.
    #[error("Invalid request body: {0}")]
    BadRequest(String),

    #[error("Internal server error")]
    Internal(#[source] anyhow::Error),
}

impl From<JsonRejection> for AccountError {
    fn from(rejection: JsonRejection) -> Self {
        AccountError::BadRequest(rejection.body_text())
    }
}

impl AccountError {
    pub fn status(&self) -> StatusCode {
        match self {
            AccountError::InvalidName
            | AccountError::InvalidEmail
            | AccountError::WeakPassword
            | AccountError::PasswordMismatch
            | AccountError::MissingCredentials
            | AccountError::MissingUserId
            | AccountError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AccountError::EmailTaken => StatusCode::CONFLICT,
            AccountError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AccountError::UserNotFound => StatusCode::NOT_FOUND,
            AccountError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AccountError {
    fn into_response(self) -> Response {
        let body = Failure {
            success: false,
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_failures_are_bad_requests() {
        for e in [
            AccountError::InvalidName,
            AccountError::InvalidEmail,
            AccountError::WeakPassword,
            AccountError::PasswordMismatch,
            AccountError::MissingCredentials,
            AccountError::MissingUserId,
            AccountError::BadRequest("email: invalid type".into()),
        ] {
            assert_eq!(e.status(), StatusCode::BAD_REQUEST, "{e}");
        }
    }

    #[test]
    fn internal_error_hides_cause() {
        let e = AccountError::Internal(anyhow::anyhow!("argon2 blew up"));
        assert_eq!(e.to_string(), "Internal server error");
        assert_eq!(e.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn response_body_has_success_false_and_message() {
        let res = AccountError::EmailTaken.into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "An account with this email already exists");
    }
}
