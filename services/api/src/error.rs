//! HTTP error responses

use auth::AuthError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// No bearer token, or one without a valid session
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Auth(err) => {
                let status = match &err {
                    AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                    AuthError::InvalidCredentials | AuthError::SessionInvalid => {
                        StatusCode::UNAUTHORIZED
                    }
                    AuthError::Forbidden => StatusCode::FORBIDDEN,
                    AuthError::NotFound => StatusCode::NOT_FOUND,
                    AuthError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
                    AuthError::BackendUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                };
                let message = match err {
                    AuthError::BackendUnavailable(_) => "Service temporarily unavailable".to_string(),
                    other => other.to_string(),
                };
                (status, message)
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AuthError::Validation("x".into()).into(), StatusCode::BAD_REQUEST),
            (AuthError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (AuthError::SessionInvalid.into(), StatusCode::UNAUTHORIZED),
            (AuthError::Forbidden.into(), StatusCode::FORBIDDEN),
            (AuthError::NotFound.into(), StatusCode::NOT_FOUND),
            (AuthError::TooManyAttempts.into(), StatusCode::TOO_MANY_REQUESTS),
            (
                AuthError::BackendUnavailable("db down".into()).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
