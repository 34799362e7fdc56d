use std::collections::HashMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Field name -> human-readable messages, as produced by the validation layer.
pub type FieldErrors = HashMap<String, Vec<String>>;

/// Every failure a handler can surface. Anything not listed here is a bug
/// or an outage and travels through `Internal`, which hides the cause from
/// the caller while recording it for operators.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input")]
    InvalidInput(FieldErrors),

    // authentication stage
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("email address is not verified")]
    UnverifiedAccount,

    // email-verification stage
    #[error("invalid verification token")]
    InvalidVerificationToken,
    #[error("verification token has expired")]
    ExpiredVerificationToken,
    #[error("email address is already verified")]
    AlreadyVerified,

    // session-token stage
    #[error("missing authorization token")]
    MissingToken,
    #[error("malformed authorization token")]
    MalformedToken,
    #[error("token has expired")]
    ExpiredToken,
    #[error("wrong token type")]
    WrongTokenType,
    #[error("account no longer exists")]
    UnknownAccount,

    #[error("email address is already in use")]
    Conflict,
    #[error("permission denied")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::UnverifiedAccount => StatusCode::FORBIDDEN,
            ApiError::InvalidVerificationToken => StatusCode::NOT_FOUND,
            ApiError::ExpiredVerificationToken => StatusCode::BAD_REQUEST,
            ApiError::AlreadyVerified => StatusCode::CONFLICT,
            ApiError::MissingToken
            | ApiError::MalformedToken
            | ApiError::ExpiredToken
            | ApiError::WrongTokenType
            | ApiError::UnknownAccount => StatusCode::UNAUTHORIZED,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::InvalidInput(errors) => {
                json!({ "message": "invalid input data", "errors": errors })
            }
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "internal error");
                json!({ "message": "internal server error" })
            }
            other => json!({ "message": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::UnverifiedAccount.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::InvalidVerificationToken.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::ExpiredVerificationToken.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::AlreadyVerified.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::ExpiredToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("item").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn internal_error_hides_cause() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused at 10.0.0.3"));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_input_carries_field_errors() {
        let mut fields = FieldErrors::new();
        fields.insert("email".into(), vec!["must be a valid email address".into()]);
        let err = ApiError::InvalidInput(fields);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
