use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use uuid::Uuid;

use crate::auth::jwt::{JwtKeys, TokenKind};
use crate::error::ApiError;

/// Extracts and validates a bearer access token, yielding the subject id.
/// Missing header, malformed token, expiry and a refresh token presented
/// here each reject with their own error.
#[derive(Debug)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);

        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::MissingToken)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(ApiError::MalformedToken)?;

        let claims = keys.verify(token)?;

        if claims.kind != TokenKind::Access {
            return Err(ApiError::WrongTokenType);
        }

        Ok(AuthUser(claims.sub))
    }
}
