use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::auth::{
    dto::{
        AuthResponse, LoginRequest, MessageResponse, PublicUser, RefreshRequest, RefreshResponse,
        RegisterRequest, RegisterResponse, VerifyEmailQuery,
    },
    extractors::AuthUser,
    repo_types::User,
    services::{self, RegisterOutcome},
};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/verify-email", get(verify_email))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let input = validation::validate_register(payload).map_err(ApiError::InvalidInput)?;

    match services::register(&state, input).await? {
        RegisterOutcome::Created(user) => Ok((
            StatusCode::CREATED,
            Json(RegisterResponse {
                message: "registration pending verification, check your email",
                user,
            }),
        )),
        RegisterOutcome::Resent(user) => Ok((
            StatusCode::OK,
            Json(RegisterResponse {
                message: "registration already pending, a new verification email has been sent",
                user,
            }),
        )),
    }
}

#[instrument(skip(state, query))]
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let token = match query.token.as_deref() {
        Some(token) if !token.is_empty() => token.to_owned(),
        _ => {
            let mut errors = crate::error::FieldErrors::new();
            errors.insert("token".into(), vec!["verification token is required".into()]);
            return Err(ApiError::InvalidInput(errors));
        }
    };

    let user = services::verify_email(&state, &token).await?;
    Ok(Json(RegisterResponse {
        message: "email address verified",
        user,
    }))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let input = validation::validate_login(payload).map_err(ApiError::InvalidInput)?;
    let response = services::login(&state, input).await?;
    Ok(Json(response))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<RefreshResponse>, ApiError> {
    let response = services::refresh(&state, &payload.refresh_token).await?;
    Ok(Json(response))
}

/// Tokens are stateless, so logout has nothing to revoke server-side; the
/// endpoint exists so clients have a uniform place to end a session.
#[instrument]
pub async fn logout(AuthUser(user_id): AuthUser) -> Json<MessageResponse> {
    info!(user_id = %user_id, "user logged out");
    Json(MessageResponse {
        message: "logged out",
    })
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PublicUser>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::NotFound("user"))?;
    Ok(Json(user.into()))
}
