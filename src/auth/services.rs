use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::auth::dto::{AuthResponse, PublicUser, RefreshResponse};
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo_types::User;
use crate::auth::verification::{self, ConsumeDecision};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::{LoginInput, RegisterInput};

/// Outcome of a registration attempt that did not conflict.
pub enum RegisterOutcome {
    /// Fresh unverified account, verification email dispatched.
    Created(PublicUser),
    /// Existing unverified account updated, new verification email sent.
    Resent(PublicUser),
}

fn is_email_conflict(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .map(|db| db.is_unique_violation() && db.constraint() == Some("users_email_key"))
        .unwrap_or(false)
}

pub async fn register(state: &AppState, input: RegisterInput) -> Result<RegisterOutcome, ApiError> {
    let now = OffsetDateTime::now_utc();
    let expires_at = verification::expiry_from(now, state.config.verification_ttl_minutes);

    match User::find_by_email(&state.db, &input.email).await? {
        Some(existing) if existing.is_verified => {
            warn!(email = %input.email, "registration for already verified address");
            Err(ApiError::Conflict)
        }
        Some(existing) => {
            // Re-registration of a pending account: take the new username and
            // password and invalidate the previous token by overwriting it.
            let hash = hash_password(&input.password)?;
            let token = verification::generate_token(&input.email);
            let updated = User::reregister(
                &state.db,
                existing.id,
                &input.username,
                &hash,
                &token,
                expires_at,
            )
            .await?
            // the account got verified between lookup and update
            .ok_or(ApiError::Conflict)?;

            dispatch_verification_email(state, &updated.email, &token).await;
            info!(user_id = %updated.id, "re-registration, new verification token issued");
            Ok(RegisterOutcome::Resent(updated.into()))
        }
        None => {
            let hash = hash_password(&input.password)?;
            let token = verification::generate_token(&input.email);
            match User::create(
                &state.db,
                &input.username,
                &input.email,
                &hash,
                &token,
                expires_at,
            )
            .await
            {
                Ok(user) => {
                    dispatch_verification_email(state, &user.email, &token).await;
                    info!(user_id = %user.id, "user registered, verification pending");
                    Ok(RegisterOutcome::Created(user.into()))
                }
                // two concurrent registrations for the same new address: the
                // uniqueness constraint is the source of truth, report the
                // same conflict as the verified-duplicate case
                Err(e) if is_email_conflict(&e) => {
                    warn!(email = %input.email, "registration lost uniqueness race");
                    Err(ApiError::Conflict)
                }
                Err(e) => Err(ApiError::Internal(e)),
            }
        }
    }
}

/// Consume a verification token. Single-use: the winning consume clears the
/// token atomically with setting `is_verified`, so any duplicate attempt
/// resolves to `AlreadyVerified` and never a second state change.
pub async fn verify_email(state: &AppState, raw_token: &str) -> Result<PublicUser, ApiError> {
    let user = User::find_by_verification_token(&state.db, raw_token)
        .await?
        .ok_or_else(|| {
            warn!("verification attempted with unknown token");
            ApiError::InvalidVerificationToken
        })?;

    match verification::consume_decision(&user, OffsetDateTime::now_utc()) {
        ConsumeDecision::Verify => {
            let verified = User::mark_verified(&state.db, user.id)
                .await?
                // a concurrent consume won; terminal either way
                .ok_or(ApiError::AlreadyVerified)?;
            info!(user_id = %verified.id, "email verified");
            Ok(verified.into())
        }
        ConsumeDecision::AlreadyVerified => Err(ApiError::AlreadyVerified),
        ConsumeDecision::Expired => {
            info!(user_id = %user.id, "expired verification token presented");
            Err(ApiError::ExpiredVerificationToken)
        }
        ConsumeDecision::Invalid => Err(ApiError::InvalidVerificationToken),
    }
}

pub async fn login(state: &AppState, input: LoginInput) -> Result<AuthResponse, ApiError> {
    // unknown address and wrong password must be indistinguishable
    let user = User::find_by_email(&state.db, &input.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&input.password, &user.password_hash) {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    // distinguishable only after the password matched
    if !user.is_verified {
        return Err(ApiError::UnverifiedAccount);
    }

    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

/// Mint a new access token from a refresh token. No credential re-check and
/// no rotation: the presented refresh token stays valid for its lifetime.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<RefreshResponse, ApiError> {
    if refresh_token.is_empty() {
        return Err(ApiError::MissingToken);
    }

    let keys = JwtKeys::from_ref(state);
    let claims = keys.verify_refresh(refresh_token)?;

    // accounts can be deleted; never mint tokens for ghosts
    if User::find_by_id(&state.db, claims.sub).await?.is_none() {
        warn!(user_id = %claims.sub, "refresh for unknown account");
        return Err(ApiError::UnknownAccount);
    }

    let access_token = keys.sign_access(claims.sub)?;
    Ok(RefreshResponse { access_token })
}

fn verification_email(base_url: &str, token: &str, ttl_minutes: i64) -> (String, String) {
    let link = format!("{base_url}/api/v1/auth/verify-email?token={token}");
    let subject = "Verify your ShareFood account".to_string();
    let body = format!(
        "Welcome to ShareFood!\n\n\
         Please confirm your email address by opening the link below:\n\n\
         {link}\n\n\
         The link is valid for {ttl_minutes} minutes. If you did not register,\n\
         you can ignore this message.\n"
    );
    (subject, body)
}

async fn dispatch_verification_email(state: &AppState, email: &str, token: &str) {
    let (subject, body) = verification_email(
        &state.config.public_base_url,
        token,
        state.config.verification_ttl_minutes,
    );
    // Notification failure never fails the registration: the persisted
    // token keeps a resend possible.
    if let Err(e) = state.mailer.send(email, &subject, &body).await {
        warn!(error = %e, email = %email, "failed to send verification email");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_email_carries_link_and_token() {
        let (subject, body) =
            verification_email("https://sharefood.example", "abc123def", 60);
        assert!(subject.contains("Verify"));
        assert!(body.contains("https://sharefood.example/api/v1/auth/verify-email?token=abc123def"));
        assert!(body.contains("60 minutes"));
    }

    #[tokio::test]
    async fn refresh_rejects_empty_token() {
        let state = AppState::fake();
        let err = refresh(&state, "").await.unwrap_err();
        assert!(matches!(err, ApiError::MissingToken));
    }

    #[tokio::test]
    async fn refresh_rejects_access_token() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let access = keys.sign_access(uuid::Uuid::new_v4()).unwrap();
        let err = refresh(&state, &access).await.unwrap_err();
        assert!(matches!(err, ApiError::WrongTokenType));
    }

    #[tokio::test]
    async fn refresh_rejects_garbage_token() {
        let state = AppState::fake();
        let err = refresh(&state, "not.a.jwt").await.unwrap_err();
        assert!(matches!(err, ApiError::MalformedToken));
    }
}
