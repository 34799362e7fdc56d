use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::User;

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_verified,
                   verification_token, token_expires_at, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_verified,
                   verification_token, token_expires_at, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_verification_token(
        db: &PgPool,
        token: &str,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, is_verified,
                   verification_token, token_expires_at, created_at
            FROM users
            WHERE verification_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new unverified user with an outstanding verification token.
    /// A duplicate email surfaces as a unique-constraint violation.
    pub async fn create(
        db: &PgPool,
        username: &str,
        email: &str,
        password_hash: &str,
        verification_token: &str,
        token_expires_at: OffsetDateTime,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, verification_token, token_expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, is_verified,
                      verification_token, token_expires_at, created_at
            "#,
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(verification_token)
        .bind(token_expires_at)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Re-registration of a still-unverified account: overwrite username and
    /// credentials and replace the outstanding token. Guarded on
    /// `is_verified = FALSE`; a concurrently verified account is left
    /// untouched and `None` comes back.
    pub async fn reregister(
        db: &PgPool,
        id: Uuid,
        username: &str,
        password_hash: &str,
        verification_token: &str,
        token_expires_at: OffsetDateTime,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET username = $2,
                   password_hash = $3,
                   verification_token = $4,
                   token_expires_at = $5
             WHERE id = $1 AND is_verified = FALSE
            RETURNING id, username, email, password_hash, is_verified,
                      verification_token, token_expires_at, created_at
            "#,
        )
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .bind(verification_token)
        .bind(token_expires_at)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Consume the outstanding token: set verified and clear both token
    /// fields in one atomic statement. The `is_verified = FALSE` guard makes
    /// the transition single-use under concurrency; a lost race returns
    /// `None`.
    pub async fn mark_verified(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET is_verified = TRUE,
                   verification_token = NULL,
                   token_expires_at = NULL
             WHERE id = $1 AND is_verified = FALSE
            RETURNING id, username, email, password_hash, is_verified,
                      verification_token, token_expires_at, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }
}
