use rand::RngCore;
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::auth::repo_types::User;

/// Logical state of the (`verification_token`, `token_expires_at`) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No verification outstanding; both fields null.
    None,
    /// Token issued and still inside its window.
    Pending,
    /// Token issued but past expiry. Fields are left in place so the
    /// account can request regeneration.
    Expired,
}

/// What consuming a token against a given account must do. Evaluated
/// against a UTC `now` so naive/aware comparison bugs cannot occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeDecision {
    /// Flip `is_verified` and clear both token fields, atomically.
    Verify,
    /// Terminal: the account already completed verification. Never a
    /// second state change.
    AlreadyVerified,
    /// Token window has passed; verification does not proceed.
    Expired,
    /// No token outstanding on this account.
    Invalid,
}

pub fn token_state(user: &User, now: OffsetDateTime) -> TokenState {
    match (&user.verification_token, user.token_expires_at) {
        (Some(_), Some(expires_at)) if expires_at > now => TokenState::Pending,
        (Some(_), Some(_)) => TokenState::Expired,
        _ => TokenState::None,
    }
}

pub fn consume_decision(user: &User, now: OffsetDateTime) -> ConsumeDecision {
    if user.is_verified {
        return ConsumeDecision::AlreadyVerified;
    }
    match token_state(user, now) {
        TokenState::Pending => ConsumeDecision::Verify,
        TokenState::Expired => ConsumeDecision::Expired,
        TokenState::None => ConsumeDecision::Invalid,
    }
}

/// Produce a fresh verification token: 32 random bytes mixed with the
/// address and the current instant, collapsed through SHA-256. The output
/// is 64 hex chars, infeasible to guess or enumerate, and unique at the
/// database level.
pub fn generate_token(email: &str) -> String {
    let mut nonce = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut nonce);

    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b"-");
    hasher.update(nonce);
    hasher.update(b"-");
    hasher.update(
        OffsetDateTime::now_utc()
            .unix_timestamp_nanos()
            .to_be_bytes(),
    );
    hex::encode(hasher.finalize())
}

pub fn expiry_from(now: OffsetDateTime, ttl_minutes: i64) -> OffsetDateTime {
    now + Duration::minutes(ttl_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(
        is_verified: bool,
        token: Option<&str>,
        expires_at: Option<OffsetDateTime>,
    ) -> User {
        User {
            id: Uuid::new_v4(),
            username: "alice".into(),
            email: "alice@example.com".into(),
            password_hash: "$argon2id$stub".into(),
            is_verified,
            verification_token: token.map(Into::into),
            token_expires_at: expires_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn token_is_64_hex_chars() {
        let token = generate_token("a@x.com");
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_differ_for_same_address() {
        // random component dominates: two requests for one address never collide
        let a = generate_token("a@x.com");
        let b = generate_token("a@x.com");
        assert_ne!(a, b);
    }

    #[test]
    fn expiry_is_one_hour_by_default() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(expiry_from(now, 60) - now, Duration::minutes(60));
    }

    #[test]
    fn state_none_when_no_token() {
        let now = OffsetDateTime::now_utc();
        assert_eq!(token_state(&user(false, None, None), now), TokenState::None);
    }

    #[test]
    fn state_pending_inside_window() {
        let now = OffsetDateTime::now_utc();
        let u = user(false, Some("t"), Some(now + Duration::minutes(30)));
        assert_eq!(token_state(&u, now), TokenState::Pending);
    }

    #[test]
    fn state_expired_past_window() {
        let now = OffsetDateTime::now_utc();
        let u = user(false, Some("t"), Some(now - Duration::seconds(1)));
        assert_eq!(token_state(&u, now), TokenState::Expired);
    }

    #[test]
    fn consume_verifies_pending_account() {
        let now = OffsetDateTime::now_utc();
        let u = user(false, Some("t"), Some(now + Duration::minutes(30)));
        assert_eq!(consume_decision(&u, now), ConsumeDecision::Verify);
    }

    #[test]
    fn consume_is_terminal_after_verification() {
        // post-consumption state: verified, token fields cleared; a second
        // consume yields AlreadyVerified, never another state change
        let now = OffsetDateTime::now_utc();
        let u = user(true, None, None);
        assert_eq!(consume_decision(&u, now), ConsumeDecision::AlreadyVerified);
    }

    #[test]
    fn already_verified_wins_over_expiry() {
        let now = OffsetDateTime::now_utc();
        let u = user(true, Some("t"), Some(now - Duration::minutes(5)));
        assert_eq!(consume_decision(&u, now), ConsumeDecision::AlreadyVerified);
    }

    #[test]
    fn consume_rejects_expired_token_without_state_change() {
        let now = OffsetDateTime::now_utc();
        let u = user(false, Some("t"), Some(now - Duration::minutes(5)));
        assert_eq!(consume_decision(&u, now), ConsumeDecision::Expired);
        // fields stay in place so regeneration remains possible
        assert_eq!(token_state(&u, now), TokenState::Expired);
    }
}
