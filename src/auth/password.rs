use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::{error, warn};

/// Hash a plaintext password with argon2 and a fresh random salt. Only
/// empty input is rejected by policy; hashing itself is not expected to
/// fail.
pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    anyhow::ensure!(!plain.is_empty(), "password must not be empty");
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Check a plaintext attempt against a stored hash. Mismatch, malformed
/// hash and internal errors all collapse to `false` so callers cannot
/// distinguish them; the parse failure is logged for operators only.
pub fn verify_password(plain: &str, hash: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(error = %e, "stored password hash did not parse");
            return false;
        }
    };
    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash));
    }

    #[test]
    fn verify_is_false_on_malformed_hash() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("Password123").unwrap();
        let b = hash_password("Password123").unwrap();
        assert_ne!(a, b);
        assert!(verify_password("Password123", &a));
        assert!(verify_password("Password123", &b));
    }

    #[test]
    fn empty_password_is_rejected() {
        assert!(hash_password("").is_err());
    }
}
