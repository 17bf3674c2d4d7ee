//! Password hashing
//!
//! Stored form is a bcrypt hash (`$2b$<cost>$...`). Hashing is CPU bound,
//! so async callers run it on the blocking pool.

use crate::error::AppError;

/// Lowest and highest cost bcrypt accepts
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// Hash a password under a fresh random salt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    bcrypt::hash(password, cost)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))
}

/// Check a password against a stored hash.
///
/// An unparseable stored hash never matches.
pub fn verify_password(password: &str, stored: &str) -> bool {
    bcrypt::verify(password, stored).unwrap_or(false)
}

/// [`hash_password`] on the blocking pool
pub async fn hash_password_blocking(password: &str, cost: u32) -> Result<String, AppError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing task failed: {e}")))?
}

/// [`verify_password`] on the blocking pool
pub async fn verify_password_blocking(password: &str, stored: &str) -> bool {
    let (password, stored) = (password.to_string(), stored.to_string());
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_only_the_same_password() {
        let stored = hash_password("itu@#$", MIN_COST).unwrap();
        assert!(stored.starts_with("$2"));
        assert!(verify_password("itu@#$", &stored));
        assert!(!verify_password("itu@#", &stored));
    }

    #[test]
    fn cost_is_recorded_in_the_hash() {
        let stored = hash_password("secret", 5).unwrap();
        assert_eq!(stored.split('$').nth(2), Some("05"));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password("secret", MIN_COST).unwrap();
        let second = hash_password("secret", MIN_COST).unwrap();
        assert_ne!(first, second);
        assert!(verify_password("secret", &second));
    }

    #[test]
    fn out_of_range_cost_is_an_error() {
        assert!(hash_password("secret", MIN_COST - 1).is_err());
    }

    #[test]
    fn malformed_hash_never_matches() {
        assert!(!verify_password("secret", ""));
        assert!(!verify_password("secret", "hash"));
        assert!(!verify_password("secret", "hmac-sha256$abc$def"));
        assert!(!verify_password("secret", "$2b$04$***"));
    }

    #[tokio::test]
    async fn blocking_helpers_agree() {
        let stored = hash_password_blocking("secret", MIN_COST).await.unwrap();
        assert!(verify_password_blocking("secret", &stored).await);
        assert!(!verify_password_blocking("wrong", &stored).await);
    }
}
