//! Password hashing utilities

use bcrypt::{hash, verify};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::shared::{AppError, AppResult};

/// Work factor used when none is configured.
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// Hash a password using bcrypt
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

/// Verify a password against a hash
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, hash)
}

/// Verify a password on the blocking pool so bcrypt does not stall the
/// runtime's worker threads.
pub async fn verify_password_blocking(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::internal(format!("password verification task failed: {}", e)))?
        .map_err(|e| AppError::internal(format!("bcrypt verify failed: {}", e)))
}

/// Hash of a random throwaway password, compared against when a username
/// is unknown so both login failure paths pay the same bcrypt cost.
pub fn dummy_hash(cost: u32) -> Result<String, bcrypt::BcryptError> {
    let throwaway: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    hash_password(&throwaway, cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify() {
        let password = "secure_password_123";
        let hashed = hash_password(password, TEST_COST).unwrap();

        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("wrong_password", &hashed).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("pass123", TEST_COST).unwrap();
        let b = hash_password("pass123", TEST_COST).unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("pass123"));
    }

    #[tokio::test]
    async fn blocking_verify_matches_sync_verify() {
        let hashed = hash_password("pass123", TEST_COST).unwrap();
        assert!(verify_password_blocking("pass123".into(), hashed.clone())
            .await
            .unwrap());
        assert!(!verify_password_blocking("nope".into(), hashed).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_hash_is_an_internal_error() {
        let result = verify_password_blocking("pass123".into(), "not-a-hash".into()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn dummy_hash_rejects_empty_password() {
        let hashed = dummy_hash(TEST_COST).unwrap();
        assert!(!verify_password("", &hashed).unwrap());
    }
}
