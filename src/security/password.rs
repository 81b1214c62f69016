//! Password hashing.
//!
//! bcrypt is CPU-bound, so both directions run on the blocking thread pool
//! rather than the async executor.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::CoreError;

pub async fn hash_password(password: String) -> Result<String, CoreError> {
    tokio::task::spawn_blocking(move || hash(password, DEFAULT_COST))
        .await
        .map_err(|e| CoreError::StorageError(e.to_string()))?
        .map_err(|e| CoreError::StorageError(e.to_string()))
}

/// `true` iff `password` matches `hash`. A malformed or non-bcrypt hash
/// (one that doesn't begin with `$2`) is treated as a mismatch, not an
/// error.
pub async fn verify_password(password: String, hash: String) -> bool {
    if !hash.starts_with("$2") {
        return false;
    }
    tokio::task::spawn_blocking(move || verify(password, &hash))
        .await
        .unwrap_or(Ok(false))
        .unwrap_or(false)
}
