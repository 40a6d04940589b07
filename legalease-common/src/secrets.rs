//! Password hashing and session token generation
//!
//! Passwords are stored as bcrypt hashes (salt and cost embedded in the
//! string). Hashing and verification run on the blocking thread pool.
//! Session tokens are 32 random bytes rendered as lowercase hex.

use crate::{Error, Result};
use rand::RngCore;

pub use bcrypt::DEFAULT_COST as PASSWORD_COST;

const TOKEN_BYTES: usize = 32;

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Hash a password with a fresh random salt
///
/// `cost` defaults to [`PASSWORD_COST`].
pub async fn hash_password(password: &str, cost: Option<u32>) -> Result<String> {
    let password = password.to_string();
    let cost = cost.unwrap_or(PASSWORD_COST);

    tokio::task::spawn_blocking(move || {
        bcrypt::hash(password, cost).map_err(|e| Error::Internal(format!("Password hashing failed: {}", e)))
    })
    .await
    .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
}

/// Check a password against a stored bcrypt hash
///
/// Malformed stored values verify as false rather than erroring.
pub async fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let password = password.to_string();
    let stored = stored.to_string();

    tokio::task::spawn_blocking(move || bcrypt::verify(password, &stored).unwrap_or(false))
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))
}

/// Generate an opaque session token
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    to_hex(&bytes)
}
