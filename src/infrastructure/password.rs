//! Password hashing and verification.

use crate::error::{RentalError, Result};

/// Hash a password with bcrypt at the given cost.
pub fn hash_password(password: &str, cost: u32) -> Result<String> {
    bcrypt::hash(password, cost).map_err(|e| RentalError::internal(format!("hash password: {e}")))
}

/// Verify a password against a stored bcrypt hash.
///
/// A hash that cannot be parsed counts as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}
