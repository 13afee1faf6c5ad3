//! Password hashing with Argon2id
//!
//! Hashes are PHC strings with a per-password random salt. The cost
//! parameters are fixed; verification re-derives with the parameters encoded
//! in the stored hash and compares in constant time.

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{self, SaltString},
};
use std::sync::OnceLock;
use tracing::warn;

fn hasher() -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default())
}

/// Hash a plaintext password
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Ok(hasher()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// Verify a plaintext password against a stored hash
///
/// A stored value that is not a valid PHC string never verifies.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            return false;
        }
    };

    hasher()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Burn the same work as a real verification when no account matches
///
/// Keeps the response time of an unknown username in line with a wrong
/// password for a known one.
pub fn verify_against_dummy(password: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();
    let dummy = DUMMY_HASH.get_or_init(|| hash_password("conview-dummy-password").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(password, hash);
    }
}
