//! Password hashing and verification using Argon2
//!
//! Uses the argon2id variant. The stored string is PHC-formatted, so it
//! carries the salt and cost parameters needed to verify it later.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use tracing::debug;

use crate::types::ServiceError;

/// Salted one-way hasher with a fixed cost
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl PasswordHasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt
    ///
    /// Returns the PHC-formatted hash string that includes the salt and parameters.
    pub fn hash(&self, password: &str) -> Result<String, ServiceError> {
        let salt = SaltString::generate(&mut OsRng);

        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Internal(format!("Failed to hash password: {e}")))
    }

    /// Verify a password against a stored hash
    ///
    /// A malformed stored hash is reported as a mismatch, not an error.
    /// Parameters come from the stored hash, so hashes created under an
    /// older cost setting still verify.
    pub fn verify(&self, hash: &str, password: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!("Stored password hash is malformed: {}", e);
                return false;
            }
        };

        self.argon2()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> PasswordHasher {
    PasswordHasher::new(Params::new(1024, 1, 1, None).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let password = "correct-horse-battery-staple";
        let hash = hasher.hash(password).unwrap();

        // Hash should be in PHC format
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains(password));

        assert!(hasher.verify(&hash, password));
        assert!(!hasher.verify(&hash, "wrong-password"));
    }

    #[test]
    fn test_different_salts() {
        let hasher = fast_hasher();
        let password = "same-password";
        let hash1 = hasher.hash(password).unwrap();
        let hash2 = hasher.hash(password).unwrap();

        // Same password should produce different hashes (different salts)
        assert_ne!(hash1, hash2);

        assert!(hasher.verify(&hash1, password));
        assert!(hasher.verify(&hash2, password));
    }

    #[test]
    fn test_invalid_hash_format_is_mismatch() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("not-a-valid-hash", "password"));
        assert!(!hasher.verify("", "password"));
        assert!(!hasher.verify("$argon2id$v=19$garbage", "password"));
    }

    #[test]
    fn test_verifies_hash_made_with_other_cost() {
        let strong = PasswordHasher::new(Params::new(2048, 2, 1, None).unwrap());
        let hash = strong.hash("pw1").unwrap();

        assert!(fast_hasher().verify(&hash, "pw1"));
    }

    #[test]
    fn test_empty_password_round_trip() {
        let hasher = fast_hasher();
        let hash = hasher.hash("").unwrap();
        assert!(hasher.verify(&hash, ""));
        assert!(!hasher.verify(&hash, " "));
    }
}
