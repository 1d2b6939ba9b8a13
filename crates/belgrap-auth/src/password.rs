//! Password hashing and verification using Argon2
//!
//! Uses Argon2id, which resists GPU cracking and side-channel attacks.

use belgrap_core::error::AppError;
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand_core::OsRng;
use tracing::{debug, error};

/// Password hashing service using Argon2
#[derive(Debug, Clone, Default)]
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    /// Create a new password service with default Argon2 parameters
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Hash a password, returning the PHC string format
    ///
    /// # Errors
    ///
    /// Returns `AppError::PasswordHash` if hashing fails
    pub fn hash_password(&self, password: &str) -> Result<String, AppError> {
        debug!("Hashing password");

        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "Failed to hash password");
                AppError::PasswordHash(format!("Password hashing failed: {}", e))
            })?;

        Ok(password_hash.to_string())
    }

    /// Verify a password against a hash
    ///
    /// Returns `Ok(true)` on match, `Ok(false)` on mismatch.
    ///
    /// # Errors
    ///
    /// Returns `AppError::PasswordHash` if the stored hash cannot be parsed
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "Failed to parse password hash");
            AppError::PasswordHash(format!("Invalid password hash: {}", e))
        })?;

        Ok(self
            .argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = PasswordService::new();
        let hash = service.hash_password("geheim-wachtwoord").unwrap();

        assert!(service.verify_password("geheim-wachtwoord", &hash).unwrap());
        assert!(!service.verify_password("fout-wachtwoord", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let service = PasswordService::new();
        let hash1 = service.hash_password("hetzelfde").unwrap();
        let hash2 = service.hash_password("hetzelfde").unwrap();
        assert_ne!(hash1, hash2);
    }

    #[test]
    fn test_invalid_hash_rejected() {
        let service = PasswordService::new();
        let result = service.verify_password("whatever", "not-a-phc-string");
        assert!(matches!(result, Err(AppError::PasswordHash(_))));
    }
}
