//! JWT Claims structure
//!
//! Defines the claims structure used in JWT tokens for authentication.

use belgrap_core::models::UserRole;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT Claims
///
/// Standard claims used in JWT tokens for user authentication.
/// The subject is the user's id; the email rides along for logging and
/// display without an extra lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (user id)
    pub sub: Uuid,

    /// User email
    pub email: String,

    /// User role
    pub role: UserRole,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl Claims {
    /// Create new claims for a user; expiration is set by the JwtService
    pub fn new(user_id: Uuid, email: &str, role: UserRole) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: 0, // Will be set by JwtService
        }
    }

    /// Create new claims with custom expiration duration
    pub fn with_expiration(
        user_id: Uuid,
        email: &str,
        role: UserRole,
        expires_in_secs: i64,
    ) -> Self {
        let now = Utc::now();
        let exp = now + Duration::seconds(expires_in_secs);

        Self {
            sub: user_id,
            email: email.to_string(),
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }

    /// Check if the token is expired
    pub fn is_expired(&self) -> bool {
        let now = Utc::now().timestamp();
        self.exp <= now
    }

    /// Get the user id from the claims
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Check if user has admin privileges
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_creation() {
        let id = Uuid::new_v4();
        let claims = Claims::new(id, "jan@example.nl", UserRole::User);
        assert_eq!(claims.sub, id);
        assert_eq!(claims.email, "jan@example.nl");
        assert_eq!(claims.role, UserRole::User);
        assert_eq!(claims.exp, 0);
    }

    #[test]
    fn test_expiration() {
        let id = Uuid::new_v4();
        let valid = Claims::with_expiration(id, "a@b.nl", UserRole::User, 3600);
        assert!(!valid.is_expired());

        let expired = Claims::with_expiration(id, "a@b.nl", UserRole::User, -10);
        assert!(expired.is_expired());
    }

    #[test]
    fn test_admin_check() {
        let id = Uuid::new_v4();
        assert!(Claims::new(id, "a@b.nl", UserRole::Admin).is_admin());
        assert!(!Claims::new(id, "a@b.nl", UserRole::User).is_admin());
    }
}
