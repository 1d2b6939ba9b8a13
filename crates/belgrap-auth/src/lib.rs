//! Authentication and authorization for Belgrap
//!
//! This crate provides JWT-based authentication, password hashing with Argon2,
//! and Actix-web extractors for role-based access control.
//!
//! # Features
//!
//! - JWT token creation and validation
//! - Argon2 password hashing and verification
//! - Request extractors for authenticated users and admins

pub mod claims;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use claims::Claims;
pub use jwt::JwtService;
pub use middleware::{AdminUser, AuthenticatedUser};
pub use password::PasswordService;

#[cfg(test)]
mod tests {
    use super::*;
    use belgrap_core::models::UserRole;
    use uuid::Uuid;

    #[test]
    fn test_integration_jwt_and_password() {
        let password_service = PasswordService::new();
        let jwt_service = JwtService::new("test-secret-key-12345", 3600);

        // Test password hashing
        let password = "my_secure_password";
        let hash = password_service.hash_password(password).unwrap();
        assert!(password_service.verify_password(password, &hash).unwrap());
        assert!(!password_service
            .verify_password("wrong_password", &hash)
            .unwrap());

        // Test JWT creation and validation
        let id = Uuid::new_v4();
        let claims = Claims::new(id, "test@belgrap.nl", UserRole::Admin);
        let token = jwt_service.create_token(&claims).unwrap();
        let decoded_claims = jwt_service.validate_token(&token).unwrap();

        assert_eq!(decoded_claims.sub, id);
        assert_eq!(decoded_claims.role, UserRole::Admin);
    }
}
