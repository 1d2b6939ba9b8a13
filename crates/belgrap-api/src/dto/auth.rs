//! Authentication DTOs
//!
//! Request and response types for authentication endpoints.

use belgrap_core::models::UserInfo;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Registration request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Optional referral code of an existing user
    #[validate(length(max = 16, message = "Referral code too long"))]
    pub referral_code: Option<String>,
}

/// Login request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Login/registration response
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    /// Access token (JWT)
    pub access_token: String,

    /// Token type (always "Bearer")
    pub token_type: String,

    /// Token expiration time in seconds
    pub expires_in: i64,

    /// User information
    pub user: UserInfo,
}

impl LoginResponse {
    /// Create a new login response
    pub fn new(access_token: String, expires_in: i64, user: UserInfo) -> Self {
        Self {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in,
            user,
        }
    }
}

/// Current user response
#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    /// User information
    pub user: UserInfo,

    /// Token expiration timestamp
    pub token_expires_at: DateTime<Utc>,
}

/// Logout response
#[derive(Debug, Clone, Serialize)]
pub struct LogoutResponse {
    /// Success message
    pub message: String,
}

impl Default for LogoutResponse {
    fn default() -> Self {
        Self {
            message: "Logged out successfully".to_string(),
        }
    }
}
