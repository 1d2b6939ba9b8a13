//! User model
//!
//! Represents platform users: credit balance, usage statistics and referral
//! linkage. Authentication state lives here; invite records live in the
//! normalized referral tables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User role enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Regular end user
    #[default]
    User,
    /// Administrator managing the scenario catalog
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::User => write!(f, "user"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl UserRole {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(UserRole::User),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Check if role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

/// Plan tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserPlan {
    #[default]
    Free,
    Starter,
    Pro,
}

impl fmt::Display for UserPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserPlan::Free => write!(f, "free"),
            UserPlan::Starter => write!(f, "starter"),
            UserPlan::Pro => write!(f, "pro"),
        }
    }
}

impl UserPlan {
    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "free" => Some(UserPlan::Free),
            "starter" => Some(UserPlan::Starter),
            "pro" => Some(UserPlan::Pro),
            _ => None,
        }
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: Uuid,

    /// Email address (unique, used for login)
    pub email: String,

    /// Password hash (never expose in API responses)
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// User role
    pub role: UserRole,

    /// Plan tag
    pub plan: UserPlan,

    /// Credit balance; never negative
    pub credits: i64,

    /// Whether the user has ever completed a purchase
    pub has_purchased: bool,

    /// Lifetime call count (refunded calls are backed out)
    pub total_calls: i64,

    /// Calls that met the success heuristic
    pub successful_calls: i64,

    /// Cumulative conversation seconds
    pub total_seconds: i64,

    /// Own referral code (unique when present)
    pub referral_code: Option<String>,

    /// Referrer back-reference, set at registration
    pub referred_by: Option<Uuid>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Check whether the user can start a call right now
    #[inline]
    pub fn can_start_call(&self) -> bool {
        self.credits >= 1
    }

    /// Check if user can perform admin actions
    pub fn can_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this user registered through someone's referral code
    pub fn was_referred(&self) -> bool {
        self.referred_by.is_some()
    }
}

impl Default for User {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email: String::new(),
            password_hash: String::new(),
            role: UserRole::User,
            plan: UserPlan::Free,
            credits: 0,
            has_purchased: false,
            total_calls: 0,
            successful_calls: 0,
            total_seconds: 0,
            referral_code: None,
            referred_by: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User info for API responses (without sensitive data)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub plan: String,
    pub credits: i64,
    pub has_purchased: bool,
    pub referral_code: Option<String>,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.to_string(),
            plan: user.plan.to_string(),
            credits: user.credits,
            has_purchased: user.has_purchased,
            referral_code: user.referral_code.clone(),
        }
    }
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing() {
        assert_eq!(UserRole::from_str("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_str("USER"), Some(UserRole::User));
        assert_eq!(UserRole::from_str("operator"), None);
        assert!(UserRole::Admin.is_admin());
        assert!(!UserRole::User.is_admin());
    }

    #[test]
    fn test_can_start_call() {
        let user = User {
            credits: 1,
            ..Default::default()
        };
        assert!(user.can_start_call());

        let broke = User {
            credits: 0,
            ..Default::default()
        };
        assert!(!broke.can_start_call());
    }

    #[test]
    fn test_user_info_hides_password() {
        let user = User {
            email: "jan@example.nl".to_string(),
            password_hash: "secret-hash".to_string(),
            credits: 3,
            ..Default::default()
        };
        let info = UserInfo::from(&user);
        assert_eq!(info.email, "jan@example.nl");
        assert_eq!(info.credits, 3);

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
