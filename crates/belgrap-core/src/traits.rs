//! Common traits for repositories and services
//!
//! Defines abstractions for database access and business logic.

use crate::error::AppError;
use crate::models::{
    Call, CallStatus, ReferralInvite, ReferralMilestone, Scenario, User,
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// Generic repository trait for CRUD operations
#[async_trait]
pub trait Repository<T, ID>: Send + Sync {
    /// Find entity by ID
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, AppError>;

    /// Create a new entity
    async fn create(&self, entity: &T) -> Result<T, AppError>;

    /// Update an existing entity
    async fn update(&self, entity: &T) -> Result<T, AppError>;

    /// Delete entity by ID
    async fn delete(&self, id: ID) -> Result<bool, AppError>;
}

/// User repository trait with specialized methods
#[async_trait]
pub trait UserRepository: Repository<User, Uuid> {
    /// Find user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Find user by referral code
    async fn find_by_referral_code(&self, code: &str) -> Result<Option<User>, AppError>;

    /// Atomically charge one credit and bump the lifetime call counter
    ///
    /// Returns the new balance, or `None` when the guard (`credits >= 1`)
    /// failed because the balance was spent concurrently.
    async fn debit_call_credit(&self, id: Uuid) -> Result<Option<i64>, AppError>;

    /// Undo a call-credit debit (start-path rollback)
    async fn revert_call_credit(&self, id: Uuid) -> Result<(), AppError>;

    /// Add credits to a user's balance; returns the new balance
    async fn add_credits(&self, id: Uuid, amount: i64) -> Result<i64, AppError>;

    /// Mark the user as having completed a purchase
    async fn mark_purchased(&self, id: Uuid) -> Result<(), AppError>;
}

/// Call repository trait with specialized methods
#[async_trait]
pub trait CallRepository: Repository<Call, Uuid> {
    /// Find call by the provider's external call id
    async fn find_by_provider_id(&self, provider_call_id: &str)
        -> Result<Option<Call>, AppError>;

    /// Find call by its public share id
    async fn find_by_share_id(&self, share_id: &str) -> Result<Option<Call>, AppError>;

    /// List a user's calls, newest first
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Call>, i64), AppError>;

    /// Persist the latest provider snapshot (status, timestamps, outcome)
    async fn apply_provider_snapshot(&self, call: &Call) -> Result<(), AppError>;

    /// Mark a call terminal with the given status and end timestamp
    async fn mark_terminal(&self, id: Uuid, status: CallStatus) -> Result<(), AppError>;

    /// Atomically claim settlement for a call
    ///
    /// Stamps `settled_at` only when it was previously unset and returns the
    /// claimed row; `None` means another settler already won the race.
    async fn claim_settlement(&self, id: Uuid) -> Result<Option<Call>, AppError>;

    /// Mint (or return the existing) public share id for a call
    async fn mint_share_id(&self, id: Uuid) -> Result<String, AppError>;

    /// Increment the public-playback counter
    async fn bump_share_count(&self, share_id: &str) -> Result<(), AppError>;

    /// Increment the download counter
    async fn bump_download_count(&self, id: Uuid) -> Result<(), AppError>;
}

/// Scenario repository trait with specialized methods
#[async_trait]
pub trait ScenarioRepository: Repository<Scenario, String> {
    /// List scenarios visible in the public catalog
    async fn list_public(&self) -> Result<Vec<Scenario>, AppError>;

    /// List every scenario (admin view)
    async fn list_all(&self) -> Result<Vec<Scenario>, AppError>;
}

/// Durable idempotency ledger for processed payment sessions
#[async_trait]
pub trait PaymentLedger: Send + Sync {
    /// Record a session as processed
    ///
    /// Returns `true` when this call inserted the row, `false` when the
    /// session was already recorded (the no-op path).
    async fn record_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        credits: i64,
        package_id: &str,
        amount_cents: i64,
        source: crate::models::PaymentSource,
    ) -> Result<bool, AppError>;

    /// Check whether a session was already processed
    async fn is_processed(&self, session_id: &str) -> Result<bool, AppError>;
}

/// Referral graph repository
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Register an invite at the referred user's registration
    async fn create_invite(
        &self,
        referrer_id: Uuid,
        referred_user_id: Uuid,
        referred_email: &str,
    ) -> Result<ReferralInvite, AppError>;

    /// Atomically claim the one-time first-purchase reward for an invite
    ///
    /// Flips `credits_earned` from 0 to 1 and returns the referrer id, or
    /// `None` when there is no invite or it was already rewarded.
    async fn claim_purchase_reward(
        &self,
        referred_user_id: Uuid,
    ) -> Result<Option<Uuid>, AppError>;

    /// Count invites registered by a referrer
    async fn count_invites(&self, referrer_id: Uuid) -> Result<i64, AppError>;

    /// Award a milestone once; `true` when this call created the achievement
    async fn try_award_milestone(
        &self,
        user_id: Uuid,
        threshold: i64,
        credits_awarded: i64,
    ) -> Result<bool, AppError>;

    /// List a referrer's invites, newest first
    async fn list_invites(&self, referrer_id: Uuid) -> Result<Vec<ReferralInvite>, AppError>;

    /// List a user's achieved milestones
    async fn list_milestones(&self, user_id: Uuid)
        -> Result<Vec<ReferralMilestone>, AppError>;
}

/// Cache service trait
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Get value from cache
    async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError>;

    /// Set value in cache with TTL
    async fn set<T: Serialize + Send + Sync>(
        &self,
        key: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<(), AppError>;

    /// Delete value from cache
    async fn delete(&self, key: &str) -> Result<bool, AppError>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool, AppError>;
}

/// Pagination parameters
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
}

impl Pagination {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.clamp(1, 100),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Clone, Serialize)]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, per_page: i64) -> Self {
        let total_pages = if per_page > 0 {
            (total + per_page - 1) / per_page
        } else {
            0
        };

        Self {
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let p = Pagination::new(1, 10);
        assert_eq!(p.offset(), 0);
        assert_eq!(p.limit(), 10);

        let p = Pagination::new(3, 20);
        assert_eq!(p.offset(), 40);
        assert_eq!(p.limit(), 20);
    }

    #[test]
    fn test_pagination_bounds() {
        let p = Pagination::new(0, 10); // page 0 becomes 1
        assert_eq!(p.page, 1);

        let p = Pagination::new(1, 2000); // per_page capped at 100
        assert_eq!(p.per_page, 100);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(95, 1, 10);
        assert_eq!(meta.total_pages, 10);

        let meta = PaginationMeta::new(101, 1, 10);
        assert_eq!(meta.total_pages, 11);
    }
}
