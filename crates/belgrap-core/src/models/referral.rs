//! Referral entities
//!
//! The referral graph is normalized: invites and milestone achievements are
//! separate indexed tables keyed by the referring user, instead of embedded
//! sub-documents that could drift out of sync.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invite-count thresholds and the one-time credit bonus each unlocks
pub const REFERRAL_MILESTONES: &[(i64, i64)] = &[(3, 2), (5, 3), (10, 5), (25, 10)];

/// Credits granted to a referrer per referred user's first purchase
pub const REFERRAL_REWARD_CREDITS: i64 = 1;

/// One invite record: referrer -> referred user
///
/// `credits_earned` stays 0 until the referred user's first completed
/// purchase, at which point exactly one credit is granted to the referrer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralInvite {
    /// Unique identifier
    pub id: i64,

    /// Referring user
    pub referrer_id: Uuid,

    /// Referred user (unique; a user is referred at most once)
    pub referred_user_id: Uuid,

    /// Denormalized referred email for display
    pub referred_email: String,

    /// Credits earned by the referrer from this invite (0 or 1)
    pub credits_earned: i64,

    /// Creation timestamp (registration of the referred user)
    pub created_at: DateTime<Utc>,

    /// When the referrer reward was granted
    pub rewarded_at: Option<DateTime<Utc>>,
}

/// A milestone achievement, awarded at most once per threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralMilestone {
    /// Unique identifier
    pub id: i64,

    /// User who reached the milestone
    pub user_id: Uuid,

    /// Invite-count threshold (3/5/10/25)
    pub threshold: i64,

    /// Bonus credits granted
    pub credits_awarded: i64,

    /// When the milestone was achieved
    pub achieved_at: DateTime<Utc>,
}

/// Mint a fresh referral code
///
/// Short, uppercase, collision-checked against the unique column on insert.
pub fn mint_referral_code() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_milestones_escalate() {
        let mut last_threshold = 0;
        let mut last_bonus = 0;
        for &(threshold, bonus) in REFERRAL_MILESTONES {
            assert!(threshold > last_threshold);
            assert!(bonus > last_bonus);
            last_threshold = threshold;
            last_bonus = bonus;
        }
    }

    #[test]
    fn test_mint_referral_code_shape() {
        let code = mint_referral_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));

        // Codes are random; two mints should differ.
        assert_ne!(mint_referral_code(), mint_referral_code());
    }
}
