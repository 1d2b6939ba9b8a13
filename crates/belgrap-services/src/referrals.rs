//! Referral reward service
//!
//! Registers invites at signup and pays out referrer rewards when a referred
//! user's first purchase settles. Every grant is guarded at the storage
//! layer: the invite reward flips `credits_earned` from 0 exactly once, and
//! each milestone row can only be inserted once per threshold.

use belgrap_core::{
    models::{
        ReferralInvite, ReferralMilestone, User, REFERRAL_MILESTONES, REFERRAL_REWARD_CREDITS,
    },
    traits::{ReferralRepository, UserRepository},
    AppResult,
};
use belgrap_db::{PgReferralRepository, PgUserRepository};
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Referral reward service
pub struct ReferralService {
    pool: PgPool,
}

/// A referrer's view of their invites and milestones
#[derive(Debug, Clone, serde::Serialize)]
pub struct ReferralOverview {
    pub invites: Vec<ReferralInvite>,
    pub milestones: Vec<ReferralMilestone>,
    pub credits_earned: i64,
}

impl ReferralService {
    /// Create a new referral service
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Resolve a referral code to its owner
    ///
    /// Returns `None` for unknown codes and for self-referrals.
    #[instrument(skip(self))]
    pub async fn resolve_code(&self, code: &str, new_user_email: &str) -> AppResult<Option<User>> {
        let users = PgUserRepository::new(self.pool.clone());

        let Some(referrer) = users.find_by_referral_code(code).await? else {
            debug!("Unknown referral code: {}", code);
            return Ok(None);
        };

        if referrer.email.eq_ignore_ascii_case(new_user_email) {
            debug!("Ignoring self-referral for {}", new_user_email);
            return Ok(None);
        }

        Ok(Some(referrer))
    }

    /// Register an invite for a freshly created referred user
    #[instrument(skip(self))]
    pub async fn register_invite(
        &self,
        referrer_id: Uuid,
        referred_user_id: Uuid,
        referred_email: &str,
    ) -> AppResult<ReferralInvite> {
        let repo = PgReferralRepository::new(self.pool.clone());
        let invite = repo
            .create_invite(referrer_id, referred_user_id, referred_email)
            .await?;

        info!(
            referrer_id = %referrer_id,
            referred_user_id = %referred_user_id,
            "Referral invite registered"
        );

        Ok(invite)
    }

    /// Pay the referrer when a referred user's purchase settles
    ///
    /// Safe to call on every settled purchase: only the first one flips the
    /// invite's `credits_earned` guard, later calls are no-ops.
    #[instrument(skip(self))]
    pub async fn reward_referrer_for(&self, referred_user_id: Uuid) -> AppResult<()> {
        let repo = PgReferralRepository::new(self.pool.clone());

        let Some(referrer_id) = repo.claim_purchase_reward(referred_user_id).await? else {
            debug!(
                "No unrewarded invite for user {}, nothing to pay",
                referred_user_id
            );
            return Ok(());
        };

        let users = PgUserRepository::new(self.pool.clone());
        let balance = users
            .add_credits(referrer_id, REFERRAL_REWARD_CREDITS)
            .await?;

        info!(
            referrer_id = %referrer_id,
            referred_user_id = %referred_user_id,
            balance,
            "Referrer rewarded for first purchase"
        );

        self.evaluate_milestones(referrer_id).await
    }

    /// Award any newly reached milestones for a referrer
    ///
    /// Each threshold pays out at most once; the unique (user, threshold)
    /// constraint carries the guarantee.
    #[instrument(skip(self))]
    pub async fn evaluate_milestones(&self, user_id: Uuid) -> AppResult<()> {
        let repo = PgReferralRepository::new(self.pool.clone());
        let users = PgUserRepository::new(self.pool.clone());

        let invite_count = repo.count_invites(user_id).await?;

        for &(threshold, bonus) in REFERRAL_MILESTONES {
            if invite_count < threshold {
                break;
            }

            if repo.try_award_milestone(user_id, threshold, bonus).await? {
                users.add_credits(user_id, bonus).await?;
                info!(
                    user_id = %user_id,
                    threshold,
                    bonus,
                    "Referral milestone awarded"
                );
            }
        }

        Ok(())
    }

    /// Build the referral overview for the API
    #[instrument(skip(self))]
    pub async fn overview(&self, user_id: Uuid) -> AppResult<ReferralOverview> {
        let repo = PgReferralRepository::new(self.pool.clone());

        let invites = repo.list_invites(user_id).await?;
        let milestones = repo.list_milestones(user_id).await?;
        let credits_earned = invites.iter().map(|i| i.credits_earned).sum::<i64>()
            + milestones.iter().map(|m| m.credits_awarded).sum::<i64>();

        Ok(ReferralOverview {
            invites,
            milestones,
            credits_earned,
        })
    }
}
