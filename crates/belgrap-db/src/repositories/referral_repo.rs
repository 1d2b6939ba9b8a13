//! Referral repository implementation
//!
//! Normalized storage for the referral graph: one invite row per referred
//! user, one milestone row per achieved threshold. Reward claims are
//! compare-and-swap updates so each invite pays the referrer at most once.

use belgrap_core::{
    models::{ReferralInvite, ReferralMilestone},
    traits::ReferralRepository,
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of ReferralRepository
pub struct PgReferralRepository {
    pool: PgPool,
}

impl PgReferralRepository {
    /// Create a new referral repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReferralRepository for PgReferralRepository {
    #[instrument(skip(self))]
    async fn create_invite(
        &self,
        referrer_id: Uuid,
        referred_user_id: Uuid,
        referred_email: &str,
    ) -> AppResult<ReferralInvite> {
        debug!(
            "Registering invite: {} referred {}",
            referrer_id, referred_user_id
        );

        let row = sqlx::query_as::<sqlx::Postgres, InviteRow>(
            r#"
            INSERT INTO referral_invites (referrer_id, referred_user_id, referred_email)
            VALUES ($1, $2, $3)
            RETURNING id, referrer_id, referred_user_id, referred_email,
                      credits_earned, created_at, rewarded_at
            "#,
        )
        .bind(referrer_id)
        .bind(referred_user_id)
        .bind(referred_email)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating invite: {}", e);
            if e.to_string().contains("unique constraint") {
                AppError::AlreadyExists(format!(
                    "User {} was already referred",
                    referred_user_id
                ))
            } else {
                AppError::Database(format!("Failed to create invite: {}", e))
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn claim_purchase_reward(&self, referred_user_id: Uuid) -> AppResult<Option<Uuid>> {
        let row: Option<(Uuid,)> = sqlx::query_as(
            r#"
            UPDATE referral_invites
            SET credits_earned = 1, rewarded_at = NOW()
            WHERE referred_user_id = $1 AND credits_earned = 0
            RETURNING referrer_id
            "#,
        )
        .bind(referred_user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error claiming purchase reward: {}", e);
            AppError::Database(format!("Failed to claim purchase reward: {}", e))
        })?;

        Ok(row.map(|(referrer_id,)| referrer_id))
    }

    #[instrument(skip(self))]
    async fn count_invites(&self, referrer_id: Uuid) -> AppResult<i64> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM referral_invites WHERE referrer_id = $1")
                .bind(referrer_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    error!("Database error counting invites: {}", e);
                    AppError::Database(format!("Failed to count invites: {}", e))
                })?;

        Ok(row.0)
    }

    #[instrument(skip(self))]
    async fn try_award_milestone(
        &self,
        user_id: Uuid,
        threshold: i64,
        credits_awarded: i64,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO referral_milestones (user_id, threshold, credits_awarded)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, threshold) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(threshold)
        .bind(credits_awarded)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error awarding milestone: {}", e);
            AppError::Database(format!("Failed to award milestone: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn list_invites(&self, referrer_id: Uuid) -> AppResult<Vec<ReferralInvite>> {
        let rows = sqlx::query_as::<sqlx::Postgres, InviteRow>(
            r#"
            SELECT id, referrer_id, referred_user_id, referred_email,
                   credits_earned, created_at, rewarded_at
            FROM referral_invites
            WHERE referrer_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(referrer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing invites: {}", e);
            AppError::Database(format!("Failed to list invites: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_milestones(&self, user_id: Uuid) -> AppResult<Vec<ReferralMilestone>> {
        let rows = sqlx::query_as::<sqlx::Postgres, MilestoneRow>(
            r#"
            SELECT id, user_id, threshold, credits_awarded, achieved_at
            FROM referral_milestones
            WHERE user_id = $1
            ORDER BY threshold
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing milestones: {}", e);
            AppError::Database(format!("Failed to list milestones: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct InviteRow {
    id: i64,
    referrer_id: Uuid,
    referred_user_id: Uuid,
    referred_email: String,
    credits_earned: i64,
    created_at: DateTime<Utc>,
    rewarded_at: Option<DateTime<Utc>>,
}

impl From<InviteRow> for ReferralInvite {
    fn from(row: InviteRow) -> Self {
        Self {
            id: row.id,
            referrer_id: row.referrer_id,
            referred_user_id: row.referred_user_id,
            referred_email: row.referred_email,
            credits_earned: row.credits_earned,
            created_at: row.created_at,
            rewarded_at: row.rewarded_at,
        }
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct MilestoneRow {
    id: i64,
    user_id: Uuid,
    threshold: i64,
    credits_awarded: i64,
    achieved_at: DateTime<Utc>,
}

impl From<MilestoneRow> for ReferralMilestone {
    fn from(row: MilestoneRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            threshold: row.threshold,
            credits_awarded: row.credits_awarded,
            achieved_at: row.achieved_at,
        }
    }
}
