//! Call settlement service
//!
//! Invoked once per call reaching a terminal status. Claims the call through
//! an atomic find-and-update on `settled_at`, evaluates the refund rules
//! owned by the call model, and applies the credit refund and statistics
//! updates in a single transaction. Losing the claim race is a no-op, so any
//! number of concurrent settlers produce the same end state.

use belgrap_core::{
    models::SettlementOutcome,
    traits::CallRepository,
    AppError, AppResult,
};
use belgrap_db::PgCallRepository;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

/// Settlement service
pub struct SettlementService {
    pool: PgPool,
}

impl SettlementService {
    /// Create a new settlement service
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Settle a call that reached a terminal status
    ///
    /// Returns `Ok(None)` when another settler already claimed the call; the
    /// caller treats that as success. A refund is applied only when a rule
    /// matched, the call was not free, and nothing was refunded before.
    #[instrument(skip(self))]
    pub async fn settle(&self, call_id: Uuid) -> AppResult<Option<SettlementOutcome>> {
        let repo = PgCallRepository::new(self.pool.clone());

        let Some(call) = repo.claim_settlement(call_id).await? else {
            debug!("Call {} already settled, skipping", call_id);
            return Ok(None);
        };

        let outcome = call.evaluate_settlement();
        let refund = outcome.refund && call.refundable();

        info!(
            call_id = %call_id,
            duration_secs = outcome.duration_secs,
            refund,
            reason = ?outcome.reason,
            successful = outcome.successful,
            "Settling call"
        );

        let mut tx = self.pool.begin().await.map_err(|e| {
            error!("Failed to start settlement transaction: {}", e);
            AppError::Transaction(format!("Failed to start transaction: {}", e))
        })?;

        // Persist the settlement verdict on the call
        sqlx::query(
            r#"
            UPDATE calls
            SET duration_secs = $2,
                was_successful = $3,
                refund_reason = $4,
                credits_refunded = CASE WHEN $5 THEN credits_used ELSE credits_refunded END,
                refunded_at = CASE WHEN $5 THEN NOW() ELSE refunded_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(call.id)
        .bind(outcome.duration_secs)
        .bind(outcome.successful)
        .bind(outcome.reason.map(|r| r.to_string()))
        .bind(refund)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to persist settlement verdict: {}", e);
            AppError::Database(format!("Failed to persist settlement: {}", e))
        })?;

        // Update the owner's statistics and, on refund, return the credit and
        // back the call out of the lifetime counter.
        sqlx::query(
            r#"
            UPDATE users
            SET successful_calls = successful_calls + $2,
                total_seconds = total_seconds + $3,
                credits = credits + $4,
                total_calls = GREATEST(total_calls - $5, 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(call.user_id)
        .bind(i64::from(outcome.successful))
        .bind(outcome.duration_secs)
        .bind(if refund { call.credits_used } else { 0 })
        .bind(if refund { 1_i64 } else { 0 })
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update user statistics: {}", e);
            AppError::Database(format!("Failed to update user statistics: {}", e))
        })?;

        // Scenario usage counter
        sqlx::query(
            "UPDATE scenarios SET times_used = times_used + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(&call.scenario_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!("Failed to update scenario usage: {}", e);
            AppError::Database(format!("Failed to update scenario usage: {}", e))
        })?;

        tx.commit().await.map_err(|e| {
            error!("Failed to commit settlement transaction: {}", e);
            AppError::Transaction(format!("Failed to commit transaction: {}", e))
        })?;

        if refund {
            info!(
                call_id = %call_id,
                user_id = %call.user_id,
                credits = call.credits_used,
                reason = %outcome.reason.map(|r| r.to_string()).unwrap_or_default(),
                "Refunded call credit"
            );
        }

        Ok(Some(outcome))
    }
}
