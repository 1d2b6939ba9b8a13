//! Payment ledger repository
//!
//! The processed-session ledger. `record_session` is the idempotency guard
//! for crediting: the uniqueness constraint on `session_id` makes the insert
//! succeed exactly once no matter how many verify calls and webhook
//! deliveries race for the same checkout.

use belgrap_core::{models::PaymentSource, traits::PaymentLedger, AppError, AppResult};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of the payment ledger
pub struct PgPaymentLedger {
    pool: PgPool,
}

impl PgPaymentLedger {
    /// Create a new payment ledger
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentLedger for PgPaymentLedger {
    #[instrument(skip(self))]
    async fn record_session(
        &self,
        session_id: &str,
        user_id: Uuid,
        credits: i64,
        package_id: &str,
        amount_cents: i64,
        source: PaymentSource,
    ) -> AppResult<bool> {
        debug!("Recording payment session {}", session_id);

        let result = sqlx::query(
            r#"
            INSERT INTO payment_sessions (
                session_id, user_id, credits, package_id, amount_cents, source
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_id) DO NOTHING
            "#,
        )
        .bind(session_id)
        .bind(user_id)
        .bind(credits)
        .bind(package_id)
        .bind(amount_cents)
        .bind(source.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error recording session {}: {}", session_id, e);
            AppError::Database(format!("Failed to record payment session: {}", e))
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn is_processed(&self, session_id: &str) -> AppResult<bool> {
        let row: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM payment_sessions WHERE session_id = $1)")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| {
                    error!("Database error checking session {}: {}", session_id, e);
                    AppError::Database(format!("Failed to check payment session: {}", e))
                })?;

        Ok(row.0)
    }
}
