//! Call repository implementation
//!
//! PostgreSQL-backed storage for call records. Terminal transitions and the
//! settlement claim are single-statement compare-and-swap updates so two
//! concurrent pollers can never both settle the same call.

use belgrap_core::{
    models::{Call, CallStatus, ProviderOutcome, RecordingInfo, RefundReason},
    traits::{CallRepository, Repository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of CallRepository
pub struct PgCallRepository {
    pool: PgPool,
}

impl PgCallRepository {
    /// Create a new call repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const CALL_COLUMNS: &str = r#"
    id, user_id, user_email, provider_call_id,
    target_number, formatted_number, target_name,
    scenario_id, scenario_name, scenario_icon, assistant_id,
    status, started_at, ended_at, duration_secs,
    cost, transcript, recording_url, ended_reason,
    voicemail, human_interaction, classification, flow_score,
    recording_available, share_id, share_count, download_count, is_public,
    credits_used, credits_refunded, refund_reason, refunded_at,
    settled_at, was_successful, free_call, error_message,
    created_at, updated_at
"#;

#[async_trait]
impl Repository<Call, Uuid> for PgCallRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Call>> {
        debug!("Finding call by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, CallRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM calls WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding call {}: {}", id, e);
            AppError::Database(format!("Failed to find call: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Call) -> AppResult<Call> {
        debug!(
            "Creating call record for provider call {}",
            entity.provider_call_id
        );

        let row = sqlx::query_as::<sqlx::Postgres, CallRow>(&format!(
            r#"
            INSERT INTO calls (
                id, user_id, user_email, provider_call_id,
                target_number, formatted_number, target_name,
                scenario_id, scenario_name, scenario_icon, assistant_id,
                status, credits_used, free_call
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING {CALL_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.user_id)
        .bind(&entity.user_email)
        .bind(&entity.provider_call_id)
        .bind(&entity.target_number)
        .bind(&entity.formatted_number)
        .bind(&entity.target_name)
        .bind(&entity.scenario_id)
        .bind(&entity.scenario_name)
        .bind(&entity.scenario_icon)
        .bind(&entity.assistant_id)
        .bind(entity.status.to_string())
        .bind(entity.credits_used)
        .bind(entity.free_call)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating call: {}", e);
            if e.to_string().contains("unique constraint") {
                AppError::AlreadyExists(format!(
                    "Call {} already exists",
                    entity.provider_call_id
                ))
            } else {
                AppError::Database(format!("Failed to create call: {}", e))
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Call) -> AppResult<Call> {
        let row = sqlx::query_as::<sqlx::Postgres, CallRow>(&format!(
            r#"
            UPDATE calls
            SET status = $2, started_at = $3, ended_at = $4, duration_secs = $5,
                cost = $6, transcript = $7, recording_url = $8, ended_reason = $9,
                voicemail = $10, human_interaction = $11, classification = $12,
                flow_score = $13, recording_available = $14, error_message = $15,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CALL_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(entity.status.to_string())
        .bind(entity.started_at)
        .bind(entity.ended_at)
        .bind(entity.duration_secs)
        .bind(entity.outcome.cost)
        .bind(&entity.outcome.transcript)
        .bind(&entity.outcome.recording_url)
        .bind(&entity.outcome.ended_reason)
        .bind(entity.outcome.voicemail)
        .bind(entity.outcome.human_interaction)
        .bind(&entity.outcome.classification)
        .bind(entity.outcome.flow_score)
        .bind(entity.recording.available)
        .bind(&entity.error_message)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating call {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update call: {}", e))
        })?
        .ok_or_else(|| AppError::CallNotFound(entity.id.to_string()))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM calls WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting call {}: {}", id, e);
                AppError::Database(format!("Failed to delete call: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl CallRepository for PgCallRepository {
    #[instrument(skip(self))]
    async fn find_by_provider_id(&self, provider_call_id: &str) -> AppResult<Option<Call>> {
        let result = sqlx::query_as::<sqlx::Postgres, CallRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM calls WHERE provider_call_id = $1"
        ))
        .bind(provider_call_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding call by provider id: {}", e);
            AppError::Database(format!("Failed to find call: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_share_id(&self, share_id: &str) -> AppResult<Option<Call>> {
        let result = sqlx::query_as::<sqlx::Postgres, CallRow>(&format!(
            "SELECT {CALL_COLUMNS} FROM calls WHERE share_id = $1 AND is_public = TRUE"
        ))
        .bind(share_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding call by share id: {}", e);
            AppError::Database(format!("Failed to find call: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<Call>, i64)> {
        let rows = sqlx::query_as::<sqlx::Postgres, CallRow>(&format!(
            r#"
            SELECT {CALL_COLUMNS} FROM calls
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing calls for user {}: {}", user_id, e);
            AppError::Database(format!("Failed to list calls: {}", e))
        })?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM calls WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error counting calls: {}", e);
                AppError::Database(format!("Failed to count calls: {}", e))
            })?;

        Ok((rows.into_iter().map(Into::into).collect(), total.0))
    }

    async fn apply_provider_snapshot(&self, call: &Call) -> AppResult<()> {
        self.update(call).await.map(|_| ())
    }

    #[instrument(skip(self))]
    async fn mark_terminal(&self, id: Uuid, status: CallStatus) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE calls
            SET status = $2,
                ended_at = COALESCE(ended_at, NOW()),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error marking call {} terminal: {}", id, e);
            AppError::Database(format!("Failed to mark call terminal: {}", e))
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn claim_settlement(&self, id: Uuid) -> AppResult<Option<Call>> {
        debug!("Claiming settlement for call {}", id);

        let row = sqlx::query_as::<sqlx::Postgres, CallRow>(&format!(
            r#"
            UPDATE calls
            SET settled_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND settled_at IS NULL
            RETURNING {CALL_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error claiming settlement for {}: {}", id, e);
            AppError::Database(format!("Failed to claim settlement: {}", e))
        })?;

        Ok(row.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn mint_share_id(&self, id: Uuid) -> AppResult<String> {
        let candidate = Uuid::new_v4().simple().to_string()[..10].to_string();

        let row: Option<(String,)> = sqlx::query_as(
            r#"
            UPDATE calls
            SET share_id = COALESCE(share_id, $2),
                is_public = TRUE,
                updated_at = NOW()
            WHERE id = $1
            RETURNING share_id
            "#,
        )
        .bind(id)
        .bind(&candidate)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error minting share id for {}: {}", id, e);
            AppError::Database(format!("Failed to mint share id: {}", e))
        })?;

        row.map(|(share_id,)| share_id)
            .ok_or_else(|| AppError::CallNotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    async fn bump_share_count(&self, share_id: &str) -> AppResult<()> {
        sqlx::query(
            "UPDATE calls SET share_count = share_count + 1, updated_at = NOW() WHERE share_id = $1",
        )
        .bind(share_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error bumping share count: {}", e);
            AppError::Database(format!("Failed to bump share count: {}", e))
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn bump_download_count(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            "UPDATE calls SET download_count = download_count + 1, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error bumping download count: {}", e);
            AppError::Database(format!("Failed to bump download count: {}", e))
        })?;

        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct CallRow {
    id: Uuid,
    user_id: Uuid,
    user_email: String,
    provider_call_id: String,
    target_number: String,
    formatted_number: String,
    target_name: Option<String>,
    scenario_id: String,
    scenario_name: String,
    scenario_icon: Option<String>,
    assistant_id: String,
    status: String,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    duration_secs: i64,
    cost: Option<Decimal>,
    transcript: Option<String>,
    recording_url: Option<String>,
    ended_reason: Option<String>,
    voicemail: bool,
    human_interaction: Option<bool>,
    classification: Option<String>,
    flow_score: Option<i32>,
    recording_available: bool,
    share_id: Option<String>,
    share_count: i64,
    download_count: i64,
    is_public: bool,
    credits_used: i64,
    credits_refunded: i64,
    refund_reason: Option<String>,
    refunded_at: Option<DateTime<Utc>>,
    settled_at: Option<DateTime<Utc>>,
    was_successful: bool,
    free_call: bool,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CallRow> for Call {
    fn from(row: CallRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            user_email: row.user_email,
            provider_call_id: row.provider_call_id,
            target_number: row.target_number,
            formatted_number: row.formatted_number,
            target_name: row.target_name,
            scenario_id: row.scenario_id,
            scenario_name: row.scenario_name,
            scenario_icon: row.scenario_icon,
            assistant_id: row.assistant_id,
            status: CallStatus::from_str(&row.status).unwrap_or_default(),
            started_at: row.started_at,
            ended_at: row.ended_at,
            duration_secs: row.duration_secs,
            outcome: ProviderOutcome {
                duration_secs: if row.duration_secs > 0 {
                    Some(row.duration_secs)
                } else {
                    None
                },
                cost: row.cost,
                transcript: row.transcript,
                recording_url: row.recording_url.clone(),
                ended_reason: row.ended_reason,
                voicemail: row.voicemail,
                human_interaction: row.human_interaction,
                classification: row.classification,
                flow_score: row.flow_score,
            },
            recording: RecordingInfo {
                available: row.recording_available,
                url: row.recording_url,
                share_id: row.share_id,
                share_count: row.share_count,
                download_count: row.download_count,
                is_public: row.is_public,
            },
            credits_used: row.credits_used,
            credits_refunded: row.credits_refunded,
            refund_reason: row.refund_reason.as_deref().and_then(RefundReason::from_str),
            refunded_at: row.refunded_at,
            settled_at: row.settled_at,
            was_successful: row.was_successful,
            free_call: row.free_call,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
