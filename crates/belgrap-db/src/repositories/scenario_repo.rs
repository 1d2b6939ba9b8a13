//! Scenario repository implementation
//!
//! PostgreSQL-backed storage for the scenario catalog.

use belgrap_core::{
    models::Scenario,
    traits::{Repository, ScenarioRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, instrument};

/// PostgreSQL implementation of ScenarioRepository
pub struct PgScenarioRepository {
    pool: PgPool,
}

impl PgScenarioRepository {
    /// Create a new scenario repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SCENARIO_COLUMNS: &str = r#"
    id, name, description, icon, image_url, category, difficulty,
    duration_label, script, audio_config, assistant_id,
    active, public, times_used, created_at, updated_at
"#;

#[async_trait]
impl Repository<Scenario, String> for PgScenarioRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: String) -> AppResult<Option<Scenario>> {
        debug!("Finding scenario: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, ScenarioRow>(&format!(
            "SELECT {SCENARIO_COLUMNS} FROM scenarios WHERE id = $1"
        ))
        .bind(&id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding scenario {}: {}", id, e);
            AppError::Database(format!("Failed to find scenario: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &Scenario) -> AppResult<Scenario> {
        debug!("Creating scenario: {}", entity.id);

        let row = sqlx::query_as::<sqlx::Postgres, ScenarioRow>(&format!(
            r#"
            INSERT INTO scenarios (
                id, name, description, icon, image_url, category, difficulty,
                duration_label, script, audio_config, assistant_id, active, public
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {SCENARIO_COLUMNS}
            "#
        ))
        .bind(&entity.id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(&entity.icon)
        .bind(&entity.image_url)
        .bind(&entity.category)
        .bind(&entity.difficulty)
        .bind(&entity.duration_label)
        .bind(&entity.script)
        .bind(&entity.audio_config)
        .bind(&entity.assistant_id)
        .bind(entity.active)
        .bind(entity.public)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating scenario: {}", e);
            if e.to_string().contains("unique constraint") {
                AppError::AlreadyExists(format!("Scenario {} already exists", entity.id))
            } else {
                AppError::Database(format!("Failed to create scenario: {}", e))
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &Scenario) -> AppResult<Scenario> {
        let row = sqlx::query_as::<sqlx::Postgres, ScenarioRow>(&format!(
            r#"
            UPDATE scenarios
            SET name = $2, description = $3, icon = $4, image_url = $5,
                category = $6, difficulty = $7, duration_label = $8,
                script = $9, audio_config = $10, assistant_id = $11,
                active = $12, public = $13, updated_at = NOW()
            WHERE id = $1
            RETURNING {SCENARIO_COLUMNS}
            "#
        ))
        .bind(&entity.id)
        .bind(&entity.name)
        .bind(&entity.description)
        .bind(&entity.icon)
        .bind(&entity.image_url)
        .bind(&entity.category)
        .bind(&entity.difficulty)
        .bind(&entity.duration_label)
        .bind(&entity.script)
        .bind(&entity.audio_config)
        .bind(&entity.assistant_id)
        .bind(entity.active)
        .bind(entity.public)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating scenario {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update scenario: {}", e))
        })?
        .ok_or_else(|| AppError::ScenarioNotFound(entity.id.clone()))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: String) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM scenarios WHERE id = $1")
            .bind(&id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting scenario {}: {}", id, e);
                AppError::Database(format!("Failed to delete scenario: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ScenarioRepository for PgScenarioRepository {
    #[instrument(skip(self))]
    async fn list_public(&self) -> AppResult<Vec<Scenario>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ScenarioRow>(&format!(
            r#"
            SELECT {SCENARIO_COLUMNS} FROM scenarios
            WHERE active = TRUE AND public = TRUE
            ORDER BY times_used DESC, name
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing public scenarios: {}", e);
            AppError::Database(format!("Failed to list scenarios: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> AppResult<Vec<Scenario>> {
        let rows = sqlx::query_as::<sqlx::Postgres, ScenarioRow>(&format!(
            "SELECT {SCENARIO_COLUMNS} FROM scenarios ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error listing scenarios: {}", e);
            AppError::Database(format!("Failed to list scenarios: {}", e))
        })?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct ScenarioRow {
    id: String,
    name: String,
    description: String,
    icon: Option<String>,
    image_url: Option<String>,
    category: Option<String>,
    difficulty: Option<String>,
    duration_label: Option<String>,
    script: String,
    audio_config: Option<serde_json::Value>,
    assistant_id: String,
    active: bool,
    public: bool,
    times_used: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ScenarioRow> for Scenario {
    fn from(row: ScenarioRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            icon: row.icon,
            image_url: row.image_url,
            category: row.category,
            difficulty: row.difficulty,
            duration_label: row.duration_label,
            script: row.script,
            audio_config: row.audio_config,
            assistant_id: row.assistant_id,
            active: row.active,
            public: row.public,
            times_used: row.times_used,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
