//! User repository implementation
//!
//! PostgreSQL-backed storage for user entities. Credit mutations are atomic
//! single-statement updates; the call-credit debit carries a `credits >= 1`
//! guard so the balance can never go negative.

use belgrap_core::{
    models::{User, UserPlan, UserRole},
    traits::{Repository, UserRepository},
    AppError, AppResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, error, instrument};
use uuid::Uuid;

/// PostgreSQL implementation of UserRepository
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = r#"
    id, email, password_hash, role, plan, credits, has_purchased,
    total_calls, successful_calls, total_seconds,
    referral_code, referred_by, created_at, updated_at
"#;

#[async_trait]
impl Repository<User, Uuid> for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        debug!("Finding user by id: {}", id);

        let result = sqlx::query_as::<sqlx::Postgres, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding user {}: {}", id, e);
            AppError::Database(format!("Failed to find user: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self, entity))]
    async fn create(&self, entity: &User) -> AppResult<User> {
        debug!("Creating user: {}", entity.email);

        let row = sqlx::query_as::<sqlx::Postgres, UserRow>(&format!(
            r#"
            INSERT INTO users (
                id, email, password_hash, role, plan, credits, has_purchased,
                referral_code, referred_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.email)
        .bind(&entity.password_hash)
        .bind(entity.role.to_string())
        .bind(entity.plan.to_string())
        .bind(entity.credits)
        .bind(entity.has_purchased)
        .bind(&entity.referral_code)
        .bind(entity.referred_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error creating user: {}", e);
            if e.to_string().contains("unique constraint") {
                AppError::AlreadyExists(format!("User {} already exists", entity.email))
            } else {
                AppError::Database(format!("Failed to create user: {}", e))
            }
        })?;

        Ok(row.into())
    }

    #[instrument(skip(self, entity))]
    async fn update(&self, entity: &User) -> AppResult<User> {
        let row = sqlx::query_as::<sqlx::Postgres, UserRow>(&format!(
            r#"
            UPDATE users
            SET email = $2, role = $3, plan = $4, has_purchased = $5,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(entity.id)
        .bind(&entity.email)
        .bind(entity.role.to_string())
        .bind(entity.plan.to_string())
        .bind(entity.has_purchased)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error updating user {}: {}", entity.id, e);
            AppError::Database(format!("Failed to update user: {}", e))
        })?
        .ok_or_else(|| AppError::UserNotFound(entity.id.to_string()))?;

        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error deleting user {}: {}", id, e);
                AppError::Database(format!("Failed to delete user: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    #[instrument(skip(self))]
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<sqlx::Postgres, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE lower(email) = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding user by email: {}", e);
            AppError::Database(format!("Failed to find user: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn find_by_referral_code(&self, code: &str) -> AppResult<Option<User>> {
        let result = sqlx::query_as::<sqlx::Postgres, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE referral_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error finding user by referral code: {}", e);
            AppError::Database(format!("Failed to find user: {}", e))
        })?;

        Ok(result.map(Into::into))
    }

    #[instrument(skip(self))]
    async fn debit_call_credit(&self, id: Uuid) -> AppResult<Option<i64>> {
        debug!("Debiting one call credit for user {}", id);

        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET credits = credits - 1,
                total_calls = total_calls + 1,
                updated_at = NOW()
            WHERE id = $1 AND credits >= 1
            RETURNING credits
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error debiting credit for user {}: {}", id, e);
            AppError::Database(format!("Failed to debit credit: {}", e))
        })?;

        Ok(row.map(|(credits,)| credits))
    }

    #[instrument(skip(self))]
    async fn revert_call_credit(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET credits = credits + 1,
                total_calls = GREATEST(total_calls - 1, 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error reverting credit for user {}: {}", id, e);
            AppError::Database(format!("Failed to revert credit: {}", e))
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_credits(&self, id: Uuid, amount: i64) -> AppResult<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            UPDATE users
            SET credits = credits + $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING credits
            "#,
        )
        .bind(id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Database error adding credits for user {}: {}", id, e);
            AppError::Database(format!("Failed to add credits: {}", e))
        })?;

        Ok(row.0)
    }

    #[instrument(skip(self))]
    async fn mark_purchased(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("UPDATE users SET has_purchased = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Database error marking user {} purchased: {}", id, e);
                AppError::Database(format!("Failed to mark purchased: {}", e))
            })?;

        Ok(())
    }
}

/// Helper struct for mapping database rows
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    plan: String,
    credits: i64,
    has_purchased: bool,
    total_calls: i64,
    successful_calls: i64,
    total_seconds: i64,
    referral_code: Option<String>,
    referred_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role: UserRole::from_str(&row.role).unwrap_or_default(),
            plan: UserPlan::from_str(&row.plan).unwrap_or_default(),
            credits: row.credits,
            has_purchased: row.has_purchased,
            total_calls: row.total_calls,
            successful_calls: row.successful_calls,
            total_seconds: row.total_seconds,
            referral_code: row.referral_code,
            referred_by: row.referred_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
