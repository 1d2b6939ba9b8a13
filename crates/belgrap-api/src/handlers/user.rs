//! User handlers
//!
//! Usage statistics and the referral overview for the current user.

use crate::dto::user::{ReferralsResponse, StatsResponse};
use crate::dto::ApiResponse;
use actix_web::{web, HttpResponse};
use belgrap_auth::AuthenticatedUser;
use belgrap_core::traits::Repository;
use belgrap_core::AppError;
use belgrap_db::PgUserRepository;
use belgrap_services::ReferralService;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Configure user routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/me/stats", web::get().to(my_stats))
            .route("/me/referrals", web::get().to(my_referrals)),
    );
}

/// Usage statistics for the current user
///
/// GET /api/v1/users/me/stats
#[instrument(skip(pool, user))]
pub async fn my_stats(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    debug!(user_id = %user.user_id, "Fetching user stats");

    let user_repo = PgUserRepository::new(pool.get_ref().clone());
    let db_user = user_repo
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user.user_id.to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(StatsResponse::from(&db_user))))
}

/// Referral overview for the current user
///
/// GET /api/v1/users/me/referrals
#[instrument(skip(pool, referrals, user))]
pub async fn my_referrals(
    pool: web::Data<PgPool>,
    referrals: web::Data<Arc<ReferralService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let user_repo = PgUserRepository::new(pool.get_ref().clone());
    let db_user = user_repo
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user.user_id.to_string()))?;

    let overview = referrals.overview(user.user_id).await?;
    let response = ReferralsResponse::new(db_user.referral_code, overview);

    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}
