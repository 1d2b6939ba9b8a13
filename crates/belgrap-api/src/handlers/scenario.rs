//! Scenario handlers
//!
//! Public catalog endpoints plus the admin CRUD surface.

use crate::dto::scenario::{
    AdminScenarioResponse, ScenarioCreateRequest, ScenarioResponse, ScenarioUpdateRequest,
};
use crate::dto::ApiResponse;
use actix_web::{web, HttpResponse};
use belgrap_auth::AdminUser;
use belgrap_cache::{keys, RedisCache};
use belgrap_core::traits::{CacheService, Repository, ScenarioRepository};
use belgrap_core::AppError;
use belgrap_db::PgScenarioRepository;
use belgrap_gateway::VoiceGatewayClient;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Configure scenario routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/scenarios")
            .route("", web::get().to(list_scenarios))
            .route("", web::post().to(create_scenario))
            .route("/admin", web::get().to(list_scenarios_admin))
            .route("/assistants", web::get().to(list_assistants))
            .route("/{id}", web::get().to(get_scenario))
            .route("/{id}", web::put().to(update_scenario))
            .route("/{id}", web::delete().to(delete_scenario)),
    );
}

/// Drop the cached catalog after an admin mutation
async fn invalidate_catalog(cache: &Option<web::Data<RedisCache>>) {
    if let Some(cache) = cache {
        if let Err(e) = cache.delete(&keys::scenario_catalog()).await {
            debug!("Failed to invalidate scenario catalog cache: {}", e);
        }
    }
}

/// Public scenario catalog
///
/// GET /api/v1/scenarios
#[instrument(skip(pool, cache))]
pub async fn list_scenarios(
    pool: web::Data<PgPool>,
    cache: Option<web::Data<RedisCache>>,
) -> Result<HttpResponse, AppError> {
    let cache_key = keys::scenario_catalog();

    if let Some(cache) = &cache {
        if let Ok(Some(cached)) = cache.get::<Vec<ScenarioResponse>>(&cache_key).await {
            debug!("Serving scenario catalog from cache");
            return Ok(HttpResponse::Ok().json(ApiResponse::success(cached)));
        }
    }

    let repo = PgScenarioRepository::new(pool.get_ref().clone());
    let scenarios = repo.list_public().await?;
    let data: Vec<ScenarioResponse> = scenarios.into_iter().map(Into::into).collect();

    if let Some(cache) = &cache {
        if let Err(e) = cache
            .set(&cache_key, &data, keys::SCENARIO_CATALOG_TTL)
            .await
        {
            debug!("Failed to cache scenario catalog: {}", e);
        }
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// Fetch a single scenario (public view)
///
/// GET /api/v1/scenarios/{id}
#[instrument(skip(pool))]
pub async fn get_scenario(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let repo = PgScenarioRepository::new(pool.get_ref().clone());
    let scenario = repo
        .find_by_id(id.clone())
        .await?
        .ok_or_else(|| AppError::ScenarioNotFound(id))?;

    if !scenario.public || !scenario.active {
        return Err(AppError::ScenarioNotFound(scenario.id));
    }

    Ok(HttpResponse::Ok().json(ApiResponse::success(ScenarioResponse::from(scenario))))
}

/// Full catalog including inactive scenarios (admin)
///
/// GET /api/v1/scenarios/admin
#[instrument(skip(pool, _admin))]
pub async fn list_scenarios_admin(
    pool: web::Data<PgPool>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let repo = PgScenarioRepository::new(pool.get_ref().clone());
    let scenarios = repo.list_all().await?;
    let data: Vec<AdminScenarioResponse> = scenarios.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

/// List the agents configured at the voice provider (admin)
///
/// GET /api/v1/scenarios/assistants
///
/// Used when linking a scenario to its agent.
#[instrument(skip(voice, _admin))]
pub async fn list_assistants(
    voice: web::Data<Arc<VoiceGatewayClient>>,
    _admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let assistants = voice.list_assistants().await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(assistants)))
}

/// Create a scenario (admin)
///
/// POST /api/v1/scenarios
#[instrument(skip(pool, cache, admin, req))]
pub async fn create_scenario(
    pool: web::Data<PgPool>,
    cache: Option<web::Data<RedisCache>>,
    admin: AdminUser,
    req: web::Json<ScenarioCreateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Scenario creation validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let repo = PgScenarioRepository::new(pool.get_ref().clone());
    let scenario = req.into_inner().into_scenario();
    let created = repo.create(&scenario).await?;

    invalidate_catalog(&cache).await;

    info!(
        scenario_id = %created.id,
        admin = %admin.user_id,
        "Scenario created"
    );

    Ok(HttpResponse::Created().json(ApiResponse::success(AdminScenarioResponse::from(created))))
}

/// Update a scenario (admin)
///
/// PUT /api/v1/scenarios/{id}
#[instrument(skip(pool, cache, admin, req))]
pub async fn update_scenario(
    pool: web::Data<PgPool>,
    cache: Option<web::Data<RedisCache>>,
    path: web::Path<String>,
    admin: AdminUser,
    req: web::Json<ScenarioUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Scenario update validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let id = path.into_inner();

    let repo = PgScenarioRepository::new(pool.get_ref().clone());
    let mut scenario = repo
        .find_by_id(id.clone())
        .await?
        .ok_or_else(|| AppError::ScenarioNotFound(id))?;

    req.into_inner().apply_to(&mut scenario);
    let updated = repo.update(&scenario).await?;

    invalidate_catalog(&cache).await;

    info!(
        scenario_id = %updated.id,
        admin = %admin.user_id,
        "Scenario updated"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(AdminScenarioResponse::from(updated))))
}

/// Delete a scenario (admin)
///
/// DELETE /api/v1/scenarios/{id}
#[instrument(skip(pool, cache, admin))]
pub async fn delete_scenario(
    pool: web::Data<PgPool>,
    cache: Option<web::Data<RedisCache>>,
    path: web::Path<String>,
    admin: AdminUser,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();

    let repo = PgScenarioRepository::new(pool.get_ref().clone());
    let deleted = repo.delete(id.clone()).await?;

    if !deleted {
        return Err(AppError::ScenarioNotFound(id));
    }

    invalidate_catalog(&cache).await;

    info!(scenario_id = %id, admin = %admin.user_id, "Scenario deleted");

    Ok(HttpResponse::NoContent().finish())
}
