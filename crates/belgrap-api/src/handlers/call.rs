//! Call handlers
//!
//! HTTP handlers for the call lifecycle and recording playback endpoints.

use crate::dto::call::{
    CallResponse, PublicCallResponse, ShareResponse, StartCallRequest, StartCallResponse,
};
use crate::dto::{ApiResponse, PaginationParams};
use actix_web::{web, HttpResponse};
use belgrap_auth::AuthenticatedUser;
use belgrap_core::models::Call;
use belgrap_core::traits::{CallRepository, Repository, UserRepository};
use belgrap_core::AppError;
use belgrap_db::{PgCallRepository, PgScenarioRepository, PgUserRepository};
use belgrap_gateway::VoiceGatewayClient;
use belgrap_services::CallOrchestrator;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Configure call routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/calls")
            .route("", web::post().to(start_call))
            .route("", web::get().to(list_calls))
            // Public playback first so `public` is not parsed as a call id
            .route("/public/{share_id}", web::get().to(get_public_call))
            .route("/public/{share_id}/stream", web::get().to(stream_public))
            .route("/{id}", web::get().to(get_call))
            .route("/{id}/end", web::post().to(end_call))
            .route("/{id}/recording", web::get().to(stream_recording))
            .route("/{id}/share", web::post().to(share_call)),
    );
}

/// Load a call and verify ownership
async fn owned_call(
    pool: &PgPool,
    call_id: Uuid,
    user: &AuthenticatedUser,
) -> Result<Call, AppError> {
    let repo = PgCallRepository::new(pool.clone());
    let call = repo
        .find_by_id(call_id)
        .await?
        .ok_or_else(|| AppError::CallNotFound(call_id.to_string()))?;

    // Hide other users' calls rather than revealing their existence.
    if call.user_id != user.user_id && !user.is_admin() {
        return Err(AppError::CallNotFound(call_id.to_string()));
    }

    Ok(call)
}

/// Proxy an upstream audio response to the client
fn audio_proxy_response(upstream: reqwest::Response) -> HttpResponse {
    let content_type = upstream
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("audio/mpeg")
        .to_string();

    HttpResponse::Ok()
        .content_type(content_type)
        .streaming(upstream.bytes_stream())
}

/// Start a call
///
/// POST /api/v1/calls
#[instrument(skip(pool, orchestrator, user, req))]
pub async fn start_call(
    pool: web::Data<PgPool>,
    orchestrator: web::Data<Arc<CallOrchestrator>>,
    user: AuthenticatedUser,
    req: web::Json<StartCallRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Start-call validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let user_repo = PgUserRepository::new(pool.get_ref().clone());
    let db_user = user_repo
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user.user_id.to_string()))?;

    let scenario_repo = PgScenarioRepository::new(pool.get_ref().clone());
    let scenario = scenario_repo
        .find_by_id(req.scenario_id.clone())
        .await?
        .ok_or_else(|| AppError::ScenarioNotFound(req.scenario_id.clone()))?;

    let outcome = orchestrator
        .get_ref()
        .clone()
        .start_call(
            &db_user,
            &scenario,
            &req.phone_number,
            req.target_name.clone(),
        )
        .await?;

    info!(
        call_id = %outcome.call.id,
        user_id = %db_user.id,
        scenario_id = %scenario.id,
        "Call started"
    );

    let response = StartCallResponse {
        call: CallResponse::from(outcome.call),
        credits_remaining: outcome.credits_remaining,
    };

    Ok(HttpResponse::Created().json(ApiResponse::success(response)))
}

/// List the caller's calls
///
/// GET /api/v1/calls
#[instrument(skip(pool, user))]
pub async fn list_calls(
    pool: web::Data<PgPool>,
    query: web::Query<PaginationParams>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    query.validate().map_err(|e| {
        warn!("Pagination validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let repo = PgCallRepository::new(pool.get_ref().clone());
    let (calls, total) = repo
        .list_by_user(user.user_id, query.limit(), query.offset())
        .await?;

    let data: Vec<CallResponse> = calls.into_iter().map(Into::into).collect();

    Ok(HttpResponse::Ok().json(query.paginate(data, total)))
}

/// Fetch a call, refreshing its live status as a side effect
///
/// GET /api/v1/calls/{id}
#[instrument(skip(pool, orchestrator, user))]
pub async fn get_call(
    pool: web::Data<PgPool>,
    orchestrator: web::Data<Arc<CallOrchestrator>>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let call_id = path.into_inner();
    owned_call(pool.get_ref(), call_id, &user).await?;

    // Live refresh: one poll without rescheduling. A failed refresh falls
    // back to the stored state inside the orchestrator.
    let call = orchestrator.refresh(call_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(CallResponse::from(call))))
}

/// Explicitly end a call
///
/// POST /api/v1/calls/{id}/end
#[instrument(skip(pool, orchestrator, user))]
pub async fn end_call(
    pool: web::Data<PgPool>,
    orchestrator: web::Data<Arc<CallOrchestrator>>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let call_id = path.into_inner();
    owned_call(pool.get_ref(), call_id, &user).await?;

    let call = orchestrator.end_call(call_id).await?;

    info!(call_id = %call_id, "Call ended by user");

    Ok(HttpResponse::Ok().json(ApiResponse::success(CallResponse::from(call))))
}

/// Authenticated recording stream
///
/// GET /api/v1/calls/{id}/recording
#[instrument(skip(pool, voice, user))]
pub async fn stream_recording(
    pool: web::Data<PgPool>,
    voice: web::Data<Arc<VoiceGatewayClient>>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let call_id = path.into_inner();
    let call = owned_call(pool.get_ref(), call_id, &user).await?;

    let url = call
        .recording
        .url
        .filter(|_| call.recording.available)
        .ok_or_else(|| AppError::RecordingUnavailable(call_id.to_string()))?;

    let upstream = voice.stream_recording(&url).await?;

    let repo = PgCallRepository::new(pool.get_ref().clone());
    repo.bump_download_count(call_id).await?;

    debug!(call_id = %call_id, "Streaming recording to owner");

    Ok(audio_proxy_response(upstream))
}

/// Mint a public share id for a call
///
/// POST /api/v1/calls/{id}/share
#[instrument(skip(pool, user))]
pub async fn share_call(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let call_id = path.into_inner();
    let call = owned_call(pool.get_ref(), call_id, &user).await?;

    if !call.status.is_terminal() {
        return Err(AppError::Conflict(
            "Call is still in progress".to_string(),
        ));
    }

    let repo = PgCallRepository::new(pool.get_ref().clone());
    let share_id = repo.mint_share_id(call_id).await?;

    info!(call_id = %call_id, share_id = %share_id, "Share id minted");

    Ok(HttpResponse::Ok().json(ApiResponse::success(ShareResponse { share_id })))
}

/// Public view of a shared call
///
/// GET /api/v1/calls/public/{share_id}
#[instrument(skip(pool))]
pub async fn get_public_call(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let share_id = path.into_inner();

    let repo = PgCallRepository::new(pool.get_ref().clone());
    let call = repo
        .find_by_share_id(&share_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shared call {}", share_id)))?;

    repo.bump_share_count(&share_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(PublicCallResponse::from(call))))
}

/// Unauthenticated public playback
///
/// GET /api/v1/calls/public/{share_id}/stream
#[instrument(skip(pool, voice))]
pub async fn stream_public(
    pool: web::Data<PgPool>,
    voice: web::Data<Arc<VoiceGatewayClient>>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let share_id = path.into_inner();

    let repo = PgCallRepository::new(pool.get_ref().clone());
    let call = repo
        .find_by_share_id(&share_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Shared call {}", share_id)))?;

    let url = call
        .recording
        .url
        .filter(|_| call.recording.available)
        .ok_or_else(|| AppError::RecordingUnavailable(share_id.clone()))?;

    let upstream = voice.stream_recording(&url).await?;

    repo.bump_download_count(call.id).await?;

    debug!(share_id = %share_id, "Streaming shared recording");

    Ok(audio_proxy_response(upstream))
}
