//! Billing handlers
//!
//! Checkout creation, the synchronous verify-payment path, and the raw-body
//! webhook endpoint. Both settlement paths share the idempotent funnel in
//! `PaymentService`; here we only translate HTTP in and out.

use crate::dto::billing::{
    CheckoutRequest, CheckoutResponse, PackageResponse, VerifyPaymentResponse,
};
use crate::dto::ApiResponse;
use actix_web::{web, HttpRequest, HttpResponse};
use belgrap_auth::AuthenticatedUser;
use belgrap_core::models::CreditPackage;
use belgrap_core::traits::Repository;
use belgrap_core::AppError;
use belgrap_db::PgUserRepository;
use belgrap_services::PaymentService;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

/// Configure billing routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/billing")
            .route("/packages", web::get().to(list_packages))
            .route(
                "/create-checkout-session",
                web::post().to(create_checkout_session),
            )
            .route("/verify-payment/{session_id}", web::get().to(verify_payment))
            .route("/webhook", web::post().to(webhook)),
    );
}

/// The fixed credit package catalog
///
/// GET /api/v1/billing/packages
#[instrument]
pub async fn list_packages() -> HttpResponse {
    let packages: Vec<PackageResponse> = CreditPackage::catalog().iter().map(Into::into).collect();
    HttpResponse::Ok().json(ApiResponse::success(packages))
}

/// Create a checkout session
///
/// POST /api/v1/billing/create-checkout-session
#[instrument(skip(pool, payments, user, req))]
pub async fn create_checkout_session(
    pool: web::Data<PgPool>,
    payments: web::Data<Arc<PaymentService>>,
    user: AuthenticatedUser,
    req: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Checkout validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let user_repo = PgUserRepository::new(pool.get_ref().clone());
    let db_user = user_repo
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user.user_id.to_string()))?;

    let created = payments.create_checkout(&db_user, &req.package_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(CheckoutResponse {
        session_id: created.session_id,
        url: created.url,
    })))
}

/// Synchronous payment verification
///
/// GET /api/v1/billing/verify-payment/{session_id}
///
/// Safe to call any number of times; only the first settles.
#[instrument(skip(payments, user))]
pub async fn verify_payment(
    payments: web::Data<Arc<PaymentService>>,
    path: web::Path<String>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let session_id = path.into_inner();

    let outcome = payments.verify_payment(&session_id).await?;

    info!(
        user_id = %user.user_id,
        session_id = %session_id,
        outcome = ?outcome,
        "Payment verification processed"
    );

    Ok(HttpResponse::Ok().json(ApiResponse::success(VerifyPaymentResponse::from(outcome))))
}

/// Signed payment webhook
///
/// POST /api/v1/billing/webhook
///
/// Takes the raw body: the signature covers the exact bytes as sent, so the
/// payload must not pass through JSON extraction first.
#[instrument(skip(payments, req, body))]
pub async fn webhook(
    payments: web::Data<Arc<PaymentService>>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get("X-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::WebhookSignature("missing signature header".to_string()))?;

    let outcome = payments.handle_webhook(&body, signature).await?;

    info!(outcome = ?outcome, "Webhook processed");

    Ok(HttpResponse::Ok().json(serde_json::json!({ "received": true })))
}
