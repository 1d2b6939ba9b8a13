//! Belgrap Backend Server
//!
//! Backend for the Belgrap call platform: scenario catalog, outbound AI
//! calls with credit accounting, recordings and sharing, checkout and
//! referral rewards.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use belgrap_api::{
    configure_auth, configure_billing, configure_calls, configure_scenarios, configure_users,
};
use belgrap_auth::{JwtService, PasswordService};
use belgrap_cache::RedisCache;
use belgrap_core::AppConfig;
use belgrap_db::create_pool;
use belgrap_gateway::{PaymentGatewayClient, VoiceGatewayClient};
use belgrap_services::{CallOrchestrator, PaymentService, ReferralService, SettlementService};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Health check endpoint
async fn health_check(orchestrator: web::Data<Arc<CallOrchestrator>>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "belgrap-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "active_calls": orchestrator.active_monitors().await,
    }))
}

/// Configure API routes
fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            // Health check
            .route("/health", web::get().to(health_check))
            // Auth endpoints
            .configure(configure_auth)
            // Call lifecycle endpoints
            .configure(configure_calls)
            // Scenario catalog endpoints
            .configure(configure_scenarios)
            // Billing endpoints
            .configure(configure_billing)
            // User stats and referral endpoints
            .configure(configure_users),
    );
}

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "belgrap_backend={},belgrap_api={},belgrap_services={},belgrap_db={},actix_web=info,sqlx=warn",
            log_level, log_level, log_level, log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    init_tracing();

    info!(
        "Starting Belgrap Backend v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = AppConfig::load().expect("Failed to load configuration");

    info!("Connecting to database...");
    let pool = create_pool(&config.database.url, Some(config.database.max_connections))
        .await
        .expect("Failed to create database pool");

    // Redis is an accelerator, not a dependency: run without it if down.
    let cache = match RedisCache::new(&config.redis.url).await {
        Ok(cache) => {
            info!("Redis cache connected");
            Some(cache)
        }
        Err(e) => {
            warn!("Redis unavailable, continuing without cache: {}", e);
            None
        }
    };

    // Auth services
    let jwt_service = Arc::new(JwtService::new(
        &config.auth.jwt_secret,
        config.auth.jwt_expiration_secs,
    ));
    let password_service = Arc::new(PasswordService::new());

    // External gateways
    let voice = Arc::new(
        VoiceGatewayClient::new(&config.voice).expect("Failed to build voice gateway client"),
    );
    let payment_gateway = Arc::new(
        PaymentGatewayClient::new(&config.payment)
            .expect("Failed to build payment gateway client"),
    );

    // Business services
    let settlement = Arc::new(SettlementService::new(pool.clone()));
    let referrals = Arc::new(ReferralService::new(pool.clone()));
    let payments = Arc::new(PaymentService::new(
        pool.clone(),
        payment_gateway,
        Arc::clone(&referrals),
        config.payment.webhook_secret.clone(),
        config.payment.webhook_tolerance_secs,
    ));
    let orchestrator = Arc::new(CallOrchestrator::new(
        pool.clone(),
        Arc::clone(&voice),
        settlement,
        cache.clone(),
        config.calls.clone(),
    ));

    let bind_addr = config.server_addr();
    let workers = config.server.workers;
    let cors_origins = config.server.cors_origins.clone();

    info!(
        "Starting HTTP server on {} with {} workers",
        bind_addr, workers
    );

    HttpServer::new(move || {
        // Configure CORS - clone cors_origins for each worker
        let cors_origins_inner = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                let origins: Vec<&str> = cors_origins_inner.split(',').collect();
                if let Ok(origin_str) = origin.to_str() {
                    origins.iter().any(|o| o.trim() == origin_str)
                } else {
                    false
                }
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::COOKIE,
            ])
            .supports_credentials()
            .max_age(3600);

        let mut app = App::new()
            // Shared state
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::Data::new(password_service.clone()))
            .app_data(web::Data::new(voice.clone()))
            .app_data(web::Data::new(payments.clone()))
            .app_data(web::Data::new(referrals.clone()))
            .app_data(web::Data::new(orchestrator.clone()))
            // Keep request bodies small; audio is proxied, never uploaded
            .app_data(web::PayloadConfig::new(256 * 1024));

        if let Some(cache) = cache.clone() {
            app = app.app_data(web::Data::new(cache));
        }

        app
            // Middleware
            .wrap(cors)
            .wrap(middleware::Logger::new("%a \"%r\" %s %b %Dms"))
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            // Configure routes
            .configure(configure_routes)
            // Root redirect to health
            .route(
                "/",
                web::get().to(|| async {
                    HttpResponse::Found()
                        .append_header(("Location", "/api/v1/health"))
                        .finish()
                }),
            )
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
