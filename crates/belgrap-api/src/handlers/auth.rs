//! Authentication handlers
//!
//! HTTP handlers for registration, login, and session endpoints.

use crate::dto::auth::{
    LoginRequest, LoginResponse, LogoutResponse, MeResponse, RegisterRequest,
};
use crate::dto::ApiResponse;
use actix_web::{cookie::Cookie, web, HttpResponse};
use belgrap_auth::{AuthenticatedUser, JwtService, PasswordService};
use belgrap_core::models::{mint_referral_code, User, UserInfo};
use belgrap_core::traits::{Repository, UserRepository};
use belgrap_core::AppError;
use belgrap_db::PgUserRepository;
use belgrap_services::constants::{REFERRED_SIGNUP_CREDITS, SIGNUP_CREDITS};
use belgrap_services::ReferralService;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

/// Configure authentication routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout))
            .route("/me", web::get().to(me)),
    );
}

fn token_cookie(token: &str, max_age_secs: i64) -> Cookie<'static> {
    Cookie::build("token", token.to_string())
        .path("/")
        .http_only(true)
        .max_age(actix_web::cookie::time::Duration::seconds(max_age_secs))
        .finish()
}

/// Register a new user
///
/// POST /api/v1/auth/register
///
/// Seeds one credit, or two when a valid referral code was supplied; the
/// referrer's invite record is created unrewarded and pays out on the new
/// user's first purchase.
#[instrument(skip(pool, jwt_service, password_service, referrals, req))]
pub async fn register(
    pool: web::Data<PgPool>,
    jwt_service: web::Data<Arc<JwtService>>,
    password_service: web::Data<Arc<PasswordService>>,
    referrals: web::Data<Arc<ReferralService>>,
    req: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Registration validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let email = req.email.trim().to_lowercase();
    debug!(email = %email, "Processing registration");

    let user_repo = PgUserRepository::new(pool.get_ref().clone());

    if user_repo.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "Registration failed: email already in use");
        return Err(AppError::AlreadyExists(format!(
            "User {} already exists",
            email
        )));
    }

    // A valid referral code doubles the signup credit.
    let referrer = match req.referral_code.as_deref() {
        Some(code) if !code.is_empty() => referrals.resolve_code(code, &email).await?,
        _ => None,
    };

    let credits = if referrer.is_some() {
        REFERRED_SIGNUP_CREDITS
    } else {
        SIGNUP_CREDITS
    };

    let password_hash = password_service.hash_password(&req.password)?;

    let user = User {
        email: email.clone(),
        password_hash,
        credits,
        referral_code: Some(mint_referral_code()),
        referred_by: referrer.as_ref().map(|r| r.id),
        ..Default::default()
    };

    let created = user_repo.create(&user).await?;

    if let Some(referrer) = referrer {
        if let Err(e) = referrals
            .register_invite(referrer.id, created.id, &created.email)
            .await
        {
            // The account exists either way; the invite can be backfilled.
            error!("Failed to register referral invite: {}", e);
        }
    }

    info!(user_id = %created.id, credits, "User registered");

    let token = jwt_service.create_token_for_user(&created)?;
    let expires_in = jwt_service.expiration_secs();
    let response = LoginResponse::new(token.clone(), expires_in, UserInfo::from(&created));

    Ok(HttpResponse::Created()
        .cookie(token_cookie(&token, expires_in))
        .json(ApiResponse::success(response)))
}

/// Login endpoint
///
/// POST /api/v1/auth/login
#[instrument(skip(pool, jwt_service, password_service, req))]
pub async fn login(
    pool: web::Data<PgPool>,
    jwt_service: web::Data<Arc<JwtService>>,
    password_service: web::Data<Arc<PasswordService>>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    req.validate().map_err(|e| {
        warn!("Login validation failed: {}", e);
        AppError::Validation(e.to_string())
    })?;

    let email = req.email.trim();
    debug!(email = %email, "Processing login request");

    let user_repo = PgUserRepository::new(pool.get_ref().clone());
    let user = user_repo.find_by_email(email).await?.ok_or_else(|| {
        info!(email = %email, "Login failed: user not found");
        AppError::InvalidCredentials
    })?;

    let password_valid = password_service
        .verify_password(&req.password, &user.password_hash)
        .map_err(|e| {
            error!("Password verification error: {}", e);
            AppError::Internal("Password verification failed".to_string())
        })?;

    if !password_valid {
        info!(email = %email, "Login failed: invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = jwt_service.create_token_for_user(&user)?;
    let expires_in = jwt_service.expiration_secs();

    info!(user_id = %user.id, "Login successful");

    let response = LoginResponse::new(token.clone(), expires_in, UserInfo::from(&user));

    Ok(HttpResponse::Ok()
        .cookie(token_cookie(&token, expires_in))
        .json(ApiResponse::success(response)))
}

/// Logout endpoint
///
/// POST /api/v1/auth/logout
#[instrument(skip(user))]
pub async fn logout(user: AuthenticatedUser) -> HttpResponse {
    info!(user_id = %user.user_id, "User logged out");

    // Clear the token cookie
    let cookie = Cookie::build("token", "")
        .path("/")
        .http_only(true)
        .max_age(actix_web::cookie::time::Duration::seconds(0))
        .finish();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(ApiResponse::success(LogoutResponse::default()))
}

/// Get current user info
///
/// GET /api/v1/auth/me
#[instrument(skip(pool, user))]
pub async fn me(
    pool: web::Data<PgPool>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    debug!(user_id = %user.user_id, "Getting current user info");

    let user_repo = PgUserRepository::new(pool.get_ref().clone());
    let db_user = user_repo
        .find_by_id(user.user_id)
        .await?
        .ok_or_else(|| AppError::UserNotFound(user.user_id.to_string()))?;

    let token_expires_at = Utc::now() + Duration::seconds(user.claims.exp - Utc::now().timestamp());

    let response = MeResponse {
        user: UserInfo::from(&db_user),
        token_expires_at,
    };

    Ok(HttpResponse::Ok().json(ApiResponse::success(response)))
}
