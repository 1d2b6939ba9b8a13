//! Belgrap Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Belgrap call platform. It includes:
//!
//! - Domain models (User, Call, Scenario, referral entities)
//! - Dutch phone number validation and formatting
//! - Common traits for repositories and services
//! - Unified error handling with HTTP response mapping
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod phone;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
