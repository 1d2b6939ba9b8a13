//! Belgrap Database Layer
//!
//! This crate provides PostgreSQL database access and repository implementations
//! for the Belgrap platform. It includes:
//!
//! - Connection pool management with sqlx
//! - Repository implementations for users, calls, scenarios, and the
//!   referral/payment ledgers
//! - Atomic compare-and-swap updates for credit debits, settlement claims,
//!   and idempotent payment processing

pub mod pool;
pub mod repositories;

pub use pool::create_pool;
pub use repositories::*;

// Re-export commonly used types
pub use belgrap_core::{AppError, AppResult};
pub use sqlx::{PgPool, Postgres, Transaction};
