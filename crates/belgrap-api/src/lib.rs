//! API layer for Belgrap
//!
//! HTTP handlers and DTOs for the call, scenario, billing, and user surfaces.

#![forbid(unsafe_code)]

pub mod dto;
pub mod handlers;

// Re-export DTOs (common types)
pub use dto::{ApiResponse, PaginationParams};

// Re-export handler configuration functions
pub use handlers::{
    configure_auth, configure_billing, configure_calls, configure_scenarios, configure_users,
};
