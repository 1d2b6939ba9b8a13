//! HTTP request handlers

pub mod auth;
pub mod billing;
pub mod call;
pub mod scenario;
pub mod user;

pub use auth::configure as configure_auth;
pub use billing::configure as configure_billing;
pub use call::configure as configure_calls;
pub use scenario::configure as configure_scenarios;
pub use user::configure as configure_users;
