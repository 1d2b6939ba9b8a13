//! Business logic services for Belgrap
//!
//! This crate contains the services that orchestrate the call lifecycle and
//! credit accounting:
//!
//! - `CallOrchestrator` - drives a call from creation through completion:
//!   validates preconditions, creates the external call, charges the credit,
//!   and runs the status-polling loop until a terminal status
//! - `SettlementService` - claims settlement exactly once per call, applies
//!   the refund rules and updates user/scenario statistics
//! - `PaymentService` - checkout creation plus the idempotent settlement
//!   funnel shared by the verify endpoint and the webhook
//! - `ReferralService` - invite registration, first-purchase rewards, and
//!   milestone bonuses
//!
//! Services are wrapped in Arc for sharing across async tasks; all operations
//! are instrumented with tracing and return `AppResult`.

pub mod orchestrator;
pub mod payments;
pub mod referrals;
pub mod settlement;

pub use orchestrator::{CallOrchestrator, PollVerdict, StartCallOutcome};
pub use payments::{CheckoutCreated, PaymentService, SettleOutcome};
pub use referrals::ReferralService;
pub use settlement::SettlementService;

/// Business logic constants
pub mod constants {
    /// Credits seeded at registration
    pub const SIGNUP_CREDITS: i64 = 1;

    /// Credits seeded at registration with a valid referral code
    pub const REFERRED_SIGNUP_CREDITS: i64 = 2;
}
