//! Domain models for Belgrap
//!
//! This module contains all the core domain models used throughout the application.

pub mod call;
pub mod payment;
pub mod referral;
pub mod scenario;
pub mod user;

pub use call::{
    Call, CallStatus, ProviderOutcome, RecordingInfo, RefundReason, SettlementOutcome,
};
pub use payment::{CreditPackage, PaymentSession, PaymentSource};
pub use referral::{
    mint_referral_code, ReferralInvite, ReferralMilestone, REFERRAL_MILESTONES,
    REFERRAL_REWARD_CREDITS,
};
pub use scenario::Scenario;
pub use user::{User, UserInfo, UserPlan, UserRole};
