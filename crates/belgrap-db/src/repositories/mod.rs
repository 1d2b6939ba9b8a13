//! Repository implementations

pub mod call_repo;
pub mod payment_repo;
pub mod referral_repo;
pub mod scenario_repo;
pub mod user_repo;

pub use call_repo::PgCallRepository;
pub use payment_repo::PgPaymentLedger;
pub use referral_repo::PgReferralRepository;
pub use scenario_repo::PgScenarioRepository;
pub use user_repo::PgUserRepository;
