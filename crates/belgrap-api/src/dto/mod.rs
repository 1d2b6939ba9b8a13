//! Data transfer objects for the HTTP API

pub mod auth;
pub mod billing;
pub mod call;
pub mod common;
pub mod scenario;
pub mod user;

pub use auth::{LoginRequest, LoginResponse, LogoutResponse, MeResponse, RegisterRequest};
pub use billing::{CheckoutRequest, CheckoutResponse, PackageResponse, VerifyPaymentResponse};
pub use call::{
    CallResponse, PublicCallResponse, ShareResponse, StartCallRequest, StartCallResponse,
};
pub use common::{ApiResponse, PaginationParams};
pub use scenario::{
    AdminScenarioResponse, ScenarioCreateRequest, ScenarioResponse, ScenarioUpdateRequest,
};
pub use user::{InviteView, MilestoneView, ReferralsResponse, StatsResponse};
