//! External gateway clients for Belgrap
//!
//! Thin HTTP wrappers around the two external collaborators:
//!
//! - the voice-AI provider (outbound calls, status, recordings)
//! - the payment processor (hosted checkout, session verification, signed
//!   webhooks)
//!
//! No business logic lives in this crate; errors propagate as
//! `AppError::VoiceGateway` / `AppError::PaymentGateway` and the caller
//! decides whether to fail or retry.

pub mod payment;
pub mod voice;
pub mod webhook;

pub use payment::{
    CheckoutParams, CheckoutSession, PaymentGatewayClient, SessionMetadata, SessionStatus,
};
pub use voice::{
    AssistantOverrides, CallCustomer, CreateCallRequest, ProviderAssistant, ProviderCall,
    VoiceGatewayClient,
};
pub use webhook::{parse_event, verify_signature, WebhookEvent, CHECKOUT_COMPLETED};
