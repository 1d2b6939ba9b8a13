//! Call DTOs
//!
//! Request and response types for the call endpoints.

use belgrap_core::models::Call;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request to start a call
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StartCallRequest {
    /// Scenario to run
    #[validate(length(min = 1, max = 100, message = "Scenario id is required"))]
    pub scenario_id: String,

    /// Target phone number (free-form; validated and formatted server-side)
    #[validate(length(min = 6, max = 20, message = "Phone number is required"))]
    pub phone_number: String,

    /// Optional target name substituted into the script
    #[validate(length(max = 100, message = "Target name too long"))]
    pub target_name: Option<String>,
}

/// Call record view
#[derive(Debug, Clone, Serialize)]
pub struct CallResponse {
    pub id: Uuid,
    pub scenario_id: String,
    pub scenario_name: String,
    pub scenario_icon: Option<String>,
    pub target_number: String,
    pub target_name: Option<String>,
    pub status: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: i64,
    pub was_successful: bool,
    pub credits_used: i64,
    pub credits_refunded: i64,
    pub refund_reason: Option<String>,
    pub recording_available: bool,
    pub share_id: Option<String>,
    pub share_count: i64,
    pub download_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Call> for CallResponse {
    fn from(call: Call) -> Self {
        Self {
            id: call.id,
            scenario_id: call.scenario_id,
            scenario_name: call.scenario_name,
            scenario_icon: call.scenario_icon,
            target_number: call.formatted_number,
            target_name: call.target_name,
            status: call.status.to_string(),
            started_at: call.started_at,
            ended_at: call.ended_at,
            duration_secs: call.duration_secs,
            was_successful: call.was_successful,
            credits_used: call.credits_used,
            credits_refunded: call.credits_refunded,
            refund_reason: call.refund_reason.map(|r| r.to_string()),
            recording_available: call.recording.available,
            share_id: call.recording.share_id,
            share_count: call.recording.share_count,
            download_count: call.recording.download_count,
            created_at: call.created_at,
        }
    }
}

/// Response to a started call
#[derive(Debug, Clone, Serialize)]
pub struct StartCallResponse {
    pub call: CallResponse,
    pub credits_remaining: i64,
}

/// Response to minting a share id
#[derive(Debug, Clone, Serialize)]
pub struct ShareResponse {
    pub share_id: String,
}

/// Public view of a shared call
///
/// Exposes only what an anonymous visitor needs for playback; the target
/// number and owner never leave the system.
#[derive(Debug, Clone, Serialize)]
pub struct PublicCallResponse {
    pub share_id: String,
    pub scenario_name: String,
    pub scenario_icon: Option<String>,
    pub duration_secs: i64,
    pub recording_available: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Call> for PublicCallResponse {
    fn from(call: Call) -> Self {
        Self {
            share_id: call.recording.share_id.unwrap_or_default(),
            scenario_name: call.scenario_name,
            scenario_icon: call.scenario_icon,
            duration_secs: call.duration_secs,
            recording_available: call.recording.available,
            created_at: call.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use belgrap_core::models::{CallStatus, RefundReason};

    #[test]
    fn test_call_response_conversion() {
        let mut call = Call::default();
        call.scenario_name = "Pizza bezorging".to_string();
        call.formatted_number = "+31612345678".to_string();
        call.status = CallStatus::Ended;
        call.duration_secs = 45;
        call.was_successful = true;

        let response = CallResponse::from(call);
        assert_eq!(response.status, "ended");
        assert_eq!(response.duration_secs, 45);
        assert!(response.was_successful);
        assert_eq!(response.target_number, "+31612345678");
    }

    #[test]
    fn test_refund_reason_serialized_as_string() {
        let mut call = Call::default();
        call.refund_reason = Some(RefundReason::TooShort);

        let response = CallResponse::from(call);
        assert_eq!(response.refund_reason.as_deref(), Some("too_short"));
    }

    #[test]
    fn test_public_view_hides_target() {
        let mut call = Call::default();
        call.formatted_number = "+31612345678".to_string();
        call.user_email = "jan@example.nl".to_string();
        call.recording.share_id = Some("abc123".to_string());

        let response = PublicCallResponse::from(call);
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("+31612345678"));
        assert!(!json.contains("jan@example.nl"));
        assert!(json.contains("abc123"));
    }
}
