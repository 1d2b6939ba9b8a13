//! Call record model
//!
//! Represents one outbound call attempt and its outcome. The record owns the
//! refund/quality decision logic applied at settlement, plus the metadata for
//! the recording kept at the voice provider.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Minimum duration (seconds) below which a call is always refunded
pub const REFUND_MIN_DURATION_SECS: i64 = 7;

/// Duration (seconds) a call must reach to count as successful
pub const SUCCESS_MIN_DURATION_SECS: i64 = 10;

/// Upper duration bound (seconds) for the no-answer refund rule
pub const NO_ANSWER_MAX_DURATION_SECS: i64 = 30;

/// Conversation-flow score (0-100) below which a call is refunded
pub const POOR_QUALITY_SCORE_THRESHOLD: i32 = 20;

/// Transcript phrases indicating the call hit a voicemail box
pub const VOICEMAIL_PHRASES: &[&str] = &[
    "voicemail",
    "spreek een bericht in",
    "spreek uw bericht in",
    "na de piep",
    "na de toon",
    "niet bereikbaar",
    "leave a message",
    "after the beep",
    "after the tone",
    "not available right now",
];

/// Call status enumeration
///
/// Success path: queued -> ringing -> in-progress -> forwarding -> ended.
/// Failed, cancelled and timeout are side terminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum CallStatus {
    /// Accepted by the provider, not yet ringing
    #[default]
    Queued,
    /// Target phone is ringing
    Ringing,
    /// Conversation in progress
    InProgress,
    /// Provider is forwarding the call; counts as in-progress for the
    /// duration clock but is stored as its own value
    Forwarding,
    /// Call completed normally
    Ended,
    /// Call never produced provider data
    Failed,
    /// Cancelled before completion
    Cancelled,
    /// Forced terminal after the polling bound elapsed
    Timeout,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallStatus::Queued => write!(f, "queued"),
            CallStatus::Ringing => write!(f, "ringing"),
            CallStatus::InProgress => write!(f, "in-progress"),
            CallStatus::Forwarding => write!(f, "forwarding"),
            CallStatus::Ended => write!(f, "ended"),
            CallStatus::Failed => write!(f, "failed"),
            CallStatus::Cancelled => write!(f, "cancelled"),
            CallStatus::Timeout => write!(f, "timeout"),
        }
    }
}

impl CallStatus {
    /// Parse from the stored string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(CallStatus::Queued),
            "ringing" => Some(CallStatus::Ringing),
            "in-progress" => Some(CallStatus::InProgress),
            "forwarding" => Some(CallStatus::Forwarding),
            "ended" => Some(CallStatus::Ended),
            "failed" => Some(CallStatus::Failed),
            "cancelled" => Some(CallStatus::Cancelled),
            "timeout" => Some(CallStatus::Timeout),
            _ => None,
        }
    }

    /// Normalize an upstream provider status string
    ///
    /// The provider's `completed` maps to `ended` and `inProgress` to
    /// `in-progress`; the remaining known values pass through unchanged.
    /// Unknown strings yield `None` and leave the stored status untouched.
    pub fn from_provider(s: &str) -> Option<Self> {
        match s {
            "completed" => Some(CallStatus::Ended),
            "inProgress" => Some(CallStatus::InProgress),
            other => Self::from_str(other),
        }
    }

    /// Check whether no further transition occurs from this status
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Ended | CallStatus::Failed | CallStatus::Cancelled | CallStatus::Timeout
        )
    }

    /// Check whether the duration clock is running in this status
    pub fn is_conversing(&self) -> bool {
        matches!(self, CallStatus::InProgress | CallStatus::Forwarding)
    }
}

/// Reason a completed call was refunded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundReason {
    /// Call shorter than the minimum billable duration
    TooShort,
    /// Voicemail box answered instead of a human
    Voicemail,
    /// No human interaction on a short call
    NoAnswer,
    /// Provider reported the call as failed
    Failed,
    /// Conversation-flow score below threshold
    PoorQuality,
}

impl fmt::Display for RefundReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefundReason::TooShort => write!(f, "too_short"),
            RefundReason::Voicemail => write!(f, "voicemail"),
            RefundReason::NoAnswer => write!(f, "no_answer"),
            RefundReason::Failed => write!(f, "failed"),
            RefundReason::PoorQuality => write!(f, "poor_quality"),
        }
    }
}

impl RefundReason {
    /// Parse from the stored string representation
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "too_short" => Some(RefundReason::TooShort),
            "voicemail" => Some(RefundReason::Voicemail),
            "no_answer" => Some(RefundReason::NoAnswer),
            "failed" => Some(RefundReason::Failed),
            "poor_quality" => Some(RefundReason::PoorQuality),
            _ => None,
        }
    }
}

/// Snapshot of the provider-reported call outcome
///
/// Filled in incrementally by the polling loop; the quality fields drive the
/// refund rules at settlement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOutcome {
    /// Provider-reported duration in seconds
    pub duration_secs: Option<i64>,

    /// Provider-reported cost of the call
    pub cost: Option<Decimal>,

    /// Full conversation transcript
    pub transcript: Option<String>,

    /// URL of the recording at the provider's storage
    pub recording_url: Option<String>,

    /// Provider's end reason (e.g. `customer-ended-call`, `error`)
    pub ended_reason: Option<String>,

    /// Explicit voicemail flag from the provider
    pub voicemail: bool,

    /// Whether the provider detected human interaction
    pub human_interaction: Option<bool>,

    /// Provider's heuristic quality classification
    pub classification: Option<String>,

    /// Conversation-flow score on a 0-100 scale
    pub flow_score: Option<i32>,
}

/// Recording metadata owned by the call record
///
/// The audio bytes live at the provider; only the URL and sharing state are
/// kept here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingInfo {
    /// Whether a recording is available for playback
    pub available: bool,

    /// Recording URL at the provider
    pub url: Option<String>,

    /// Public share identifier, minted on first share
    pub share_id: Option<String>,

    /// Times the public link was opened
    pub share_count: i64,

    /// Times the audio was downloaded
    pub download_count: i64,

    /// Whether the recording is publicly playable
    pub is_public: bool,
}

/// Call record entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Call {
    /// Unique identifier
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Denormalized owner email
    pub user_email: String,

    /// External call identifier at the voice provider (unique)
    pub provider_call_id: String,

    /// Raw target number as entered
    pub target_number: String,

    /// Canonical formatted target number
    pub formatted_number: String,

    /// Optional target name substituted into the script
    pub target_name: Option<String>,

    /// Scenario used for this call
    pub scenario_id: String,
    pub scenario_name: String,
    pub scenario_icon: Option<String>,

    /// External agent identifier used for this call
    pub assistant_id: String,

    /// Current status
    pub status: CallStatus,

    /// Provider-reported start/end timestamps
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,

    /// Persisted duration in seconds, always >= 0
    pub duration_secs: i64,

    /// Provider outcome snapshot
    pub outcome: ProviderOutcome,

    /// Recording metadata
    pub recording: RecordingInfo,

    /// Credits charged for this call
    pub credits_used: i64,

    /// Credits refunded; always 0 or equal to `credits_used`
    pub credits_refunded: i64,

    /// Why the call was refunded, if it was
    pub refund_reason: Option<RefundReason>,

    /// When the refund was applied
    pub refunded_at: Option<DateTime<Utc>>,

    /// Settlement claim stamp; set at most once per call
    pub settled_at: Option<DateTime<Utc>>,

    /// Whether the call was successful per the quality heuristic
    pub was_successful: bool,

    /// Free calls are never refunded
    pub free_call: bool,

    /// Error message for calls that never produced provider data
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

/// Result of evaluating the settlement rules for a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementOutcome {
    /// Final duration in seconds (max of reported and derived)
    pub duration_secs: i64,

    /// Whether the single used credit is returned
    pub refund: bool,

    /// Winning refund reason, if any rule matched
    pub reason: Option<RefundReason>,

    /// Whether the call counts as successful
    pub successful: bool,
}

impl Call {
    /// Compute the call duration in seconds
    ///
    /// Prefers the provider-reported duration; falls back to the provider
    /// timestamps. The result is the maximum of the two so duration is never
    /// understated.
    pub fn computed_duration_secs(&self) -> i64 {
        let reported = self.outcome.duration_secs.unwrap_or(0).max(0);
        let derived = match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => (end - start).num_seconds().max(0),
            _ => 0,
        };
        reported.max(derived)
    }

    /// Check whether the call hit a voicemail box
    ///
    /// True when the provider flagged voicemail, classified the call as
    /// `voicemail`, or the transcript contains a known voicemail phrase
    /// (case-insensitive substring match).
    pub fn hit_voicemail(&self) -> bool {
        if self.outcome.voicemail {
            return true;
        }
        if self.outcome.classification.as_deref() == Some("voicemail") {
            return true;
        }
        if let Some(transcript) = &self.outcome.transcript {
            let lowered = transcript.to_lowercase();
            return VOICEMAIL_PHRASES
                .iter()
                .any(|phrase| lowered.contains(phrase));
        }
        false
    }

    /// Evaluate the refund rules and success heuristic for this call
    ///
    /// Rules run in a fixed order; a later matching rule overwrites the
    /// reason. The refund is always the full single credit, never partial.
    /// Pure: applies no state change.
    pub fn evaluate_settlement(&self) -> SettlementOutcome {
        let duration_secs = self.computed_duration_secs();
        let voicemail = self.hit_voicemail();

        let mut reason = None;

        if duration_secs < REFUND_MIN_DURATION_SECS {
            reason = Some(RefundReason::TooShort);
        }

        if voicemail {
            reason = Some(RefundReason::Voicemail);
        }

        if self.outcome.human_interaction == Some(false)
            && duration_secs < NO_ANSWER_MAX_DURATION_SECS
        {
            reason = Some(RefundReason::NoAnswer);
        }

        if self.outcome.classification.as_deref() == Some("failed")
            || self.outcome.ended_reason.as_deref() == Some("error")
            || self.status == CallStatus::Failed
        {
            reason = Some(RefundReason::Failed);
        }

        if let Some(score) = self.outcome.flow_score {
            if score < POOR_QUALITY_SCORE_THRESHOLD {
                reason = Some(RefundReason::PoorQuality);
            }
        }

        let successful = self.status == CallStatus::Ended
            && duration_secs >= SUCCESS_MIN_DURATION_SECS
            && !voicemail;

        SettlementOutcome {
            duration_secs,
            refund: reason.is_some(),
            reason,
            successful,
        }
    }

    /// Check whether a refund may still be applied
    ///
    /// Refunds execute only once and never for free calls.
    pub fn refundable(&self) -> bool {
        self.credits_refunded == 0 && !self.free_call
    }
}

impl Default for Call {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            user_email: String::new(),
            provider_call_id: String::new(),
            target_number: String::new(),
            formatted_number: String::new(),
            target_name: None,
            scenario_id: String::new(),
            scenario_name: String::new(),
            scenario_icon: None,
            assistant_id: String::new(),
            status: CallStatus::Queued,
            started_at: None,
            ended_at: None,
            duration_secs: 0,
            outcome: ProviderOutcome::default(),
            recording: RecordingInfo::default(),
            credits_used: 1,
            credits_refunded: 0,
            refund_reason: None,
            refunded_at: None,
            settled_at: None,
            was_successful: false,
            free_call: false,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ended_call(duration_secs: i64) -> Call {
        Call {
            status: CallStatus::Ended,
            outcome: ProviderOutcome {
                duration_secs: Some(duration_secs),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_status_normalization() {
        assert_eq!(CallStatus::from_provider("completed"), Some(CallStatus::Ended));
        assert_eq!(
            CallStatus::from_provider("inProgress"),
            Some(CallStatus::InProgress)
        );
        assert_eq!(CallStatus::from_provider("queued"), Some(CallStatus::Queued));
        assert_eq!(
            CallStatus::from_provider("forwarding"),
            Some(CallStatus::Forwarding)
        );
        assert_eq!(CallStatus::from_provider("something-new"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(CallStatus::Ended.is_terminal());
        assert!(CallStatus::Failed.is_terminal());
        assert!(CallStatus::Cancelled.is_terminal());
        assert!(CallStatus::Timeout.is_terminal());
        assert!(!CallStatus::Queued.is_terminal());
        assert!(!CallStatus::Forwarding.is_terminal());
    }

    #[test]
    fn test_forwarding_counts_as_conversing() {
        assert!(CallStatus::Forwarding.is_conversing());
        assert!(CallStatus::InProgress.is_conversing());
        assert!(!CallStatus::Ringing.is_conversing());
    }

    #[test]
    fn test_duration_never_understated() {
        let start = Utc::now();
        let call = Call {
            started_at: Some(start),
            ended_at: Some(start + Duration::seconds(50)),
            outcome: ProviderOutcome {
                duration_secs: Some(42),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(call.computed_duration_secs(), 50);

        let call = Call {
            started_at: Some(start),
            ended_at: Some(start + Duration::seconds(30)),
            outcome: ProviderOutcome {
                duration_secs: Some(42),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(call.computed_duration_secs(), 42);
    }

    #[test]
    fn test_short_call_always_refunds_too_short() {
        let call = ended_call(5);
        let outcome = call.evaluate_settlement();
        assert!(outcome.refund);
        assert_eq!(outcome.reason, Some(RefundReason::TooShort));
        assert!(!outcome.successful);
    }

    #[test]
    fn test_good_call_no_refund() {
        let mut call = ended_call(45);
        call.outcome.human_interaction = Some(true);
        let outcome = call.evaluate_settlement();
        assert!(!outcome.refund);
        assert_eq!(outcome.reason, None);
        assert!(outcome.successful);
        assert_eq!(outcome.duration_secs, 45);
    }

    #[test]
    fn test_voicemail_transcript_overrides_duration() {
        let mut call = ended_call(20);
        call.outcome.transcript =
            Some("Dit is de Voicemail van Jan, spreek een bericht in.".to_string());
        let outcome = call.evaluate_settlement();
        assert!(outcome.refund);
        assert_eq!(outcome.reason, Some(RefundReason::Voicemail));
        assert!(!outcome.successful);
    }

    #[test]
    fn test_voicemail_classification_flag() {
        let mut call = ended_call(25);
        call.outcome.classification = Some("voicemail".to_string());
        let outcome = call.evaluate_settlement();
        assert_eq!(outcome.reason, Some(RefundReason::Voicemail));
    }

    #[test]
    fn test_no_answer_requires_short_duration() {
        let mut call = ended_call(20);
        call.outcome.human_interaction = Some(false);
        let outcome = call.evaluate_settlement();
        assert_eq!(outcome.reason, Some(RefundReason::NoAnswer));

        let mut call = ended_call(40);
        call.outcome.human_interaction = Some(false);
        let outcome = call.evaluate_settlement();
        assert_eq!(outcome.reason, None);
    }

    #[test]
    fn test_failed_rule_overrides_earlier_reasons() {
        let mut call = ended_call(3);
        call.outcome.ended_reason = Some("error".to_string());
        let outcome = call.evaluate_settlement();
        assert!(outcome.refund);
        assert_eq!(outcome.reason, Some(RefundReason::Failed));
    }

    #[test]
    fn test_poor_quality_score() {
        let mut call = ended_call(60);
        call.outcome.flow_score = Some(12);
        let outcome = call.evaluate_settlement();
        assert!(outcome.refund);
        assert_eq!(outcome.reason, Some(RefundReason::PoorQuality));

        call.outcome.flow_score = Some(20);
        let outcome = call.evaluate_settlement();
        assert!(!outcome.refund);
    }

    #[test]
    fn test_success_flag_thresholds() {
        // 10 seconds is the success floor, distinct from the 7 second refund floor.
        let call = ended_call(9);
        assert!(!call.evaluate_settlement().successful);
        assert!(!call.evaluate_settlement().refund); // 9s: no refund, not successful

        let call = ended_call(10);
        assert!(call.evaluate_settlement().successful);
    }

    #[test]
    fn test_refundable_guards() {
        let call = Call::default();
        assert!(call.refundable());

        let refunded = Call {
            credits_refunded: 1,
            ..Default::default()
        };
        assert!(!refunded.refundable());

        let free = Call {
            free_call: true,
            ..Default::default()
        };
        assert!(!free.refundable());
    }
}
