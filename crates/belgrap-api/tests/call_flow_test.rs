//! Integration tests for the call and billing API types
//!
//! These tests exercise the DTO conversions and the settlement rules the
//! handlers rely on. For full end-to-end testing, set DATABASE_URL and run
//! the ignored tests in belgrap-db.

#[cfg(test)]
mod tests {
    use belgrap_api::dto::{CallResponse, PaginationParams, VerifyPaymentResponse};
    use belgrap_core::models::{Call, CallStatus, ProviderOutcome, RefundReason};
    use belgrap_core::phone;
    use belgrap_services::SettleOutcome;

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
    fn test_short_call_settles_as_too_short() {
        // duration=5s, status=ended, no voicemail flags
        let call = ended_call(5);
        let outcome = call.evaluate_settlement();

        assert_eq!(outcome.reason, Some(RefundReason::TooShort));
        assert!(outcome.refund);
        assert!(!outcome.successful);
    }

    #[test]
    fn test_good_call_settles_successful() {
        // duration=45s, humanInteraction=true, no quality flags
        let mut call = ended_call(45);
        call.outcome.human_interaction = Some(true);
        let outcome = call.evaluate_settlement();

        assert!(outcome.successful);
        assert!(!outcome.refund);
        assert_eq!(outcome.duration_secs, 45);
    }

    #[test]
    fn test_voicemail_transcript_refunds_mid_duration_call() {
        // transcript contains "voicemail", duration=20s
        let mut call = ended_call(20);
        call.outcome.transcript = Some("Hoi, dit is de VOICEMAIL van Piet".to_string());
        let outcome = call.evaluate_settlement();

        assert_eq!(outcome.reason, Some(RefundReason::Voicemail));
        assert!(outcome.refund);
    }

    #[test]
    fn test_settlement_refund_is_binary() {
        for duration in [0, 3, 6, 7, 15, 45, 600] {
            let call = ended_call(duration);
            let outcome = call.evaluate_settlement();
            // refund is all-or-nothing, encoded as the reason being present
            assert_eq!(outcome.refund, outcome.reason.is_some());
        }
    }

    #[test]
    fn test_phone_validation_property() {
        let check = phone::check_dutch_number("0612345678");
        assert!(check.is_valid);
        assert!(check.is_mobile);
        assert_eq!(check.formatted, "+31612345678");

        // formatting is idempotent
        assert_eq!(
            phone::format_dutch_number(&check.formatted),
            check.formatted
        );
    }

    #[test]
    fn test_call_response_reflects_refund() {
        let mut call = ended_call(5);
        call.credits_refunded = 1;
        call.refund_reason = Some(RefundReason::TooShort);

        let response = CallResponse::from(call);
        assert_eq!(response.credits_refunded, 1);
        assert_eq!(response.refund_reason.as_deref(), Some("too_short"));
    }

    #[test]
    fn test_verify_payment_second_call_is_noop() {
        // The second verify for the same session maps to already_processed
        // with zero credits granted.
        let first = VerifyPaymentResponse::from(SettleOutcome::Credited {
            credits: 15,
            balance: 16,
        });
        let second = VerifyPaymentResponse::from(SettleOutcome::AlreadyProcessed);

        assert!(first.credited);
        assert_eq!(first.credits, 15);
        assert!(!second.credited);
        assert_eq!(second.credits, 0);
        assert!(second.already_processed);
    }

    #[test]
    fn test_pagination_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page, 1);
        assert_eq!(params.offset(), 0);
    }
}
