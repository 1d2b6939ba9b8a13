//! Billing DTOs

use belgrap_core::models::CreditPackage;
use belgrap_services::SettleOutcome;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to create a checkout session
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CheckoutRequest {
    /// Credit package to purchase
    #[validate(length(min = 1, max = 50, message = "Package id is required"))]
    pub package_id: String,
}

/// Response to a created checkout session
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutResponse {
    pub session_id: String,

    /// Hosted checkout URL for the redirect
    pub url: String,
}

/// Response to a payment verification
#[derive(Debug, Clone, Serialize)]
pub struct VerifyPaymentResponse {
    /// Whether this request credited the user
    pub credited: bool,

    /// Whether the session was already settled earlier
    pub already_processed: bool,

    /// Whether the payment completed at the gateway
    pub paid: bool,

    /// Credits granted by this request
    pub credits: i64,

    /// New balance, when this request credited
    pub balance: Option<i64>,
}

impl From<SettleOutcome> for VerifyPaymentResponse {
    fn from(outcome: SettleOutcome) -> Self {
        match outcome {
            SettleOutcome::Credited { credits, balance } => Self {
                credited: true,
                already_processed: false,
                paid: true,
                credits,
                balance: Some(balance),
            },
            SettleOutcome::AlreadyProcessed => Self {
                credited: false,
                already_processed: true,
                paid: true,
                credits: 0,
                balance: None,
            },
            SettleOutcome::NotPaid => Self {
                credited: false,
                already_processed: false,
                paid: false,
                credits: 0,
                balance: None,
            },
        }
    }
}

/// A purchasable package in the catalog response
#[derive(Debug, Clone, Serialize)]
pub struct PackageResponse {
    pub id: String,
    pub name: String,
    pub credits: i64,
    pub amount_cents: i64,
    pub currency: String,
}

impl From<&CreditPackage> for PackageResponse {
    fn from(package: &CreditPackage) -> Self {
        Self {
            id: package.id.to_string(),
            name: package.name.to_string(),
            credits: package.credits,
            amount_cents: package.amount_cents,
            currency: "eur".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_response_from_outcomes() {
        let credited = VerifyPaymentResponse::from(SettleOutcome::Credited {
            credits: 15,
            balance: 16,
        });
        assert!(credited.credited);
        assert_eq!(credited.balance, Some(16));

        let repeat = VerifyPaymentResponse::from(SettleOutcome::AlreadyProcessed);
        assert!(!repeat.credited);
        assert!(repeat.already_processed);
        assert!(repeat.paid);

        let pending = VerifyPaymentResponse::from(SettleOutcome::NotPaid);
        assert!(!pending.paid);
    }

    #[test]
    fn test_package_response() {
        let package = CreditPackage::by_id("small").unwrap();
        let response = PackageResponse::from(package);
        assert_eq!(response.id, "small");
        assert_eq!(response.currency, "eur");
    }
}
