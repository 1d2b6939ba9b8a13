//! Payment entities
//!
//! The processed-session ledger replaces the original process-local set of
//! handled checkout sessions: a row per settled session with a uniqueness
//! constraint makes crediting idempotent across restarts and instances.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Which settlement path recorded the session first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentSource {
    /// Synchronous verify-payment endpoint
    Verify,
    /// Asynchronous signed webhook
    Webhook,
}

impl fmt::Display for PaymentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentSource::Verify => write!(f, "verify"),
            PaymentSource::Webhook => write!(f, "webhook"),
        }
    }
}

impl PaymentSource {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "verify" => Some(PaymentSource::Verify),
            "webhook" => Some(PaymentSource::Webhook),
            _ => None,
        }
    }
}

/// One processed checkout session (idempotency ledger row)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSession {
    /// Checkout session id at the payment gateway (primary key)
    pub session_id: String,

    /// Credited user
    pub user_id: Uuid,

    /// Credits granted
    pub credits: i64,

    /// Purchased package id
    pub package_id: String,

    /// Amount paid, in cents
    pub amount_cents: i64,

    /// Which path settled the session
    pub source: PaymentSource,

    /// When the session was settled
    pub processed_at: DateTime<Utc>,
}

/// A purchasable credit package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditPackage {
    /// Package identifier carried through checkout metadata
    pub id: &'static str,

    /// Display name
    pub name: &'static str,

    /// Credits granted on purchase
    pub credits: i64,

    /// Price in euro cents
    pub amount_cents: i64,
}

impl CreditPackage {
    /// The fixed package catalog
    pub fn catalog() -> &'static [CreditPackage] {
        &[
            CreditPackage {
                id: "small",
                name: "Starter",
                credits: 5,
                amount_cents: 499,
            },
            CreditPackage {
                id: "medium",
                name: "Populair",
                credits: 15,
                amount_cents: 999,
            },
            CreditPackage {
                id: "large",
                name: "Grootverbruiker",
                credits: 40,
                amount_cents: 1999,
            },
        ]
    }

    /// Look up a package by id
    pub fn by_id(id: &str) -> Option<&'static CreditPackage> {
        Self::catalog().iter().find(|p| p.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_lookup() {
        let package = CreditPackage::by_id("medium").unwrap();
        assert_eq!(package.credits, 15);
        assert!(CreditPackage::by_id("bogus").is_none());
    }

    #[test]
    fn test_catalog_prices_ascend_with_credits() {
        let catalog = CreditPackage::catalog();
        for pair in catalog.windows(2) {
            assert!(pair[0].credits < pair[1].credits);
            assert!(pair[0].amount_cents < pair[1].amount_cents);
        }
    }

    #[test]
    fn test_payment_source_roundtrip() {
        assert_eq!(PaymentSource::from_str("verify"), Some(PaymentSource::Verify));
        assert_eq!(PaymentSource::from_str("webhook"), Some(PaymentSource::Webhook));
        assert_eq!(PaymentSource::Webhook.to_string(), "webhook");
    }
}
