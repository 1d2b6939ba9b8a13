//! Payment gateway client
//!
//! Wraps the payment processor's checkout API: create a hosted checkout
//! session for a credit package and retrieve it later for verification. The
//! session metadata carries the user id, credit amount, and package id
//! through the external round trip.

use belgrap_core::config::PaymentGatewayConfig;
use belgrap_core::{AppError, AppResult};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Client for the payment processor's REST API
#[derive(Clone)]
pub struct PaymentGatewayClient {
    http: Client,
    base_url: String,
    secret_key: String,
    success_url: String,
    cancel_url: String,
}

/// Parameters for creating a checkout session
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    pub user_id: Uuid,
    pub package_id: String,
    pub credits: i64,
    pub amount_cents: i64,
    pub product_name: String,
}

/// A freshly created checkout session
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session id, later used for verification and in the ledger
    pub id: String,

    /// Hosted checkout URL the client redirects to
    pub url: String,
}

/// A checkout session retrieved for verification
#[derive(Debug, Clone, Deserialize)]
pub struct SessionStatus {
    pub id: String,

    /// `paid` once the payment completed
    pub payment_status: String,

    /// Metadata set at session creation
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Typed view of the session metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionMetadata {
    pub user_id: Uuid,
    pub credits: i64,
    pub package_id: String,
}

impl SessionStatus {
    /// Whether the payment completed
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Parse the metadata written at session creation
    ///
    /// # Errors
    ///
    /// Returns `AppError::PaymentGateway` when a field is missing or
    /// malformed; a session without our metadata was not created by us.
    pub fn parse_metadata(&self) -> AppResult<SessionMetadata> {
        let user_id = self
            .metadata
            .get("userId")
            .and_then(|v| Uuid::parse_str(v).ok())
            .ok_or_else(|| {
                AppError::PaymentGateway(format!("Session {} has no valid userId", self.id))
            })?;

        let credits = self
            .metadata
            .get("credits")
            .and_then(|v| v.parse::<i64>().ok())
            .ok_or_else(|| {
                AppError::PaymentGateway(format!("Session {} has no valid credits", self.id))
            })?;

        let package_id = self
            .metadata
            .get("packageId")
            .cloned()
            .ok_or_else(|| {
                AppError::PaymentGateway(format!("Session {} has no packageId", self.id))
            })?;

        Ok(SessionMetadata {
            user_id,
            credits,
            package_id,
        })
    }
}

impl PaymentGatewayClient {
    /// Create a new payment gateway client
    pub fn new(config: &PaymentGatewayConfig) -> AppResult<Self> {
        let http = ClientBuilder::new()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::PaymentGateway(format!("Failed to build client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            success_url: config.success_url.clone(),
            cancel_url: config.cancel_url.clone(),
        })
    }

    async fn read_error(response: reqwest::Response) -> AppError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, "Payment gateway returned an error");
        AppError::PaymentGateway(format!("status {}: {}", status.as_u16(), body))
    }

    /// Create a hosted checkout session for a credit package
    ///
    /// The line item is built inline; metadata carries the user id, credits,
    /// and package id so both settlement paths can credit without extra state.
    #[instrument(skip(self, params))]
    pub async fn create_checkout_session(
        &self,
        params: &CheckoutParams,
    ) -> AppResult<CheckoutSession> {
        debug!(
            package_id = %params.package_id,
            amount_cents = params.amount_cents,
            "Creating checkout session"
        );

        let amount = params.amount_cents.to_string();
        let credits = params.credits.to_string();
        let user_id = params.user_id.to_string();
        let success_url = format!("{}?session_id={{CHECKOUT_SESSION_ID}}", self.success_url);

        let form: Vec<(&str, &str)> = vec![
            ("mode", "payment"),
            ("line_items[0][price_data][currency]", "eur"),
            ("line_items[0][price_data][unit_amount]", &amount),
            (
                "line_items[0][price_data][product_data][name]",
                &params.product_name,
            ),
            ("line_items[0][quantity]", "1"),
            ("metadata[userId]", &user_id),
            ("metadata[credits]", &credits),
            ("metadata[packageId]", &params.package_id),
            ("success_url", &success_url),
            ("cancel_url", &self.cancel_url),
        ];

        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.base_url))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .form(&form)
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json::<CheckoutSession>()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Invalid response body: {}", e)))
    }

    /// Retrieve a checkout session for verification
    #[instrument(skip(self))]
    pub async fn retrieve_session(&self, session_id: &str) -> AppResult<SessionStatus> {
        let response = self
            .http
            .get(format!(
                "{}/v1/checkout/sessions/{}",
                self.base_url, session_id
            ))
            .basic_auth(&self.secret_key, Option::<&str>::None)
            .send()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        response
            .json::<SessionStatus>()
            .await
            .map_err(|e| AppError::PaymentGateway(format!("Invalid response body: {}", e)))
    }
}

impl std::fmt::Debug for PaymentGatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentGatewayClient")
            .field("base_url", &self.base_url)
            .field("secret_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with_metadata(entries: &[(&str, &str)]) -> SessionStatus {
        SessionStatus {
            id: "cs_test_1".to_string(),
            payment_status: "paid".to_string(),
            metadata: entries
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_parse_metadata() {
        let user_id = Uuid::new_v4();
        let session = session_with_metadata(&[
            ("userId", &user_id.to_string()),
            ("credits", "15"),
            ("packageId", "medium"),
        ]);

        let metadata = session.parse_metadata().unwrap();
        assert_eq!(metadata.user_id, user_id);
        assert_eq!(metadata.credits, 15);
        assert_eq!(metadata.package_id, "medium");
    }

    #[test]
    fn test_parse_metadata_missing_field() {
        let session = session_with_metadata(&[("credits", "15")]);
        assert!(session.parse_metadata().is_err());
    }

    #[test]
    fn test_is_paid() {
        let mut session = session_with_metadata(&[]);
        assert!(session.is_paid());

        session.payment_status = "unpaid".to_string();
        assert!(!session.is_paid());
    }
}
