//! Payment settlement service
//!
//! Two independent paths can credit a user for the same checkout: the
//! synchronous verify-payment endpoint and the asynchronous signed webhook.
//! Both funnel into `settle_session`, whose first step is the
//! insert-if-absent ledger write; whichever path loses the insert race
//! becomes a no-op, so zero, one, or many invocations credit exactly once.

use crate::referrals::ReferralService;
use belgrap_core::{
    models::{CreditPackage, PaymentSource, User},
    traits::{PaymentLedger, UserRepository},
    AppError, AppResult,
};
use belgrap_db::{PgPaymentLedger, PgUserRepository};
use belgrap_gateway::{
    parse_event, verify_signature, CheckoutParams, PaymentGatewayClient, SessionMetadata,
    CHECKOUT_COMPLETED,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Payment settlement service
pub struct PaymentService {
    pool: PgPool,
    gateway: Arc<PaymentGatewayClient>,
    referrals: Arc<ReferralService>,
    webhook_secret: String,
    webhook_tolerance_secs: i64,
}

/// A created checkout session, for the client redirect
#[derive(Debug, Clone, serde::Serialize)]
pub struct CheckoutCreated {
    pub session_id: String,
    pub url: String,
}

/// Result of settling a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettleOutcome {
    /// This invocation credited the user
    Credited { credits: i64, balance: i64 },
    /// The session was settled before; nothing changed
    AlreadyProcessed,
    /// The payment has not completed yet
    NotPaid,
}

impl PaymentService {
    /// Create a new payment service
    pub fn new(
        pool: PgPool,
        gateway: Arc<PaymentGatewayClient>,
        referrals: Arc<ReferralService>,
        webhook_secret: String,
        webhook_tolerance_secs: i64,
    ) -> Self {
        Self {
            pool,
            gateway,
            referrals,
            webhook_secret,
            webhook_tolerance_secs,
        }
    }

    /// Create a hosted checkout session for a credit package
    #[instrument(skip(self, user))]
    pub async fn create_checkout(
        &self,
        user: &User,
        package_id: &str,
    ) -> AppResult<CheckoutCreated> {
        let package = CreditPackage::by_id(package_id)
            .ok_or_else(|| AppError::NotFound(format!("Unknown package: {}", package_id)))?;

        let session = self
            .gateway
            .create_checkout_session(&CheckoutParams {
                user_id: user.id,
                package_id: package.id.to_string(),
                credits: package.credits,
                amount_cents: package.amount_cents,
                product_name: format!("Belgrap credits - {}", package.name),
            })
            .await?;

        info!(
            user_id = %user.id,
            session_id = %session.id,
            package_id = %package.id,
            "Checkout session created"
        );

        Ok(CheckoutCreated {
            session_id: session.id,
            url: session.url,
        })
    }

    /// Synchronous settlement path, invoked by the client after checkout
    #[instrument(skip(self))]
    pub async fn verify_payment(&self, session_id: &str) -> AppResult<SettleOutcome> {
        // Fast path: a session already in the ledger needs no gateway round trip.
        let ledger = PgPaymentLedger::new(self.pool.clone());
        if ledger.is_processed(session_id).await? {
            debug!("Session {} already in ledger", session_id);
            return Ok(SettleOutcome::AlreadyProcessed);
        }

        let session = self.gateway.retrieve_session(session_id).await?;

        if !session.is_paid() {
            debug!("Session {} not paid yet", session_id);
            return Ok(SettleOutcome::NotPaid);
        }

        let metadata = session.parse_metadata()?;
        self.settle_session(&session.id, &metadata, PaymentSource::Verify)
            .await
    }

    /// Asynchronous settlement path: the signed webhook
    ///
    /// Signature verification happens before anything else; a bad signature
    /// is a hard rejection with no state change.
    #[instrument(skip(self, payload, signature_header))]
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> AppResult<SettleOutcome> {
        verify_signature(
            payload,
            signature_header,
            &self.webhook_secret,
            self.webhook_tolerance_secs,
        )?;

        let event = parse_event(payload)?;

        if event.event_type != CHECKOUT_COMPLETED {
            debug!("Ignoring webhook event type {}", event.event_type);
            return Ok(SettleOutcome::NotPaid);
        }

        let session = event.data.object;
        if !session.is_paid() {
            debug!("Webhook session {} not paid", session.id);
            return Ok(SettleOutcome::NotPaid);
        }

        let metadata = session.parse_metadata()?;
        self.settle_session(&session.id, &metadata, PaymentSource::Webhook)
            .await
    }

    /// The shared settlement funnel
    ///
    /// The ledger insert is the idempotency guard; everything after it runs
    /// once per session no matter which path got here first or how often.
    async fn settle_session(
        &self,
        session_id: &str,
        metadata: &SessionMetadata,
        source: PaymentSource,
    ) -> AppResult<SettleOutcome> {
        let ledger = PgPaymentLedger::new(self.pool.clone());

        let amount_cents = CreditPackage::by_id(&metadata.package_id)
            .map(|p| p.amount_cents)
            .unwrap_or(0);

        let inserted = ledger
            .record_session(
                session_id,
                metadata.user_id,
                metadata.credits,
                &metadata.package_id,
                amount_cents,
                source,
            )
            .await?;

        if !inserted {
            debug!("Session {} already processed, skipping", session_id);
            return Ok(SettleOutcome::AlreadyProcessed);
        }

        let users = PgUserRepository::new(self.pool.clone());
        let balance = users.add_credits(metadata.user_id, metadata.credits).await?;
        users.mark_purchased(metadata.user_id).await?;

        info!(
            user_id = %metadata.user_id,
            session_id = %session_id,
            credits = metadata.credits,
            balance,
            source = %source,
            "Credits granted for checkout session"
        );

        // The referrer reward rides on the referred user's first settled
        // purchase; the invite-level guard makes repeats no-ops. A failure
        // here must not roll back the user's own credits.
        if let Err(e) = self.referrals.reward_referrer_for(metadata.user_id).await {
            error!(
                "Referral reward failed for user {}: {}",
                metadata.user_id, e
            );
        }

        Ok(SettleOutcome::Credited {
            credits: metadata.credits,
            balance,
        })
    }
}

impl std::fmt::Debug for PaymentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentService")
            .field("webhook_tolerance_secs", &self.webhook_tolerance_secs)
            .field("webhook_secret", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_outcome_equality() {
        assert_eq!(
            SettleOutcome::Credited {
                credits: 5,
                balance: 6
            },
            SettleOutcome::Credited {
                credits: 5,
                balance: 6
            }
        );
        assert_ne!(SettleOutcome::AlreadyProcessed, SettleOutcome::NotPaid);
    }
}
