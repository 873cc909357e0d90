//! The settlement gateway seam.
//!
//! The checkout machine only ever talks to `PaymentGateway`; replacing the
//! simulation with a real mobile-money push, card network, wallet redirect,
//! or chain watcher changes nothing about the state machine's contract.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use kazi_core::PaymentDetails;

/// Errors a gateway can return for a confirmed payment.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// The instrument was declined.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The gateway could not be reached or errored out.
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),
}

/// Proof of a settled payment.
#[derive(Debug, Clone)]
pub struct SettlementReceipt {
    /// Gateway reference for the transaction.
    pub reference: String,

    /// When the gateway reported settlement.
    pub settled_at: DateTime<Utc>,
}

/// A payment gateway.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Settle a confirmed payment. Called exactly once per confirmation;
    /// retries are new confirmations.
    async fn settle(&self, details: &PaymentDetails) -> Result<SettlementReceipt, GatewayError>;
}

/// The simulated gateway: an artificial delay, then success, except for
/// the designated always-decline test instruments that exercise the
/// `Failed` path.
pub struct SimulatedGateway {
    delay: Duration,
}

impl SimulatedGateway {
    /// Create a simulated gateway with the given artificial delay.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Instruments that always decline, for exercising failure handling.
    fn decline_reason(details: &PaymentDetails) -> Option<String> {
        match details {
            PaymentDetails::MobileMoney { phone } if phone.ends_with("0000") => {
                Some("mobile money push rejected by subscriber".into())
            }
            PaymentDetails::Card { card, .. } if card.number.ends_with("0002") => {
                Some("card declined by issuer".into())
            }
            PaymentDetails::Wallet { email, .. } if email.ends_with("@decline.example.com") => {
                Some("wallet rejected the charge".into())
            }
            PaymentDetails::Crypto { address, .. } if address.ends_with("dead") => {
                Some("transaction rejected by the network".into())
            }
            _ => None,
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn settle(&self, details: &PaymentDetails) -> Result<SettlementReceipt, GatewayError> {
        tokio::time::sleep(self.delay).await;

        if let Some(reason) = Self::decline_reason(details) {
            tracing::info!(method = %details.method(), %reason, "simulated settlement declined");
            return Err(GatewayError::Declined(reason));
        }

        let receipt = SettlementReceipt {
            reference: format!("sim_{}", uuid::Uuid::new_v4().simple()),
            settled_at: Utc::now(),
        };
        tracing::info!(
            method = %details.method(),
            reference = %receipt.reference,
            "simulated settlement succeeded"
        );
        Ok(receipt)
    }
}
