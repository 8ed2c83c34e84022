//! Payment provider refunds.
//!
//! Two differently-shaped processors sit behind one capability: refund a
//! captured payment by its stored reference. Adapters never fail the
//! call chain; every provider-side problem is folded into a
//! [`RefundOutcome`] so cancellation can proceed regardless.

pub mod card;
pub mod wallet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{CardConfig, WalletConfig};
use crate::domain::PaymentProvider;
use crate::OrderError;
use card::CardAdapter;
use wallet::WalletAdapter;

pub const NO_PAYMENT_INFO: &str = "no payment information available for refund";

/// Upper bound on any single provider HTTP call; a timeout surfaces as
/// a refund failure, not a retryable indeterminate state.
pub(crate) const PROVIDER_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(15);

/// Normalized result of a refund attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RefundOutcome {
    pub fn success(refund_id: impl Into<String>) -> Self {
        Self {
            success: true,
            refund_id: Some(refund_id.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            refund_id: None,
            error: Some(error.into()),
        }
    }
}

/// One provider's refund capability. Implementations capture all
/// provider-side failures into the outcome instead of returning errors.
#[async_trait]
pub trait RefundProvider: Send + Sync {
    async fn refund(&self, payment_reference: &str) -> RefundOutcome;
}

/// Provider selection seam used by the orchestrators; mockable in tests.
#[async_trait]
pub trait RefundDispatch: Send + Sync {
    async fn process_refund(
        &self,
        provider: Option<&str>,
        payment_reference: Option<&str>,
    ) -> RefundOutcome;
}

/// Routes refunds to the adapter matching the order's recorded provider.
///
/// Adapters are built once at startup from injected config; a provider
/// without credentials stays unconfigured and fails refunds with a
/// descriptive outcome without affecting the other one.
pub struct RefundDispatcher {
    card: Option<CardAdapter>,
    wallet: Option<WalletAdapter>,
}

impl RefundDispatcher {
    pub fn new(
        card: Option<CardConfig>,
        wallet: Option<WalletConfig>,
    ) -> Result<Self, OrderError> {
        Ok(Self {
            card: card.map(CardAdapter::new).transpose()?,
            wallet: wallet.map(WalletAdapter::new).transpose()?,
        })
    }
}

#[async_trait]
impl RefundDispatch for RefundDispatcher {
    async fn process_refund(
        &self,
        provider: Option<&str>,
        payment_reference: Option<&str>,
    ) -> RefundOutcome {
        let (provider, reference) = match (provider, payment_reference) {
            (Some(p), Some(r)) => (p, r),
            _ => return RefundOutcome::failure(NO_PAYMENT_INFO),
        };

        match PaymentProvider::parse(provider) {
            Some(PaymentProvider::Card) => match &self.card {
                Some(adapter) => adapter.refund(reference).await,
                None => RefundOutcome::failure("card provider is not configured"),
            },
            Some(PaymentProvider::Wallet) => match &self.wallet {
                Some(adapter) => adapter.refund(reference).await,
                None => RefundOutcome::failure("wallet provider is not configured"),
            },
            None => RefundOutcome::failure(format!("unknown payment provider: {provider}")),
        }
    }
}
