use std::sync::Arc;

use tracing::{info, warn};

use crate::error::BillingError;
use crate::invoice::{ChargeOutcome, Invoice};
use crate::provider::PaymentProvider;

/// Calls the payment provider once per invoice and classifies the result.
#[derive(Clone)]
pub struct PaymentExecutor {
    provider: Arc<dyn PaymentProvider>,
}

impl PaymentExecutor {
    pub fn new(provider: Arc<dyn PaymentProvider>) -> Self {
        Self { provider }
    }

    /// A transient network failure is folded into [`ChargeOutcome::NetworkError`].
    /// Any other provider error is returned as [`BillingError::Provider`].
    pub async fn charge(&self, invoice: &Invoice) -> Result<ChargeOutcome, BillingError> {
        info!(invoice_id = invoice.id, amount = %invoice.amount, "sending invoice to payment provider");
        match self.provider.charge(invoice).await {
            Ok(true) => Ok(ChargeOutcome::Success),
            Ok(false) => Ok(ChargeOutcome::Declined),
            Err(e) if e.is_transient() => {
                warn!(invoice_id = invoice.id, error = %e, "network error while charging");
                Ok(ChargeOutcome::NetworkError)
            }
            Err(source) => Err(BillingError::Provider {
                invoice_id: invoice.id,
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{Currency, InvoiceStatus};
    use crate::provider::ProviderError;
    use crate::testing::{invoice, ScriptedProvider};

    fn pending() -> Invoice {
        invoice(1, 1, Currency::Eur, InvoiceStatus::Pending)
    }

    #[tokio::test]
    async fn true_is_success() {
        let provider = Arc::new(ScriptedProvider::always_ok());
        let executor = PaymentExecutor::new(provider.clone());
        assert_eq!(executor.charge(&pending()).await.unwrap(), ChargeOutcome::Success);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn false_is_declined() {
        let provider = Arc::new(ScriptedProvider::always_declined());
        let executor = PaymentExecutor::new(provider.clone());
        assert_eq!(executor.charge(&pending()).await.unwrap(), ChargeOutcome::Declined);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn network_failure_is_a_value() {
        let provider = Arc::new(ScriptedProvider::always_network_error());
        let executor = PaymentExecutor::new(provider.clone());
        assert_eq!(
            executor.charge(&pending()).await.unwrap(),
            ChargeOutcome::NetworkError
        );
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn other_failures_propagate_with_invoice_id() {
        let provider = Arc::new(ScriptedProvider::always_rejected());
        let executor = PaymentExecutor::new(provider);
        let err = executor.charge(&pending()).await.unwrap_err();
        assert_eq!(err.invoice_id(), Some(1));
        assert!(matches!(
            err,
            BillingError::Provider {
                source: ProviderError::Rejected { .. },
                ..
            }
        ));
    }
}
