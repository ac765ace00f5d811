use thiserror::Error;

use crate::invoice::{CustomerId, InvoiceId};
use crate::provider::ProviderError;

/// Failures raised by the persistence collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invoice {0} not found")]
    InvoiceNotFound(InvoiceId),

    #[error("customer {0} not found")]
    CustomerNotFound(CustomerId),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum BillingError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Payment provider error for invoice {invoice_id}: {source}")]
    Provider {
        invoice_id: InvoiceId,
        #[source]
        source: ProviderError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl BillingError {
    /// Id of the invoice this failure belongs to, when known.
    pub fn invoice_id(&self) -> Option<InvoiceId> {
        match self {
            BillingError::Provider { invoice_id, .. } => Some(*invoice_id),
            BillingError::Store(StoreError::InvoiceNotFound(id)) => Some(*id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_names_invoice() {
        let err = BillingError::Provider {
            invoice_id: 42,
            source: ProviderError::Rejected {
                status: 500,
                message: "boom".into(),
            },
        };
        assert_eq!(err.invoice_id(), Some(42));
        assert!(err.to_string().contains("invoice 42"));
    }

    #[test]
    fn store_error_converts() {
        let err: BillingError = StoreError::Backend("disk full".into()).into();
        assert_eq!(err.to_string(), "Store error: storage backend failure: disk full");
        assert_eq!(err.invoice_id(), None);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BillingError>();
    }
}
