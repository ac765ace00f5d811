use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::error::{BillingError, StoreError};
use crate::invoice::{ChargeOutcome, Invoice, InvoiceId, InvoiceStateMachine, Transition};
use crate::payment::PaymentExecutor;
use crate::provider::PaymentProvider;
use crate::store::{CustomerLookup, InvoiceStore};
use crate::validator;

/// Drives a single invoice through validation, charge and write-back.
#[derive(Clone)]
pub struct BillingOrchestrator {
    customers: Arc<dyn CustomerLookup>,
    invoices: Arc<dyn InvoiceStore>,
    payments: PaymentExecutor,
}

impl BillingOrchestrator {
    pub fn new(
        customers: Arc<dyn CustomerLookup>,
        invoices: Arc<dyn InvoiceStore>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            customers,
            invoices,
            payments: PaymentExecutor::new(provider),
        }
    }

    pub fn invoices(&self) -> &Arc<dyn InvoiceStore> {
        &self.invoices
    }

    /// Process one invoice and return it with its new status.
    ///
    /// `PAID` and `FAIL` invoices come back untouched, without a charge or a
    /// write. Otherwise the new status is written back exactly once. Errors are
    /// fatal collaborator failures; declines and network failures are not errors.
    pub async fn process_invoice(&self, invoice: Invoice) -> Result<Invoice, BillingError> {
        debug!(invoice_id = invoice.id, status = %invoice.status, "processing invoice");

        let validation = validator::validate(&invoice, self.customers.as_ref()).await?;
        let next = match InvoiceStateMachine::on_validation(validation) {
            Transition::Unchanged => {
                warn!(
                    invoice_id = invoice.id,
                    status = %invoice.status,
                    "invoice won't be processed in its current status"
                );
                return Ok(invoice);
            }
            Transition::Settle(status) => {
                warn!(
                    invoice_id = invoice.id,
                    customer_id = invoice.customer_id,
                    reason = %validation,
                    "invoice customer is invalid"
                );
                status
            }
            Transition::Charge => {
                let outcome = self.payments.charge(&invoice).await?;
                match outcome {
                    ChargeOutcome::Success => {
                        info!(invoice_id = invoice.id, "invoice charged and paid")
                    }
                    ChargeOutcome::Declined => {
                        warn!(invoice_id = invoice.id, "payment declined, will retry")
                    }
                    ChargeOutcome::NetworkError => {
                        warn!(invoice_id = invoice.id, "payment not completed, will retry")
                    }
                }
                InvoiceStateMachine::on_charge(outcome)
            }
        };

        let updated = invoice.with_status(next);
        self.invoices.update_status(&updated).await?;
        Ok(updated)
    }

    /// Resolve `id` and process it. Returns `Ok(None)` when no such invoice exists.
    pub async fn process_invoice_by_id(
        &self,
        id: InvoiceId,
    ) -> Result<Option<Invoice>, BillingError> {
        match self.invoices.fetch(id).await {
            Ok(invoice) => self.process_invoice(invoice).await.map(Some),
            Err(StoreError::InvoiceNotFound(_)) => {
                error!(invoice_id = id, "invoice does not exist");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
