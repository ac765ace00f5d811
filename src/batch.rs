use std::fmt;

use chrono::{DateTime, Utc};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::invoice::InvoiceStatus;
use crate::orchestrator::BillingOrchestrator;

/// The two batches that can be triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Pending,
    Retry,
}

impl BatchKind {
    /// Status an invoice must have to be picked up by this batch.
    pub fn filter(self) -> InvoiceStatus {
        match self {
            BatchKind::Pending => InvoiceStatus::Pending,
            BatchKind::Retry => InvoiceStatus::Retry,
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filter())
    }
}

/// Outcome of one batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub run_id: Uuid,
    pub filter: InvoiceStatus,
    pub selected: usize,
    pub paid: usize,
    pub retry: usize,
    pub failed: usize,
    /// Invoices whose processing hit a fatal collaborator error.
    pub errored: usize,
    pub started_at: DateTime<Utc>,
    pub duration_ms: i64,
}

impl BatchSummary {
    fn start(filter: InvoiceStatus) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            filter,
            selected: 0,
            paid: 0,
            retry: 0,
            failed: 0,
            errored: 0,
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    fn record(&mut self, status: InvoiceStatus) {
        match status {
            InvoiceStatus::Paid => self.paid += 1,
            InvoiceStatus::Retry => self.retry += 1,
            InvoiceStatus::Fail => self.failed += 1,
            InvoiceStatus::Pending => {}
        }
    }

    fn finish(mut self) -> Self {
        self.duration_ms = (Utc::now() - self.started_at).num_milliseconds();
        self
    }
}

/// Runs the orchestrator over every invoice matching a status filter.
#[derive(Clone)]
pub struct BatchRunner {
    orchestrator: BillingOrchestrator,
}

impl BatchRunner {
    pub fn new(orchestrator: BillingOrchestrator) -> Self {
        Self { orchestrator }
    }

    /// Charge every `PENDING` invoice. Returns how many ended up `PAID`.
    pub async fn run_pending(&self) -> usize {
        self.run(BatchKind::Pending).await
    }

    /// Charge every `RETRY` invoice. Returns how many ended up `PAID`.
    pub async fn run_retry(&self) -> usize {
        self.run(BatchKind::Retry).await
    }

    pub async fn run(&self, kind: BatchKind) -> usize {
        self.run_batch(kind.filter()).await.paid
    }

    /// Processes the matching invoices one at a time, in store order.
    ///
    /// Never fails: a fatal error on one invoice is logged and the loop moves
    /// on, and a failed fetch yields an empty summary.
    pub async fn run_batch(&self, filter: InvoiceStatus) -> BatchSummary {
        let mut summary = BatchSummary::start(filter);
        let span = info_span!("batch", run_id = %summary.run_id, filter = %filter);

        async move {
            info!("processing payment of {filter} invoices");

            let invoices = match self.orchestrator.invoices().fetch_all().await {
                Ok(all) => all,
                Err(e) => {
                    error!(error = %e, "could not fetch invoices, batch aborted");
                    return summary.finish();
                }
            };

            for invoice in invoices.into_iter().filter(|i| i.status == filter) {
                summary.selected += 1;
                let invoice_id = invoice.id;
                match self.orchestrator.process_invoice(invoice).await {
                    Ok(processed) => summary.record(processed.status),
                    Err(e) => {
                        summary.errored += 1;
                        let invoice_id = e.invoice_id().unwrap_or(invoice_id);
                        error!(invoice_id, error = %e, "invoice processing failed, needs manual retry");
                    }
                }
            }

            let summary = summary.finish();
            info!(
                selected = summary.selected,
                paid = summary.paid,
                retry = summary.retry,
                failed = summary.failed,
                errored = summary.errored,
                "processed successfully {} invoices",
                summary.paid
            );
            summary
        }
        .instrument(span)
        .await
    }
}
