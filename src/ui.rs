//! Terminal output: a spinner while a batch runs and a colored summary.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::BatchSummary;
use crate::invoice::{Invoice, InvoiceStatus};

/// Spinner shown while a batch or single invoice is being processed.
pub struct BatchProgress {
    /// Spinner cleared before the result is printed.
    pb: ProgressBar,
    /// Paid invoices and clean batches.
    green: Style,
    /// Failures, errored invoices and missing invoices.
    red: Style,
    /// Invoices left for the retry batch.
    yellow: Style,
}

impl BatchProgress {
    /// Starts a spinner showing `message`.
    pub fn start(message: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
        }
    }

    fn status_style(&self, status: InvoiceStatus) -> &Style {
        match status {
            InvoiceStatus::Paid => &self.green,
            InvoiceStatus::Fail => &self.red,
            _ => &self.yellow,
        }
    }

    /// Clears the spinner and prints the batch totals.
    pub fn finish_batch(&self, summary: &BatchSummary) {
        self.pb.finish_and_clear();
        let mark = if summary.errored == 0 {
            self.green.apply_to("✓")
        } else {
            self.red.apply_to("✗")
        };
        println!(
            "  {mark} {} batch: {} of {} invoices paid",
            summary.filter, summary.paid, summary.selected
        );
        println!(
            "    {} retry  {} failed  {} errored  ({} ms)",
            self.yellow.apply_to(summary.retry),
            self.red.apply_to(summary.failed),
            self.red.apply_to(summary.errored),
            summary.duration_ms
        );
    }

    /// Clears the spinner and prints the processed invoice, or that it was not found.
    pub fn finish_invoice(&self, invoice: Option<&Invoice>) {
        self.pb.finish_and_clear();
        match invoice {
            Some(invoice) => println!(
                "  Invoice {} ({}): {}",
                invoice.id,
                invoice.amount,
                self.status_style(invoice.status).apply_to(invoice.status)
            ),
            None => println!("  {} Invoice not found", self.red.apply_to("✗")),
        }
    }

    pub fn fail(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }
}
