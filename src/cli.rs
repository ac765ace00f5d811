//! Command line interface for the billing binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::batch::BatchKind;
use crate::invoice::InvoiceId;

/// Recurring invoice billing.
#[derive(Debug, Parser)]
#[command(name = "billing", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the configuration file (defaults to ./billing.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the customers/invoices snapshot, overriding the config file.
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Which batch to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BatchArg {
    /// Invoices that were never charged.
    Pending,
    /// Invoices whose last charge was declined or hit a network error.
    Retry,
}

impl From<BatchArg> for BatchKind {
    fn from(arg: BatchArg) -> Self {
        match arg {
            BatchArg::Pending => BatchKind::Pending,
            BatchArg::Retry => BatchKind::Retry,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one batch now and print the summary.
    Run {
        #[arg(value_enum)]
        batch: BatchArg,
    },

    /// Process a single invoice by id.
    Process {
        invoice_id: InvoiceId,
    },

    /// Start the pending and retry schedulers and run until Ctrl-C.
    Schedule,

    /// Show when the next month-aligned run will happen.
    NextRun,
}
