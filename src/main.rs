mod batch;
mod cli;
mod config;
mod error;
mod invoice;
mod orchestrator;
mod payment;
mod provider;
mod scheduler;
mod store;
mod ui;
mod validator;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use batch::{BatchKind, BatchRunner};
use cli::{Cli, Command};
use config::{BillingConfig, ScheduleSettings};
use orchestrator::BillingOrchestrator;
use provider::HttpPaymentProvider;
use scheduler::calendar;
use scheduler::{BatchTrigger, HttpTrigger, LocalTrigger, RecurringScheduler, ScheduleConfig};
use store::InMemoryStore;
use ui::BatchProgress;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = BillingConfig::load(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        config.data_path = data;
    }

    match cli.command {
        Command::NextRun => {
            print_next_run();
            Ok(())
        }
        command => run(command, &config).await,
    }
}

fn print_next_run() {
    let now = Local::now();
    let delay = calendar::until_next_month_start(&now);
    match calendar::next_month_start(&now) {
        Some(at) => println!(
            "Next month-aligned run: {} (in {}h {}m)",
            at.format("%Y-%m-%d %H:%M %Z"),
            delay.as_secs() / 3600,
            (delay.as_secs() % 3600) / 60
        ),
        None => println!("Next month-aligned run is out of calendar range"),
    }
}

async fn run(command: Command, config: &BillingConfig) -> Result<()> {
    let store = Arc::new(
        InMemoryStore::load(&config.data_path)
            .await
            .with_context(|| format!("failed to load {}", config.data_path.display()))?,
    );
    let provider = Arc::new(HttpPaymentProvider::with_timeouts(
        &config.provider.url,
        config.provider.connect_timeout(),
        config.provider.timeout(),
    )?);
    let orchestrator = BillingOrchestrator::new(store.clone(), store, provider);
    let runner = BatchRunner::new(orchestrator.clone());

    match command {
        Command::Run { batch } => {
            let kind = BatchKind::from(batch);
            let progress = BatchProgress::start(&format!("Charging {kind} invoices..."));
            let summary = runner.run_batch(kind.filter()).await;
            progress.finish_batch(&summary);
            Ok(())
        }
        Command::Process { invoice_id } => {
            let progress = BatchProgress::start(&format!("Processing invoice {invoice_id}..."));
            match orchestrator.process_invoice_by_id(invoice_id).await {
                Ok(invoice) => {
                    progress.finish_invoice(invoice.as_ref());
                    Ok(())
                }
                Err(e) => {
                    progress.fail(&e.to_string());
                    Err(e.into())
                }
            }
        }
        Command::Schedule => run_schedulers(config, runner).await,
        Command::NextRun => Ok(()),
    }
}

fn trigger_for(
    settings: &ScheduleSettings,
    local: LocalTrigger,
    config: &BillingConfig,
) -> Result<Arc<dyn BatchTrigger>> {
    let trigger: Arc<dyn BatchTrigger> = match &settings.trigger_url {
        Some(url) => Arc::new(HttpTrigger::new(url.clone(), config.provider.timeout())?),
        None => Arc::new(local),
    };
    Ok(trigger)
}

async fn run_schedulers(config: &BillingConfig, runner: BatchRunner) -> Result<()> {
    let now = Local::now();
    let schedules = &config.schedules;

    let pending = ScheduleConfig {
        name: "pending".into(),
        initial_delay: schedules.pending.initial_delay(&now),
        period: schedules.pending.period(),
        trigger: trigger_for(&schedules.pending, LocalTrigger::pending(runner.clone()), config)?,
        gate: schedules.pending.gate,
    };
    let retry = ScheduleConfig {
        name: "retry".into(),
        initial_delay: schedules.retry.initial_delay(&now),
        period: schedules.retry.period(),
        trigger: trigger_for(&schedules.retry, LocalTrigger::retry(runner), config)?,
        gate: schedules.retry.gate,
    };

    let mut handles = Vec::new();
    for schedule in [pending, retry] {
        handles.push(RecurringScheduler::new(schedule).schedule()?);
    }

    shutdown_signal().await?;
    info!("shutdown requested, waiting for running batches");

    for handle in &mut handles {
        handle.shutdown().await;
        info!(scheduler = handle.name(), state = %handle.state(), "scheduler shut down");
    }
    Ok(())
}

/// Resolves on Ctrl-C, or on SIGTERM where the platform has it.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).context("failed to listen for SIGTERM")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res.context("failed to listen for Ctrl-C")?,
            _ = terminate.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    Ok(())
}
