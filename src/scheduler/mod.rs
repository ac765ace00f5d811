//! Fixed-rate recurring scheduler with an optional calendar gate.
//!
//! A [`RecurringScheduler`] owns one background timer task. The first tick
//! fires after `initial_delay`, then every `period` measured from that first
//! tick, regardless of how long a run takes. Each tick that passes the gate
//! dispatches the trigger on its own task; at most one run per scheduler is in
//! flight, and a tick that finds the previous run still going is skipped.

pub mod calendar;
pub mod trigger;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::error::BillingError;

pub use calendar::CalendarGate;
pub use trigger::{BatchTrigger, HttpTrigger, LocalTrigger};

/// Lifecycle of a started scheduler. It stays `Scheduled` across ticks and only
/// reaches `Stopped` through [`SchedulerHandle::shutdown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Scheduled,
    Stopped,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::Scheduled => write!(f, "SCHEDULED"),
            SchedulerState::Stopped => write!(f, "STOPPED"),
        }
    }
}

pub struct ScheduleConfig {
    /// Label used in logs.
    pub name: String,
    pub initial_delay: Duration,
    pub period: Duration,
    pub trigger: Arc<dyn BatchTrigger>,
    pub gate: Option<CalendarGate>,
}

fn local_today() -> NaiveDate {
    Local::now().date_naive()
}

pub struct RecurringScheduler {
    config: ScheduleConfig,
    today: fn() -> NaiveDate,
}

impl RecurringScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self {
            config,
            today: local_today,
        }
    }

    /// Replace the source of "today" used by the calendar gate.
    #[cfg(test)]
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Start the timer task. Must be called inside a tokio runtime.
    ///
    /// Rejects a zero period and delays that do not fit on the clock, so a
    /// started scheduler never dies computing its own deadlines.
    pub fn schedule(self) -> Result<SchedulerHandle, BillingError> {
        if self.config.period.is_zero() {
            return Err(BillingError::Config(format!(
                "scheduler {}: period must be greater than zero",
                self.config.name
            )));
        }
        let first_tick = Instant::now()
            .checked_add(self.config.initial_delay)
            .filter(|at| at.checked_add(self.config.period).is_some())
            .ok_or_else(|| {
                BillingError::Config(format!(
                    "scheduler {}: initial delay or period is too large",
                    self.config.name
                ))
            })?;

        let ScheduleConfig {
            name,
            initial_delay,
            period,
            trigger,
            gate,
        } = self.config;
        let today = self.today;

        info!(
            scheduler = %name,
            trigger = %trigger.describe(),
            first_run_in_hours = initial_delay.as_secs() / 3600,
            period_secs = period.as_secs(),
            "starting scheduler"
        );

        let stop = Arc::new(Notify::new());
        let in_flight = Arc::new(Semaphore::new(1));
        let span = info_span!("scheduler", name = %name);

        let task = {
            let stop = stop.clone();
            tokio::spawn(
                async move {
                    let mut ticker = interval_at(first_tick, period);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

                    loop {
                        tokio::select! {
                            _ = ticker.tick() => {}
                            _ = stop.notified() => break,
                        }

                        let date = today();
                        if let Some(gate) = gate
                            && !gate.allows(date)
                        {
                            debug!(%date, ?gate, "calendar gate closed, skipping tick");
                            continue;
                        }

                        let permit = match in_flight.clone().try_acquire_owned() {
                            Ok(permit) => permit,
                            Err(_) => {
                                warn!("previous run still in progress, skipping tick");
                                continue;
                            }
                        };

                        let trigger = trigger.clone();
                        tokio::spawn(
                            async move {
                                let _permit = permit;
                                let run = tokio::spawn(async move { trigger.fire().await });
                                match run.await {
                                    Ok(Ok(paid)) => info!(paid, "scheduled run finished"),
                                    Ok(Err(e)) => error!(error = %e, "scheduled run failed"),
                                    Err(e) => error!(error = %e, "scheduled run aborted"),
                                }
                            }
                            .in_current_span(),
                        );
                    }

                    // Let an in-flight run finish before reporting stopped.
                    let _ = in_flight.acquire().await;
                    info!("scheduler stopped");
                }
                .instrument(span),
            )
        };

        info!(scheduler = %name, "the scheduler is launched");
        Ok(SchedulerHandle {
            name,
            stop,
            task: Some(task),
        })
    }
}

/// Running scheduler. Dropping it leaves the timer running until the runtime
/// shuts down; call [`shutdown`](SchedulerHandle::shutdown) to stop it.
pub struct SchedulerHandle {
    name: String,
    stop: Arc<Notify>,
    task: Option<JoinHandle<()>>,
}

impl SchedulerHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SchedulerState {
        match &self.task {
            Some(task) if !task.is_finished() => SchedulerState::Scheduled,
            _ => SchedulerState::Stopped,
        }
    }

    /// Stop ticking and wait for the current run, if any, to complete.
    pub async fn shutdown(&mut self) {
        self.stop.notify_one();
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            error!(scheduler = %self.name, error = %e, "scheduler task ended abnormally");
        }
    }
}
