//! Billing configuration loaded from `billing.toml`.
//!
//! Values missing from the file use defaults that reproduce the standard
//! setup: a pending run on the first of every month and a daily retry run,
//! both aligned to local midnight at the next month boundary. The
//! `BILLING_PROVIDER_URL` environment variable takes precedence over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};
use serde::Deserialize;

use crate::error::BillingError;
use crate::scheduler::calendar::{self, CalendarGate};

pub const DEFAULT_CONFIG_FILE: &str = "billing.toml";
pub const PROVIDER_URL_ENV: &str = "BILLING_PROVIDER_URL";

/// Upper bound for `period_secs` and `after_secs`: one leap year.
pub const MAX_SCHEDULE_SECS: u64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// JSON snapshot holding customers and invoices.
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Where charges are sent.
    #[serde(default)]
    pub provider: ProviderSettings,

    /// Pending and retry scheduler settings.
    #[serde(default)]
    pub schedules: Schedules,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderSettings {
    /// Base URL of the payment provider; charges go to `<url>/charges`.
    #[serde(default = "default_provider_url")]
    pub url: String,

    /// Seconds allowed to open a connection.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds allowed for a whole charge request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Schedules {
    /// Charges `PENDING` invoices; gated to the first of the month by default.
    #[serde(default = "default_pending_schedule")]
    pub pending: ScheduleSettings,

    /// Re-charges `RETRY` invoices every day by default.
    #[serde(default = "default_retry_schedule")]
    pub retry: ScheduleSettings,
}

/// When a scheduler fires for the first time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Start {
    /// Local midnight on the first day of next month.
    #[default]
    NextMonth,
    /// A fixed number of seconds after startup.
    AfterSecs(u64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    /// When the first tick fires.
    #[serde(default)]
    pub start: Start,

    /// Seconds between ticks, measured from the first one.
    #[serde(default = "default_period_secs")]
    pub period_secs: u64,

    /// Calendar condition a tick must meet to run the batch.
    #[serde(default)]
    pub gate: Option<CalendarGate>,

    /// Remote batch endpoint to call instead of running the batch in-process.
    #[serde(default)]
    pub trigger_url: Option<String>,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("billing-data.json")
}

fn default_provider_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_period_secs() -> u64 {
    calendar::one_day().as_secs()
}

fn default_pending_schedule() -> ScheduleSettings {
    ScheduleSettings {
        start: Start::NextMonth,
        period_secs: default_period_secs(),
        gate: Some(CalendarGate::FirstOfMonth),
        trigger_url: None,
    }
}

fn default_retry_schedule() -> ScheduleSettings {
    ScheduleSettings {
        start: Start::NextMonth,
        period_secs: default_period_secs(),
        gate: None,
        trigger_url: None,
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            url: default_provider_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for Schedules {
    fn default() -> Self {
        Self {
            pending: default_pending_schedule(),
            retry: default_retry_schedule(),
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            provider: ProviderSettings::default(),
            schedules: Schedules::default(),
        }
    }
}

impl ProviderSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ScheduleSettings {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }

    pub fn initial_delay<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Duration {
        match self.start {
            Start::NextMonth => calendar::until_next_month_start(now),
            Start::AfterSecs(secs) => Duration::from_secs(secs),
        }
    }
}

impl BillingConfig {
    /// Loads `path`, or `billing.toml` in the current directory when `None`.
    /// Uses defaults if the file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<BillingConfig>(&contents).map_err(BillingError::from)?
        } else {
            Self::default()
        };

        config.apply_provider_override(std::env::var(PROVIDER_URL_ENV).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_provider_override(&mut self, url: Option<String>) {
        if let Some(url) = url
            && !url.is_empty()
        {
            self.provider.url = url;
        }
    }

    pub fn validate(&self) -> Result<(), BillingError> {
        for (name, schedule) in [("pending", &self.schedules.pending), ("retry", &self.schedules.retry)] {
            if schedule.period_secs == 0 {
                return Err(BillingError::Config(format!(
                    "schedules.{name}.period_secs must be greater than zero"
                )));
            }
            if schedule.period_secs > MAX_SCHEDULE_SECS {
                return Err(BillingError::Config(format!(
                    "schedules.{name}.period_secs must be at most {MAX_SCHEDULE_SECS}"
                )));
            }
            if let Start::AfterSecs(secs) = schedule.start
                && secs > MAX_SCHEDULE_SECS
            {
                return Err(BillingError::Config(format!(
                    "schedules.{name}.start.after_secs must be at most {MAX_SCHEDULE_SECS}"
                )));
            }
        }
        Ok(())
    }
}
