use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::info;

use crate::batch::{BatchKind, BatchRunner};

/// Work fired by a scheduler tick. Returns how many invoices were paid.
#[async_trait]
pub trait BatchTrigger: Send + Sync {
    fn describe(&self) -> String;

    async fn fire(&self) -> Result<usize>;
}

/// Runs a batch in-process.
pub struct LocalTrigger {
    runner: BatchRunner,
    kind: BatchKind,
}

impl LocalTrigger {
    pub fn pending(runner: BatchRunner) -> Self {
        Self {
            runner,
            kind: BatchKind::Pending,
        }
    }

    pub fn retry(runner: BatchRunner) -> Self {
        Self {
            runner,
            kind: BatchKind::Retry,
        }
    }
}

#[async_trait]
impl BatchTrigger for LocalTrigger {
    fn describe(&self) -> String {
        format!("local {} batch", self.kind)
    }

    async fn fire(&self) -> Result<usize> {
        let paid = match self.kind {
            BatchKind::Pending => self.runner.run_pending().await,
            BatchKind::Retry => self.runner.run_retry().await,
        };
        Ok(paid)
    }
}

/// Calls a remote batch endpoint whose response body is the paid count.
pub struct HttpTrigger {
    client: Client,
    url: String,
}

impl HttpTrigger {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl BatchTrigger for HttpTrigger {
    fn describe(&self) -> String {
        format!("GET {}", self.url)
    }

    async fn fire(&self) -> Result<usize> {
        info!(url = %self.url, "calling batch endpoint");
        let body = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("error calling {}", self.url))?
            .error_for_status()
            .with_context(|| format!("{} returned an error status", self.url))?
            .text()
            .await?;
        body.trim()
            .parse::<usize>()
            .with_context(|| format!("unexpected response from {}: {body:?}", self.url))
    }
}
