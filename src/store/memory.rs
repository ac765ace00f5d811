use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use super::{CustomerLookup, InvoiceStore};
use crate::error::{BillingError, StoreError};
use crate::invoice::{Customer, CustomerId, Invoice, InvoiceId};

/// JSON document backing [`InMemoryStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub customers: Vec<Customer>,
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

/// Customers and invoices held in memory.
///
/// A store opened with [`load`](InMemoryStore::load) is backed by its snapshot
/// file: every status update is written through before it is acknowledged, so
/// a killed process never forgets an invoice it already charged.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    customers: RwLock<BTreeMap<CustomerId, Customer>>,
    invoices: RwLock<BTreeMap<InvoiceId, Invoice>>,
    /// Snapshot file updated on every write, if any.
    backing: Option<PathBuf>,
    /// Serializes snapshot writes so an older snapshot never lands last.
    persist: Mutex<()>,
}

impl InMemoryStore {
    pub fn new(customers: Vec<Customer>, invoices: Vec<Invoice>) -> Self {
        Self {
            customers: RwLock::new(customers.into_iter().map(|c| (c.id, c)).collect()),
            invoices: RwLock::new(invoices.into_iter().map(|i| (i.id, i)).collect()),
            ..Self::default()
        }
    }

    /// Loads a snapshot file and keeps it as the write-through target. A
    /// missing file yields an empty store; the file is created on first write.
    pub async fn load(path: &Path) -> Result<Self, BillingError> {
        let mut store = if tokio::fs::try_exists(path).await? {
            let contents = tokio::fs::read_to_string(path).await?;
            let snapshot: Snapshot = serde_json::from_str(&contents)?;
            Self::new(snapshot.customers, snapshot.invoices)
        } else {
            Self::default()
        };
        store.backing = Some(path.to_path_buf());
        Ok(store)
    }

    pub async fn snapshot(&self) -> Snapshot {
        Snapshot {
            customers: self.customers.read().await.values().cloned().collect(),
            invoices: self.invoices.read().await.values().cloned().collect(),
        }
    }

    /// Writes the current snapshot to `path`, replacing the file atomically.
    pub async fn save(&self, path: &Path) -> Result<(), BillingError> {
        let _guard = self.persist.lock().await;
        let json = serde_json::to_string_pretty(&self.snapshot().await)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "snapshot saved");
        Ok(())
    }
}

#[async_trait]
impl CustomerLookup for InMemoryStore {
    async fn fetch_customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.customers
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::CustomerNotFound(id))
    }
}

#[async_trait]
impl InvoiceStore for InMemoryStore {
    async fn fetch_all(&self) -> Result<Vec<Invoice>, StoreError> {
        Ok(self.invoices.read().await.values().cloned().collect())
    }

    async fn fetch(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        self.invoices
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::InvoiceNotFound(id))
    }

    async fn update_status(&self, invoice: &Invoice) -> Result<(), StoreError> {
        let mut invoices = self.invoices.write().await;
        let stored = invoices
            .get_mut(&invoice.id)
            .ok_or(StoreError::InvoiceNotFound(invoice.id))?;
        stored.status = invoice.status;
        drop(invoices);

        if let Some(path) = &self.backing {
            self.save(path)
                .await
                .map_err(|e| StoreError::Backend(format!("failed to persist invoice {}: {e}", invoice.id)))?;
        }
        Ok(())
    }
}
