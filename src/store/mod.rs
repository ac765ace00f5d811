//! Persistence collaborators consumed by the billing core.

mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::invoice::{Customer, CustomerId, Invoice, InvoiceId};

pub use memory::InMemoryStore;

#[async_trait]
pub trait CustomerLookup: Send + Sync {
    /// Fails with [`StoreError::CustomerNotFound`] when no such customer exists.
    async fn fetch_customer(&self, id: CustomerId) -> Result<Customer, StoreError>;
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// All invoices, in an order that is stable for a single call.
    async fn fetch_all(&self) -> Result<Vec<Invoice>, StoreError>;

    /// Fails with [`StoreError::InvoiceNotFound`] when no such invoice exists.
    async fn fetch(&self, id: InvoiceId) -> Result<Invoice, StoreError>;

    /// Persists the status carried by `invoice`.
    async fn update_status(&self, invoice: &Invoice) -> Result<(), StoreError>;
}
