//! In-memory collaborator doubles shared by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::invoice::{Currency, Customer, CustomerId, Invoice, InvoiceId, InvoiceStatus, Money};
use crate::provider::{PaymentProvider, ProviderError};
use crate::store::{CustomerLookup, InMemoryStore, InvoiceStore};

pub fn invoice(id: InvoiceId, customer_id: CustomerId, currency: Currency, status: InvoiceStatus) -> Invoice {
    Invoice::new(id, customer_id, Money::new(Decimal::new(10, 0), currency), status)
}

pub fn customer(id: CustomerId, currency: Currency) -> Customer {
    Customer { id, currency }
}

#[derive(Debug, Clone, Copy)]
pub enum Reply {
    Charged,
    Declined,
    Network,
    Rejected,
}

/// Provider answering with a fixed reply, optionally overridden per invoice.
pub struct ScriptedProvider {
    default: Reply,
    overrides: HashMap<InvoiceId, Reply>,
    calls: AtomicUsize,
    charged: Mutex<Vec<InvoiceId>>,
}

impl ScriptedProvider {
    pub fn always(reply: Reply) -> Self {
        Self {
            default: reply,
            overrides: HashMap::new(),
            calls: AtomicUsize::new(0),
            charged: Mutex::new(Vec::new()),
        }
    }

    pub fn always_ok() -> Self {
        Self::always(Reply::Charged)
    }

    pub fn always_declined() -> Self {
        Self::always(Reply::Declined)
    }

    pub fn always_network_error() -> Self {
        Self::always(Reply::Network)
    }

    pub fn always_rejected() -> Self {
        Self::always(Reply::Rejected)
    }

    pub fn with_reply_for(mut self, id: InvoiceId, reply: Reply) -> Self {
        self.overrides.insert(id, reply);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Invoice ids the provider was asked to charge, in call order.
    pub fn charged_ids(&self) -> Vec<InvoiceId> {
        self.charged.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentProvider for ScriptedProvider {
    async fn charge(&self, invoice: &Invoice) -> Result<bool, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.charged.lock().unwrap().push(invoice.id);
        match self.overrides.get(&invoice.id).copied().unwrap_or(self.default) {
            Reply::Charged => Ok(true),
            Reply::Declined => Ok(false),
            Reply::Network => Err(ProviderError::Network("connection reset".into())),
            Reply::Rejected => Err(ProviderError::Rejected {
                status: 500,
                message: "provider exploded".into(),
            }),
        }
    }
}

/// Wraps an [`InMemoryStore`], counting writes and injecting failures.
pub struct CountingStore {
    inner: InMemoryStore,
    writes: AtomicUsize,
    fail_fetch_all: bool,
    fail_update_for: Option<InvoiceId>,
}

impl CountingStore {
    pub fn new(customers: Vec<Customer>, invoices: Vec<Invoice>) -> Self {
        Self {
            inner: InMemoryStore::new(customers, invoices),
            writes: AtomicUsize::new(0),
            fail_fetch_all: false,
            fail_update_for: None,
        }
    }

    pub fn failing_fetch_all(mut self) -> Self {
        self.fail_fetch_all = true;
        self
    }

    pub fn failing_update_for(mut self, id: InvoiceId) -> Self {
        self.fail_update_for = Some(id);
        self
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CustomerLookup for CountingStore {
    async fn fetch_customer(&self, id: CustomerId) -> Result<Customer, StoreError> {
        self.inner.fetch_customer(id).await
    }
}

#[async_trait]
impl InvoiceStore for CountingStore {
    async fn fetch_all(&self) -> Result<Vec<Invoice>, StoreError> {
        if self.fail_fetch_all {
            return Err(StoreError::Backend("database unavailable".into()));
        }
        self.inner.fetch_all().await
    }

    async fn fetch(&self, id: InvoiceId) -> Result<Invoice, StoreError> {
        self.inner.fetch(id).await
    }

    async fn update_status(&self, invoice: &Invoice) -> Result<(), StoreError> {
        if self.fail_update_for == Some(invoice.id) {
            return Err(StoreError::Backend("write rejected".into()));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update_status(invoice).await
    }
}

/// Customer lookup whose backend is always down.
pub struct FailingLookup;

#[async_trait]
impl CustomerLookup for FailingLookup {
    async fn fetch_customer(&self, _id: CustomerId) -> Result<Customer, StoreError> {
        Err(StoreError::Backend("lookup service down".into()))
    }
}
