//! Payment provider boundary.
//!
//! [`PaymentProvider`] is the only way the billing core reaches money. The
//! [`HttpPaymentProvider`] adapter talks to a remote charge endpoint; tests use
//! in-memory implementations.

pub mod client;
pub mod error;
pub mod types;

use async_trait::async_trait;

use crate::invoice::Invoice;

pub use client::HttpPaymentProvider;
pub use error::ProviderError;

/// External charge operation.
///
/// `Ok(true)` means the customer was charged, `Ok(false)` that the charge was
/// declined. `Err(ProviderError::Network(_))` is transient; every other error is
/// a contract violation by the provider.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn charge(&self, invoice: &Invoice) -> Result<bool, ProviderError>;
}
