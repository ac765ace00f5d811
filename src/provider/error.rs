//! Error types for the payment provider boundary.

use thiserror::Error;

/// Failures reported by a [`PaymentProvider`](super::PaymentProvider).
///
/// Only [`Network`](ProviderError::Network) is transient. The other variants
/// mean the provider broke its contract and are treated as fatal by the caller.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider could not be reached or answered with a transient status.
    #[error("network error: {0}")]
    Network(String),

    /// The provider answered with a non-retryable error status.
    #[error("provider rejected request (status {status}): {message}")]
    Rejected { status: u16, message: String },

    /// Request or response could not be encoded or decoded.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProviderError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Network(_))
    }
}
