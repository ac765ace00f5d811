use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type InvoiceId = u64;
pub type CustomerId = u64;

/// ISO currency codes accepted for invoices and customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
    Dkk,
    Sek,
    Gbp,
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::Eur => write!(f, "EUR"),
            Currency::Usd => write!(f, "USD"),
            Currency::Dkk => write!(f, "DKK"),
            Currency::Sek => write!(f, "SEK"),
            Currency::Gbp => write!(f, "GBP"),
        }
    }
}

/// An amount in a given currency. Only the currency code takes part in validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub value: Decimal,
    pub currency: Currency,
}

impl Money {
    #[cfg(test)]
    pub fn new(value: Decimal, currency: Currency) -> Self {
        Self { value, currency }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}

/// Lifecycle status of an invoice.
///
/// `Pending` and `Retry` are the only processable states. `Paid` is terminal and
/// `Fail` is the dead-letter state that needs an operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Pending,
    Retry,
    Paid,
    Fail,
}

impl InvoiceStatus {
    pub fn is_processable(self) -> bool {
        matches!(self, InvoiceStatus::Pending | InvoiceStatus::Retry)
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvoiceStatus::Pending => write!(f, "PENDING"),
            InvoiceStatus::Retry => write!(f, "RETRY"),
            InvoiceStatus::Paid => write!(f, "PAID"),
            InvoiceStatus::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub customer_id: CustomerId,
    pub amount: Money,
    pub status: InvoiceStatus,
}

impl Invoice {
    #[cfg(test)]
    pub fn new(id: InvoiceId, customer_id: CustomerId, amount: Money, status: InvoiceStatus) -> Self {
        Self {
            id,
            customer_id,
            amount,
            status,
        }
    }

    /// Copy of this invoice carrying `status`.
    pub fn with_status(&self, status: InvoiceStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub currency: Currency,
}
