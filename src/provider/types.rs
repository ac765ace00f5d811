//! Wire types for the remote charge endpoint (`POST <base>/charges`).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::invoice::{Currency, CustomerId, Invoice, InvoiceId, Money};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub invoice_id: InvoiceId,
    pub customer_id: CustomerId,
    pub amount: Decimal,
    pub currency: Currency,
}

impl From<&Invoice> for ChargeRequest {
    fn from(invoice: &Invoice) -> Self {
        let Money { value, currency } = invoice.amount;
        Self {
            invoice_id: invoice.id,
            customer_id: invoice.customer_id,
            amount: value,
            currency,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeResponse {
    pub charged: bool,
}
