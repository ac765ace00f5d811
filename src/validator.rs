//! Pre-charge invoice checks.

use crate::error::StoreError;
use crate::invoice::{Customer, Invoice, Validation};
use crate::store::CustomerLookup;

/// Decides eligibility from the invoice and the customer it resolved to.
///
/// Status is checked first: a `PAID` or `FAIL` invoice is not processable
/// whatever its customer looks like.
pub fn check(invoice: &Invoice, customer: Option<&Customer>) -> Validation {
    if !invoice.status.is_processable() {
        return Validation::NotProcessable;
    }
    match customer {
        None => Validation::CustomerNotFound,
        Some(customer) if customer.currency != invoice.amount.currency => {
            Validation::CurrencyMismatch
        }
        Some(_) => Validation::Valid,
    }
}

/// Resolves the invoice's customer and runs [`check`].
///
/// A not-found lookup becomes [`Validation::CustomerNotFound`]; any other lookup
/// failure is returned to the caller.
pub async fn validate(
    invoice: &Invoice,
    customers: &dyn CustomerLookup,
) -> Result<Validation, StoreError> {
    if !invoice.status.is_processable() {
        return Ok(Validation::NotProcessable);
    }
    let customer = match customers.fetch_customer(invoice.customer_id).await {
        Ok(customer) => Some(customer),
        Err(StoreError::CustomerNotFound(_)) => None,
        Err(e) => return Err(e),
    };
    Ok(check(invoice, customer.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{Currency, InvoiceStatus};
    use crate::testing::{customer, invoice, FailingLookup};
    use crate::store::InMemoryStore;

    #[test]
    fn terminal_statuses_short_circuit() {
        let eur = customer(1, Currency::Eur);
        for status in [InvoiceStatus::Paid, InvoiceStatus::Fail] {
            let inv = invoice(1, 1, Currency::Eur, status);
            assert_eq!(check(&inv, Some(&eur)), Validation::NotProcessable);
            assert_eq!(check(&inv, None), Validation::NotProcessable);
        }
    }

    #[test]
    fn missing_customer() {
        let inv = invoice(1, 1, Currency::Eur, InvoiceStatus::Pending);
        assert_eq!(check(&inv, None), Validation::CustomerNotFound);
    }

    #[test]
    fn currency_mismatch() {
        let inv = invoice(1, 1, Currency::Eur, InvoiceStatus::Retry);
        let dkk = customer(1, Currency::Dkk);
        assert_eq!(check(&inv, Some(&dkk)), Validation::CurrencyMismatch);
    }

    #[test]
    fn matching_customer_is_valid() {
        let inv = invoice(1, 1, Currency::Eur, InvoiceStatus::Pending);
        let eur = customer(1, Currency::Eur);
        assert_eq!(check(&inv, Some(&eur)), Validation::Valid);
    }

    #[tokio::test]
    async fn validate_maps_not_found() {
        let store = InMemoryStore::new(vec![], vec![]);
        let inv = invoice(1, 1, Currency::Eur, InvoiceStatus::Pending);
        assert_eq!(
            validate(&inv, &store).await.unwrap(),
            Validation::CustomerNotFound
        );
    }

    #[tokio::test]
    async fn validate_skips_lookup_for_terminal_invoice() {
        let inv = invoice(1, 1, Currency::Eur, InvoiceStatus::Paid);
        assert_eq!(
            validate(&inv, &FailingLookup).await.unwrap(),
            Validation::NotProcessable
        );
    }

    #[tokio::test]
    async fn validate_propagates_backend_failure() {
        let inv = invoice(1, 1, Currency::Eur, InvoiceStatus::Pending);
        let err = validate(&inv, &FailingLookup).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
