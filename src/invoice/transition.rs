use std::fmt;

use super::model::InvoiceStatus;

/// Result of checking an invoice before any charge is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Valid,
    NotProcessable,
    CustomerNotFound,
    CurrencyMismatch,
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validation::Valid => write!(f, "VALID"),
            Validation::NotProcessable => write!(f, "NOT_PROCESSABLE"),
            Validation::CustomerNotFound => write!(f, "CUSTOMER_NOT_FOUND"),
            Validation::CurrencyMismatch => write!(f, "CURRENCY_MISMATCH"),
        }
    }
}

/// Classification of a single charge attempt. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChargeOutcome {
    Success,
    Declined,
    NetworkError,
}

impl fmt::Display for ChargeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChargeOutcome::Success => write!(f, "SUCCESS"),
            ChargeOutcome::Declined => write!(f, "DECLINED"),
            ChargeOutcome::NetworkError => write!(f, "NETWORK_ERROR"),
        }
    }
}

/// What the orchestrator must do after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Leave the invoice untouched: no charge, no write.
    Unchanged,
    /// Validation passed; the charge outcome decides the next status.
    Charge,
    /// Move straight to the given status without charging.
    Settle(InvoiceStatus),
}

/// The invoice billing state machine.
///
/// | validation          | charge                   | next status |
/// |---------------------|--------------------------|-------------|
/// | not processable     | -                        | unchanged   |
/// | customer not found  | -                        | `FAIL`      |
/// | currency mismatch   | -                        | `FAIL`      |
/// | valid               | success                  | `PAID`      |
/// | valid               | declined / network error | `RETRY`     |
pub struct InvoiceStateMachine;

impl InvoiceStateMachine {
    pub fn on_validation(validation: Validation) -> Transition {
        match validation {
            Validation::NotProcessable => Transition::Unchanged,
            Validation::CustomerNotFound | Validation::CurrencyMismatch => {
                Transition::Settle(InvoiceStatus::Fail)
            }
            Validation::Valid => Transition::Charge,
        }
    }

    pub fn on_charge(outcome: ChargeOutcome) -> InvoiceStatus {
        match outcome {
            ChargeOutcome::Success => InvoiceStatus::Paid,
            ChargeOutcome::Declined | ChargeOutcome::NetworkError => InvoiceStatus::Retry,
        }
    }
}
