mod model;
mod transition;

pub use model::{Currency, Customer, CustomerId, Invoice, InvoiceId, InvoiceStatus, Money};
pub use transition::{ChargeOutcome, InvoiceStateMachine, Transition, Validation};
