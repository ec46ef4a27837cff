//! Invoice balance tracker.
//!
//! An invoice carries a cached settled amount that the allocation engine
//! moves up and reversals move down. The rules live here; row locking is
//! the storage layer's job.

pub mod error;
pub mod tracker;
pub mod types;

pub use error::InvoiceError;
pub use tracker::{VoidOutcome, check_apply, check_void, outstanding, settle, unsettle};
pub use types::{InvoiceKind, InvoiceSnapshot, InvoiceState, NewInvoice};
