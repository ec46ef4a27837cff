//! Client ledger logic.
//!
//! This module implements the ledger side of receivables:
//! - Ledger entries (signed movements tagged by origin)
//! - Balance folds and running statements
//! - Error types for ledger operations

pub mod balance;
pub mod entry;
pub mod error;

#[cfg(test)]
mod balance_props;

pub use balance::{DateRange, StatementLine, balance, statement};
pub use entry::{LedgerMovement, NewLedgerEntry, OriginKind, Sign};
pub use error::LedgerError;
