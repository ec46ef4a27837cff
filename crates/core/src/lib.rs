//! Core receivables logic for Ardesk.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage layers feed it snapshots and persist what it decides.
//!
//! # Modules
//!
//! - `ledger` - Signed client movements and balance folds
//! - `invoice` - Invoice balance tracker rules
//! - `allocation` - Payment allocation planning (FIFO and explicit)
//! - `collection` - Payment document validation and reversal summaries
//! - `prior_balance` - Legacy (pre go-live) debt loads
//! - `debt` - Per-client and system-wide debt aggregation

pub mod allocation;
pub mod collection;
pub mod debt;
pub mod invoice;
pub mod ledger;
pub mod prior_balance;
