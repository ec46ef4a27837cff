//! Debt aggregation.
//!
//! Pure read-side math: what each client owes, per invoice and in total.
//! The storage layer supplies rows; nothing here touches the database.

pub mod aggregate;
pub mod settlement;

pub use aggregate::{ClientDebt, DebtSummaryRow, InvoiceDebtRow, OpenInvoice, client_debt, days_overdue, summarize};
pub use settlement::{SettlementDrift, detect_drift, resolve_settled};
