//! Payment documents.
//!
//! Validates a collection request before the engine runs and describes what
//! a reversal undid.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ardesk_shared::types::{ClientId, CollectionId, InvoiceId, SellerId, round_currency};

use crate::allocation::{AllocationError, ExplicitRequest, RawAllocation};

/// A payment as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCollection {
    /// Paying client.
    pub client_id: ClientId,
    /// Seller who collected, if any.
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    /// Business date.
    pub date: NaiveDate,
    /// Amount received.
    pub total_collected: Decimal,
    /// Free text.
    #[serde(default)]
    pub notes: Option<String>,
    /// Explicit allocations; omitted or empty selects FIFO.
    #[serde(default)]
    pub allocations: Option<Vec<RawAllocation>>,
}

/// How the engine should split the payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationMode {
    /// Oldest open invoice first.
    Fifo,
    /// Caller supplied targets.
    Explicit(ExplicitRequest),
}

/// A collection that passed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCollection {
    /// Paying client.
    pub client_id: ClientId,
    /// Seller who collected, if any.
    pub seller_id: Option<SellerId>,
    /// Business date.
    pub date: NaiveDate,
    /// Rounded amount received.
    pub total_collected: Decimal,
    /// Trimmed notes.
    pub notes: Option<String>,
    /// Selected allocation mode.
    pub mode: AllocationMode,
}

impl NewCollection {
    /// Validates amounts and parses allocation targets.
    pub fn validate(self) -> Result<ValidatedCollection, AllocationError> {
        let total = round_currency(self.total_collected);
        if total <= Decimal::ZERO {
            return Err(AllocationError::NonPositiveTotal(self.total_collected));
        }

        let mode = match self.allocations {
            Some(raw) if !raw.is_empty() => {
                let lines = raw
                    .into_iter()
                    .enumerate()
                    .map(|(index, entry)| entry.into_line(index))
                    .collect::<Result<Vec<_>, _>>()?;
                AllocationMode::Explicit(ExplicitRequest::group(total, lines)?)
            }
            _ => AllocationMode::Fifo,
        };

        let notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        Ok(ValidatedCollection {
            client_id: self.client_id,
            seller_id: self.seller_id,
            date: self.date,
            total_collected: total,
            notes,
            mode,
        })
    }
}

/// What deleting a collection restored on one invoice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoredInvoice {
    /// The invoice.
    pub invoice_id: InvoiceId,
    /// Amount taken back off its settled total.
    pub amount: Decimal,
    /// True when the invoice no longer exists and nothing was touched.
    pub skipped: bool,
}

/// Outcome of deleting a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversalSummary {
    /// The deleted collection.
    pub collection_id: CollectionId,
    /// Invoices whose settled amount went back down.
    pub restored_invoices: Vec<RestoredInvoice>,
    /// Legacy debt made pending again.
    pub prior_balance_released: Decimal,
    /// Unassigned credit withdrawn.
    pub credit_released: Decimal,
    /// Ledger rows removed for the collection.
    pub ledger_entries_removed: u64,
}

impl ReversalSummary {
    /// Starts an empty summary.
    #[must_use]
    pub fn new(collection_id: CollectionId) -> Self {
        Self {
            collection_id,
            restored_invoices: Vec::new(),
            prior_balance_released: Decimal::ZERO,
            credit_released: Decimal::ZERO,
            ledger_entries_removed: 0,
        }
    }

    /// Total taken back off invoices.
    #[must_use]
    pub fn restored_total(&self) -> Decimal {
        self.restored_invoices
            .iter()
            .filter(|r| !r.skipped)
            .fold(Decimal::ZERO, |acc, r| round_currency(acc + r.amount))
    }
}
