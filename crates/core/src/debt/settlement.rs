//! Settled amount resolution.
//!
//! The allocation table is the audit trail and the canonical source. The
//! cached `amount_settled` column is an index kept in step with it.
//! `LegacyMax` exists for databases migrated before the column was
//! reliable; `rebuild-settlements` reports and fixes the drift.

use rust_decimal::Decimal;
use serde::Serialize;
use ardesk_shared::config::SettlementSource;
use ardesk_shared::types::{InvoiceId, round_currency};

use super::aggregate::InvoiceDebtRow;

/// Resolves the settled amount of one invoice.
#[must_use]
pub fn resolve_settled(source: SettlementSource, cached: Decimal, allocated: Decimal) -> Decimal {
    match source {
        SettlementSource::Allocations => round_currency(allocated),
        SettlementSource::LegacyMax => round_currency(cached.max(allocated)),
    }
}

/// An invoice whose cached column disagrees with its allocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettlementDrift {
    /// The invoice.
    pub invoice_id: InvoiceId,
    /// Value in the cached column.
    pub cached: Decimal,
    /// Σ allocations to the invoice.
    pub allocated: Decimal,
}

impl SettlementDrift {
    /// `cached - allocated`.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        round_currency(self.cached - self.allocated)
    }
}

/// Lists invoices whose cached column differs from their allocation sum.
#[must_use]
pub fn detect_drift(rows: &[InvoiceDebtRow]) -> Vec<SettlementDrift> {
    rows.iter()
        .filter(|r| round_currency(r.cached_settled) != round_currency(r.allocated))
        .map(|r| SettlementDrift {
            invoice_id: r.invoice_id,
            cached: r.cached_settled,
            allocated: r.allocated,
        })
        .collect()
}
