//! Invoice domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ardesk_shared::types::{ClientId, InvoiceId, SellerId, round_currency};

use super::error::InvoiceError;
use super::tracker::outstanding;

/// How the sale is paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    /// Paid at the point of sale, never owed.
    Cash,
    /// Fully on credit.
    OnCredit,
    /// Part paid at the point of sale, the rest on credit.
    PartialUpfront,
}

impl InvoiceKind {
    /// Returns true for kinds that create receivable debt.
    #[must_use]
    pub const fn is_receivable(self) -> bool {
        matches!(self, Self::OnCredit | Self::PartialUpfront)
    }
}

/// Lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceState {
    /// Live sale.
    Confirmed,
    /// Cancelled sale.
    Voided,
}

/// The invoice fields the tracker and the allocation engine need.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSnapshot {
    /// Invoice id.
    pub id: InvoiceId,
    /// Owning client.
    pub client_id: ClientId,
    /// Business date, first FIFO key.
    pub date: NaiveDate,
    /// Invoice total.
    pub total: Decimal,
    /// Settled amount as resolved by the configured settlement source.
    pub settled: Decimal,
    /// Payment kind.
    pub kind: InvoiceKind,
    /// Lifecycle state.
    pub state: InvoiceState,
}

impl InvoiceSnapshot {
    /// `max(0, round(total - settled))`.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        outstanding(self.total, self.settled)
    }

    /// Confirmed receivable invoices are the only ones that take part in allocation.
    #[must_use]
    pub fn participates(&self) -> bool {
        self.state == InvoiceState::Confirmed && self.kind.is_receivable()
    }

    /// Returns true when the invoice can still receive money.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.participates() && self.outstanding() > Decimal::ZERO
    }
}

/// Input for confirming an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInvoice {
    /// Caller-chosen id; resubmitting the same id is an idempotent retry.
    #[serde(default)]
    pub id: Option<InvoiceId>,
    /// Owning client.
    pub client_id: ClientId,
    /// Selling seller.
    #[serde(default)]
    pub seller_id: Option<SellerId>,
    /// Document number printed on the invoice.
    #[serde(default)]
    pub number: Option<String>,
    /// Business date.
    pub date: NaiveDate,
    /// Invoice total.
    pub total: Decimal,
    /// Payment kind.
    pub kind: InvoiceKind,
    /// Amount paid at the point of sale, only for `PartialUpfront`.
    #[serde(default)]
    pub upfront_amount: Option<Decimal>,
}

impl NewInvoice {
    /// Rounds amounts and checks the kind specific rules.
    pub fn validate(mut self) -> Result<Self, InvoiceError> {
        if self.total.is_sign_negative() && !self.total.is_zero() {
            return Err(InvoiceError::NegativeTotal(self.total));
        }
        self.total = round_currency(self.total);

        self.upfront_amount = match (self.kind, self.upfront_amount) {
            (InvoiceKind::PartialUpfront, Some(upfront)) => {
                let upfront = round_currency(upfront);
                if upfront <= Decimal::ZERO || upfront > self.total {
                    return Err(InvoiceError::InvalidUpfront {
                        upfront,
                        total: self.total,
                    });
                }
                Some(upfront)
            }
            (InvoiceKind::PartialUpfront, None) => None,
            (kind, Some(_)) => return Err(InvoiceError::UpfrontNotAllowed(kind)),
            (_, None) => None,
        };
        Ok(self)
    }

    /// Whether confirming this invoice creates receivable debt.
    #[must_use]
    pub fn creates_debt(&self) -> bool {
        self.kind.is_receivable()
    }
}
