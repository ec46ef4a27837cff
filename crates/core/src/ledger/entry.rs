//! Ledger entry domain types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use ardesk_shared::types::{ClientId, CollectionId, InvoiceId, PriorBalanceId, round_currency};

use super::error::LedgerError;

/// Source document kind of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OriginKind {
    /// Confirmed credit invoice.
    Invoice,
    /// Payment document.
    Collection,
    /// Manual correction.
    Adjustment,
    /// Credit note issued to the client.
    CreditNote,
    /// Debit note issued to the client.
    DebitNote,
    /// Debt carried over from before go-live.
    PriorBalance,
}

impl OriginKind {
    /// Returns the persisted name of the kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Collection => "collection",
            Self::Adjustment => "adjustment",
            Self::CreditNote => "credit_note",
            Self::DebitNote => "debit_note",
            Self::PriorBalance => "prior_balance",
        }
    }

    /// Returns true for kinds that may be posted by hand.
    #[must_use]
    pub const fn is_manual(self) -> bool {
        matches!(self, Self::Adjustment | Self::CreditNote | Self::DebitNote)
    }

    /// The sign a kind always carries, if it is fixed.
    #[must_use]
    pub const fn fixed_sign(self) -> Option<Sign> {
        match self {
            Self::Invoice | Self::DebitNote | Self::PriorBalance => Some(Sign::Increase),
            Self::Collection | Self::CreditNote => Some(Sign::Decrease),
            Self::Adjustment => None,
        }
    }
}

impl std::fmt::Display for OriginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a movement relative to the client's debt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sign {
    /// +1, the client owes more.
    Increase,
    /// -1, the client owes less.
    Decrease,
}

impl Sign {
    /// Returns the persisted factor (+1 or -1).
    #[must_use]
    pub const fn factor(self) -> i16 {
        match self {
            Self::Increase => 1,
            Self::Decrease => -1,
        }
    }

    /// Parses a persisted factor.
    pub fn from_factor(factor: i16) -> Result<Self, LedgerError> {
        match factor {
            1 => Ok(Self::Increase),
            -1 => Ok(Self::Decrease),
            other => Err(LedgerError::InvalidSign(other)),
        }
    }

    /// Applies the sign to a non-negative amount.
    #[must_use]
    pub fn apply(self, amount: Decimal) -> Decimal {
        match self {
            Self::Increase => amount,
            Self::Decrease => -amount,
        }
    }
}

/// A dated signed movement, the unit balances are folded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerMovement {
    /// Business date of the movement.
    pub date: NaiveDate,
    /// Direction.
    pub sign: Sign,
    /// Non-negative amount.
    pub amount: Decimal,
}

impl LedgerMovement {
    /// Returns `sign × amount`.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.sign.apply(self.amount)
    }
}

/// A ledger entry about to be appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLedgerEntry {
    /// Client the movement belongs to.
    pub client_id: ClientId,
    /// Business date.
    pub date: NaiveDate,
    /// Direction.
    pub sign: Sign,
    /// Non-negative amount, rounded to cents.
    pub amount: Decimal,
    /// Source document kind.
    pub origin_kind: OriginKind,
    /// Source document id; `None` only for manual movements.
    pub origin_id: Option<Uuid>,
    /// Free text shown on statements.
    pub description: String,
}

impl NewLedgerEntry {
    /// Debt created by confirming a credit invoice.
    #[must_use]
    pub fn for_invoice(client_id: ClientId, invoice_id: InvoiceId, date: NaiveDate, total: Decimal) -> Self {
        Self {
            client_id,
            date,
            sign: Sign::Increase,
            amount: round_currency(total),
            origin_kind: OriginKind::Invoice,
            origin_id: Some(invoice_id.into_inner()),
            description: format!("Invoice {invoice_id}"),
        }
    }

    /// Debt released by a payment.
    #[must_use]
    pub fn for_collection(
        client_id: ClientId,
        collection_id: CollectionId,
        date: NaiveDate,
        total_collected: Decimal,
    ) -> Self {
        Self {
            client_id,
            date,
            sign: Sign::Decrease,
            amount: round_currency(total_collected),
            origin_kind: OriginKind::Collection,
            origin_id: Some(collection_id.into_inner()),
            description: format!("Collection {collection_id}"),
        }
    }

    /// Legacy debt loaded at go-live.
    #[must_use]
    pub fn for_prior_balance(
        client_id: ClientId,
        prior_balance_id: PriorBalanceId,
        date: NaiveDate,
        amount: Decimal,
        description: Option<String>,
    ) -> Self {
        Self {
            client_id,
            date,
            sign: Sign::Increase,
            amount: round_currency(amount),
            origin_kind: OriginKind::PriorBalance,
            origin_id: Some(prior_balance_id.into_inner()),
            description: description.unwrap_or_else(|| "Prior balance".to_string()),
        }
    }

    /// A hand-posted adjustment, credit note or debit note.
    ///
    /// Credit and debit notes carry their own sign; adjustments need an
    /// explicit one.
    pub fn manual(
        client_id: ClientId,
        origin_kind: OriginKind,
        sign: Option<Sign>,
        date: NaiveDate,
        amount: Decimal,
        origin_id: Option<Uuid>,
        description: String,
    ) -> Result<Self, LedgerError> {
        if !origin_kind.is_manual() {
            return Err(LedgerError::NotManualOrigin(origin_kind));
        }
        let sign = match (origin_kind.fixed_sign(), sign) {
            (Some(fixed), Some(given)) if fixed != given => {
                return Err(LedgerError::SignMismatch(origin_kind));
            }
            (Some(fixed), _) => fixed,
            (None, Some(given)) => given,
            (None, None) => return Err(LedgerError::MissingSign),
        };
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(amount));
        }
        Self {
            client_id,
            date,
            sign,
            amount,
            origin_kind,
            origin_id,
            description,
        }
        .validate()
    }

    /// Normalises the amount and checks origin rules.
    pub fn validate(mut self) -> Result<Self, LedgerError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(LedgerError::NegativeAmount(self.amount));
        }
        self.amount = round_currency(self.amount);
        if self.origin_id.is_none() && !self.origin_kind.is_manual() {
            return Err(LedgerError::MissingOriginId(self.origin_kind));
        }
        if let Some(fixed) = self.origin_kind.fixed_sign()
            && fixed != self.sign
        {
            return Err(LedgerError::SignMismatch(self.origin_kind));
        }
        Ok(self)
    }

    /// The movement this entry contributes to the client's balance.
    #[must_use]
    pub fn movement(&self) -> LedgerMovement {
        LedgerMovement {
            date: self.date,
            sign: self.sign,
            amount: self.amount,
        }
    }
}
