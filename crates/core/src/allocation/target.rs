//! Allocation targets and boundary parsing.
//!
//! Callers send `{invoice_id | null, amount, applies_to?}`. That loose shape
//! is turned into an [`AllocationTarget`] before anything else runs.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ardesk_shared::types::{InvoiceId, round_currency};

use super::error::AllocationError;

/// Persisted discriminator of an allocation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliesTo {
    /// Applied to the invoice in `invoice_id`.
    Invoice,
    /// Banked as credit for the client.
    UnassignedCredit,
    /// Applied to the client's legacy debt.
    PriorBalance,
}

impl AppliesTo {
    /// Parses a caller supplied discriminator.
    ///
    /// Accepts the snake_case names plus the aliases still sent by older
    /// clients (`CREDITO`, `credit`, `SALDO_PREVIO`), case-insensitively.
    pub fn parse(raw: &str) -> Result<Self, AllocationError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "invoice" | "venta" => Ok(Self::Invoice),
            "unassigned_credit" | "credit" | "credito" => Ok(Self::UnassignedCredit),
            "prior_balance" | "saldo_previo" => Ok(Self::PriorBalance),
            _ => Err(AllocationError::UnknownDiscriminator(raw.to_string())),
        }
    }
}

/// Where one unit of a payment goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "invoice_id", rename_all = "snake_case")]
pub enum AllocationTarget {
    /// A specific invoice.
    Invoice(InvoiceId),
    /// Credit banked for later.
    UnassignedCredit,
    /// Legacy debt bucket.
    PriorBalance,
}

impl AllocationTarget {
    /// Rebuilds a target from its persisted columns.
    pub fn from_parts(
        invoice_id: Option<InvoiceId>,
        applies_to: Option<AppliesTo>,
    ) -> Result<Self, AllocationError> {
        match (invoice_id, applies_to) {
            (Some(id), None | Some(AppliesTo::Invoice)) => Ok(Self::Invoice(id)),
            (Some(id), Some(other)) => Err(AllocationError::ConflictingTarget {
                invoice_id: id,
                applies_to: other,
            }),
            (None, None | Some(AppliesTo::UnassignedCredit)) => Ok(Self::UnassignedCredit),
            (None, Some(AppliesTo::PriorBalance)) => Ok(Self::PriorBalance),
            (None, Some(AppliesTo::Invoice)) => Err(AllocationError::MissingInvoiceId),
        }
    }

    /// The persisted discriminator.
    #[must_use]
    pub const fn applies_to(self) -> AppliesTo {
        match self {
            Self::Invoice(_) => AppliesTo::Invoice,
            Self::UnassignedCredit => AppliesTo::UnassignedCredit,
            Self::PriorBalance => AppliesTo::PriorBalance,
        }
    }

    /// The invoice id column.
    #[must_use]
    pub const fn invoice_id(self) -> Option<InvoiceId> {
        match self {
            Self::Invoice(id) => Some(id),
            Self::UnassignedCredit | Self::PriorBalance => None,
        }
    }
}

/// An allocation entry as received over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAllocation {
    /// Target invoice, or null for non-invoice targets.
    #[serde(default)]
    pub invoice_id: Option<InvoiceId>,
    /// Requested amount.
    pub amount: Decimal,
    /// Discriminator, required meaning only when `invoice_id` is null.
    #[serde(default, alias = "appliesTo")]
    pub applies_to: Option<String>,
}

/// A validated allocation request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationLine {
    /// Where the money goes.
    pub target: AllocationTarget,
    /// Rounded, non-negative amount.
    pub amount: Decimal,
}

impl RawAllocation {
    /// Validates the entry at position `index` of the request.
    pub fn into_line(self, index: usize) -> Result<AllocationLine, AllocationError> {
        if self.amount.is_sign_negative() && !self.amount.is_zero() {
            return Err(AllocationError::NegativeAmount {
                index,
                amount: self.amount,
            });
        }
        let applies_to = self
            .applies_to
            .as_deref()
            .filter(|raw| !raw.trim().is_empty())
            .map(AppliesTo::parse)
            .transpose()?;
        let target = AllocationTarget::from_parts(self.invoice_id, applies_to)?;
        Ok(AllocationLine {
            target,
            amount: round_currency(self.amount),
        })
    }
}
