//! Allocation engine errors.

use rust_decimal::Decimal;
use thiserror::Error;
use ardesk_shared::{AppError, DomainError};
use ardesk_shared::types::InvoiceId;

use super::target::AppliesTo;
use crate::invoice::InvoiceError;

/// Errors raised while validating or planning a payment.
#[derive(Debug, Error)]
pub enum AllocationError {
    // ========== Validation Errors ==========
    /// Collected total must be positive.
    #[error("Total collected must be positive, got {0}")]
    NonPositiveTotal(Decimal),

    /// Allocation amounts cannot be negative.
    #[error("Allocation {index} has a negative amount: {amount}")]
    NegativeAmount {
        /// Zero-based position in the request.
        index: usize,
        /// Offending amount.
        amount: Decimal,
    },

    /// Discriminator text not recognised.
    #[error("Unknown allocation target: {0}")]
    UnknownDiscriminator(String),

    /// `applies_to = invoice` without an invoice id.
    #[error("Allocation targets an invoice but carries no invoice id")]
    MissingInvoiceId,

    /// Invoice id together with a non-invoice discriminator.
    #[error("Allocation for invoice {invoice_id} cannot apply to {applies_to:?}")]
    ConflictingTarget {
        /// The invoice id given.
        invoice_id: InvoiceId,
        /// The discriminator given.
        applies_to: AppliesTo,
    },

    // ========== Business Rule Errors ==========
    /// Explicit allocations sum to more than the payment.
    #[error("Allocations total {requested} exceeds collected amount {total}")]
    ExceedsCollected {
        /// Sum of explicit amounts.
        requested: Decimal,
        /// Collected total.
        total: Decimal,
    },

    /// Legacy debt request above what is pending.
    #[error("Requested {requested} exceeds pending prior balance {pending}")]
    ExceedsPriorBalance {
        /// Requested amount.
        requested: Decimal,
        /// Pending legacy debt.
        pending: Decimal,
    },

    /// Invoice rule violated.
    #[error(transparent)]
    Invoice(#[from] InvoiceError),
}

impl AllocationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NonPositiveTotal(_) => "NON_POSITIVE_TOTAL",
            Self::NegativeAmount { .. } => "NEGATIVE_ALLOCATION",
            Self::UnknownDiscriminator(_) => "UNKNOWN_ALLOCATION_TARGET",
            Self::MissingInvoiceId => "MISSING_INVOICE_ID",
            Self::ConflictingTarget { .. } => "CONFLICTING_ALLOCATION_TARGET",
            Self::ExceedsCollected { .. } => "ALLOCATION_EXCEEDS_COLLECTED",
            Self::ExceedsPriorBalance { .. } => "EXCEEDS_PRIOR_BALANCE",
            Self::Invoice(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Invoice(e) => e.http_status_code(),
            _ => 400,
        }
    }

    /// Returns true for business-rule violations, as opposed to malformed input.
    #[must_use]
    pub fn is_business_rule(&self) -> bool {
        match self {
            Self::ExceedsCollected { .. } | Self::ExceedsPriorBalance { .. } => true,
            Self::Invoice(e) => e.is_business_rule(),
            _ => false,
        }
    }
}

impl DomainError for AllocationError {
    fn error_code(&self) -> &'static str {
        AllocationError::error_code(self)
    }

    fn classify(&self) -> AppError {
        AppError::from_status(self.http_status_code(), self.is_business_rule(), self.to_string())
    }
}
