//! Invoice tracker errors.

use rust_decimal::Decimal;
use thiserror::Error;
use ardesk_shared::{AppError, DomainError};
use ardesk_shared::types::{ClientId, InvoiceId};

use super::types::InvoiceKind;

/// Errors raised by invoice rules.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// Invoice id does not resolve.
    #[error("Invoice not found: {0}")]
    NotFound(InvoiceId),

    /// Invoice belongs to a different client.
    #[error("Invoice {invoice_id} does not belong to client {client_id}")]
    NotOwnedByClient {
        /// The invoice.
        invoice_id: InvoiceId,
        /// The paying client.
        client_id: ClientId,
    },

    /// Invoice is voided.
    #[error("Invoice {0} is not confirmed")]
    NotConfirmed(InvoiceId),

    /// Cash invoices never owe money.
    #[error("Invoice {0} is a cash sale and cannot receive payments")]
    NotReceivable(InvoiceId),

    /// Payment larger than the outstanding balance.
    #[error("Payment of {requested} exceeds outstanding balance {outstanding} on invoice {invoice_id}")]
    OverpaymentRejected {
        /// The invoice.
        invoice_id: InvoiceId,
        /// Requested amount.
        requested: Decimal,
        /// Outstanding balance at the time of the check.
        outstanding: Decimal,
    },

    /// Voiding needs payments reversed first.
    #[error("Invoice {invoice_id} has {settled} applied; reverse its collections before voiding")]
    HasAllocations {
        /// The invoice.
        invoice_id: InvoiceId,
        /// Settled amount still applied.
        settled: Decimal,
    },

    /// Invoice total below zero.
    #[error("Invoice total cannot be negative: {0}")]
    NegativeTotal(Decimal),

    /// Upfront amount outside `(0, total]`.
    #[error("Upfront amount {upfront} must be positive and at most the total {total}")]
    InvalidUpfront {
        /// Upfront amount.
        upfront: Decimal,
        /// Invoice total.
        total: Decimal,
    },

    /// Upfront amount given for a kind that has none.
    #[error("Upfront amount is only allowed on partial_upfront invoices, not {0:?}")]
    UpfrontNotAllowed(InvoiceKind),
}

impl InvoiceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "INVOICE_NOT_FOUND",
            Self::NotOwnedByClient { .. } => "INVOICE_NOT_OWNED_BY_CLIENT",
            Self::NotConfirmed(_) => "INVOICE_NOT_CONFIRMED",
            Self::NotReceivable(_) => "INVOICE_NOT_RECEIVABLE",
            Self::OverpaymentRejected { .. } => "OVERPAYMENT_REJECTED",
            Self::HasAllocations { .. } => "INVOICE_HAS_ALLOCATIONS",
            Self::NegativeTotal(_) => "NEGATIVE_TOTAL",
            Self::InvalidUpfront { .. } => "INVALID_UPFRONT",
            Self::UpfrontNotAllowed(_) => "UPFRONT_NOT_ALLOWED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            _ => 400,
        }
    }

    /// Returns true for business-rule violations, as opposed to malformed input.
    #[must_use]
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            Self::NotOwnedByClient { .. }
                | Self::NotConfirmed(_)
                | Self::NotReceivable(_)
                | Self::OverpaymentRejected { .. }
                | Self::HasAllocations { .. }
        )
    }
}

impl DomainError for InvoiceError {
    fn error_code(&self) -> &'static str {
        InvoiceError::error_code(self)
    }

    fn classify(&self) -> AppError {
        AppError::from_status(self.http_status_code(), self.is_business_rule(), self.to_string())
    }
}
