//! Ledger error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use ardesk_shared::{AppError, DomainError};
use uuid::Uuid;

use super::entry::OriginKind;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Ledger amounts are never negative; direction lives in the sign.
    #[error("Ledger amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    /// Manual movements and prior balances must move money.
    #[error("Amount must be positive: {0}")]
    NonPositiveAmount(Decimal),

    /// Persisted sign outside {+1, -1}.
    #[error("Invalid ledger sign: {0}")]
    InvalidSign(i16),

    /// Adjustments need an explicit direction.
    #[error("Adjustments require an explicit sign")]
    MissingSign,

    /// Sign contradicts the origin kind.
    #[error("Sign does not match origin kind {0}")]
    SignMismatch(OriginKind),

    /// Document-backed entries need their document id.
    #[error("Origin kind {0} requires an origin id")]
    MissingOriginId(OriginKind),

    /// Only adjustments and notes can be posted by hand.
    #[error("Origin kind {0} cannot be posted manually")]
    NotManualOrigin(OriginKind),

    /// `from` is after `to`.
    #[error("Invalid date range: {from} is after {to}")]
    InvalidDateRange {
        /// Start of the range.
        from: NaiveDate,
        /// End of the range.
        to: NaiveDate,
    },

    // ========== Prior Balance Errors ==========
    /// A bulk load item failed validation.
    #[error("Prior balance item {index}: {reason}")]
    InvalidBulkItem {
        /// Zero-based position in the request.
        index: usize,
        /// What was wrong.
        reason: String,
    },

    /// A bulk load carried no items.
    #[error("Bulk load must contain at least one item")]
    EmptyBulkLoad,

    /// Removing the load would leave less legacy debt than already collected.
    #[error(
        "Prior balance {prior_balance_id} cannot be removed: {allocated} already collected against {remaining} remaining legacy debt"
    )]
    PriorBalanceInUse {
        /// The load being removed.
        prior_balance_id: Uuid,
        /// Legacy debt left after removal.
        remaining: Decimal,
        /// Amount already allocated to legacy debt.
        allocated: Decimal,
    },

    // ========== Conflict Errors ==========
    /// `(origin_kind, origin_id)` already has an entry.
    #[error("Ledger entry already exists for {kind} {id}")]
    DuplicateOrigin {
        /// Origin kind.
        kind: OriginKind,
        /// Origin id.
        id: Uuid,
    },
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::NonPositiveAmount(_) => "NON_POSITIVE_AMOUNT",
            Self::InvalidSign(_) => "INVALID_SIGN",
            Self::MissingSign => "MISSING_SIGN",
            Self::SignMismatch(_) => "SIGN_MISMATCH",
            Self::MissingOriginId(_) => "MISSING_ORIGIN_ID",
            Self::NotManualOrigin(_) => "NOT_MANUAL_ORIGIN",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::InvalidBulkItem { .. } => "INVALID_BULK_ITEM",
            Self::EmptyBulkLoad => "EMPTY_BULK_LOAD",
            Self::PriorBalanceInUse { .. } => "PRIOR_BALANCE_IN_USE",
            Self::DuplicateOrigin { .. } => "DUPLICATE_ORIGIN",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::DuplicateOrigin { .. } => 409,
            _ => 400,
        }
    }

    /// Returns true for business-rule violations, as opposed to malformed input.
    #[must_use]
    pub fn is_business_rule(&self) -> bool {
        matches!(self, Self::PriorBalanceInUse { .. })
    }
}

impl DomainError for LedgerError {
    fn error_code(&self) -> &'static str {
        LedgerError::error_code(self)
    }

    fn classify(&self) -> AppError {
        AppError::from_status(self.http_status_code(), self.is_business_rule(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::MissingSign.error_code(), "MISSING_SIGN");
        assert_eq!(
            LedgerError::DuplicateOrigin {
                kind: OriginKind::Invoice,
                id: Uuid::nil()
            }
            .error_code(),
            "DUPLICATE_ORIGIN"
        );
        assert_eq!(LedgerError::EmptyBulkLoad.error_code(), "EMPTY_BULK_LOAD");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(LedgerError::NegativeAmount(dec!(-1)).http_status_code(), 400);
        assert_eq!(
            LedgerError::DuplicateOrigin {
                kind: OriginKind::Collection,
                id: Uuid::nil()
            }
            .http_status_code(),
            409
        );
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::DuplicateOrigin {
            kind: OriginKind::PriorBalance,
            id: Uuid::nil(),
        };
        assert_eq!(
            err.to_string(),
            "Ledger entry already exists for prior_balance 00000000-0000-0000-0000-000000000000"
        );
    }
}
