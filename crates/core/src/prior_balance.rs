//! Legacy (prior) balances.
//!
//! Debt that existed before go-live is loaded as `PriorBalance` ledger
//! entries. Payments can be applied to it up to what is still pending.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use ardesk_shared::types::{ClientId, money::floored_difference, round_currency};

use crate::ledger::LedgerError;

/// A legacy debt load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPriorBalance {
    /// Owing client.
    pub client_id: ClientId,
    /// Amount owed at go-live.
    pub amount: Decimal,
    /// Business date; defaults to the load date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Free text shown on statements.
    #[serde(default)]
    pub description: Option<String>,
}

impl NewPriorBalance {
    /// Rounds the amount and requires it to be positive.
    pub fn validate(mut self) -> Result<Self, LedgerError> {
        let amount = round_currency(self.amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount(self.amount));
        }
        self.amount = amount;
        Ok(self)
    }
}

/// Validates a bulk load, tagging the first failure with its position.
pub fn validate_bulk(items: Vec<NewPriorBalance>) -> Result<Vec<NewPriorBalance>, LedgerError> {
    if items.is_empty() {
        return Err(LedgerError::EmptyBulkLoad);
    }
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            item.validate().map_err(|e| LedgerError::InvalidBulkItem {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// A client's legacy debt position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorBalancePosition {
    /// Σ PriorBalance ledger entries.
    pub loaded: Decimal,
    /// Σ PriorBalance allocations.
    pub allocated: Decimal,
}

impl PriorBalancePosition {
    /// Legacy debt still open, never negative.
    #[must_use]
    pub fn pending(&self) -> Decimal {
        floored_difference(self.loaded, self.allocated)
    }

    /// Checks that removing a load of `amount` keeps the ceiling above what
    /// was already collected.
    pub fn check_removal(&self, prior_balance_id: Uuid, amount: Decimal) -> Result<(), LedgerError> {
        let remaining = round_currency(self.loaded - amount);
        if remaining < self.allocated {
            return Err(LedgerError::PriorBalanceInUse {
                prior_balance_id,
                remaining,
                allocated: self.allocated,
            });
        }
        Ok(())
    }
}
