//! Allocation planners.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ardesk_shared::types::{InvoiceId, TOLERANCE, exceeds_ceiling, is_negligible, round_currency};

use super::error::AllocationError;
use super::target::{AllocationLine, AllocationTarget};
use crate::invoice::InvoiceSnapshot;

/// One allocation the storage layer must persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedAllocation {
    /// Where the money goes.
    pub target: AllocationTarget,
    /// Positive, rounded amount.
    pub amount: Decimal,
}

/// The full split of one payment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    /// Allocations in application order.
    pub allocations: Vec<PlannedAllocation>,
}

impl AllocationPlan {
    /// Sum of every planned amount.
    #[must_use]
    pub fn allocated(&self) -> Decimal {
        self.sum_where(|_| true)
    }

    /// Sum applied to invoices.
    #[must_use]
    pub fn to_invoices(&self) -> Decimal {
        self.sum_where(|t| matches!(t, AllocationTarget::Invoice(_)))
    }

    /// Sum banked as unassigned credit.
    #[must_use]
    pub fn unassigned_credit(&self) -> Decimal {
        self.sum_where(|t| *t == AllocationTarget::UnassignedCredit)
    }

    /// Sum applied to legacy debt.
    #[must_use]
    pub fn to_prior_balance(&self) -> Decimal {
        self.sum_where(|t| *t == AllocationTarget::PriorBalance)
    }

    /// Amount planned for one invoice.
    #[must_use]
    pub fn for_invoice(&self, invoice_id: InvoiceId) -> Decimal {
        self.sum_where(|t| *t == AllocationTarget::Invoice(invoice_id))
    }

    fn sum_where(&self, keep: impl Fn(&AllocationTarget) -> bool) -> Decimal {
        self.allocations
            .iter()
            .filter(|a| keep(&a.target))
            .fold(Decimal::ZERO, |acc, a| round_currency(acc + a.amount))
    }

    fn push(&mut self, target: AllocationTarget, amount: Decimal) {
        if amount > Decimal::ZERO {
            self.allocations.push(PlannedAllocation { target, amount });
        }
    }
}

/// FIFO planner, fed one locked invoice at a time in `(date, id)` order.
#[derive(Debug, Clone)]
pub struct FifoAllocator {
    remaining: Decimal,
    plan: AllocationPlan,
}

impl FifoAllocator {
    /// Starts a plan for `total` collected.
    #[must_use]
    pub fn new(total: Decimal) -> Self {
        Self {
            remaining: round_currency(total),
            plan: AllocationPlan::default(),
        }
    }

    /// Money not placed yet.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.remaining
    }

    /// True once the remainder is within [`TOLERANCE`]. A residual cent is
    /// not spread onto the next invoice; [`Self::finish`] banks it as credit.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        is_negligible(self.remaining)
    }

    /// Offers the next invoice. Returns the amount to apply to it, if any.
    ///
    /// The snapshot must be fresh, read after the row lock was taken.
    pub fn offer(&mut self, invoice: &InvoiceSnapshot) -> Option<Decimal> {
        if self.is_exhausted() || !invoice.participates() {
            return None;
        }
        let take = round_currency(self.remaining.min(invoice.outstanding()));
        if take <= Decimal::ZERO {
            return None;
        }
        self.remaining = round_currency(self.remaining - take);
        self.plan.push(AllocationTarget::Invoice(invoice.id), take);
        Some(take)
    }

    /// Closes the plan, banking whatever is left as unassigned credit,
    /// including a residue at or below the tolerance.
    #[must_use]
    pub fn finish(mut self) -> AllocationPlan {
        let leftover = self.remaining;
        self.plan.push(AllocationTarget::UnassignedCredit, leftover);
        self.plan
    }

    /// Plans against an already sorted, already locked candidate list.
    #[must_use]
    pub fn plan(total: Decimal, candidates: &[InvoiceSnapshot]) -> AllocationPlan {
        let mut allocator = Self::new(total);
        for invoice in candidates {
            if allocator.is_exhausted() {
                break;
            }
            allocator.offer(invoice);
        }
        allocator.finish()
    }
}

/// Caller specified allocations, grouped by target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitRequest {
    total: Decimal,
    invoices: Vec<(InvoiceId, Decimal)>,
    prior_balance: Decimal,
    credit: Decimal,
}

impl ExplicitRequest {
    /// Groups lines by target and checks them against the collected total.
    ///
    /// Lines for the same invoice are merged. Zero amounts are dropped.
    pub fn group(total: Decimal, lines: Vec<AllocationLine>) -> Result<Self, AllocationError> {
        let total = round_currency(total);
        let mut invoices: Vec<(InvoiceId, Decimal)> = Vec::new();
        let mut index: HashMap<InvoiceId, usize> = HashMap::new();
        let mut prior_balance = Decimal::ZERO;
        let mut credit = Decimal::ZERO;

        for line in lines {
            match line.target {
                AllocationTarget::Invoice(id) => {
                    if let Some(&pos) = index.get(&id) {
                        invoices[pos].1 = round_currency(invoices[pos].1 + line.amount);
                    } else {
                        index.insert(id, invoices.len());
                        invoices.push((id, line.amount));
                    }
                }
                AllocationTarget::PriorBalance => {
                    prior_balance = round_currency(prior_balance + line.amount);
                }
                AllocationTarget::UnassignedCredit => {
                    credit = round_currency(credit + line.amount);
                }
            }
        }
        invoices.retain(|(_, amount)| *amount > Decimal::ZERO);

        let request = Self {
            total,
            invoices,
            prior_balance,
            credit,
        };
        let requested = request.requested();
        if requested > total + TOLERANCE {
            return Err(AllocationError::ExceedsCollected { requested, total });
        }
        Ok(request)
    }

    /// Sum of all explicit amounts.
    #[must_use]
    pub fn requested(&self) -> Decimal {
        let invoices = self
            .invoices
            .iter()
            .fold(Decimal::ZERO, |acc, (_, amount)| acc + amount);
        round_currency(invoices + self.prior_balance + self.credit)
    }

    /// Invoice targets with their merged amounts, in request order.
    #[must_use]
    pub fn invoices(&self) -> &[(InvoiceId, Decimal)] {
        &self.invoices
    }

    /// Amount requested for legacy debt.
    #[must_use]
    pub fn prior_balance(&self) -> Decimal {
        self.prior_balance
    }

    /// Collected amount not claimed by any explicit line.
    #[must_use]
    pub fn remainder(&self) -> Decimal {
        round_currency(self.total - self.requested()).max(Decimal::ZERO)
    }

    /// Builds the plan. `applied_order` lists invoice ids in the order the
    /// storage layer locked and applied them.
    #[must_use]
    pub fn into_plan(self, applied_order: &[InvoiceId]) -> AllocationPlan {
        let mut plan = AllocationPlan::default();
        for id in applied_order {
            if let Some((_, amount)) = self.invoices.iter().find(|(invoice, _)| invoice == id) {
                plan.push(AllocationTarget::Invoice(*id), *amount);
            }
        }
        plan.push(AllocationTarget::PriorBalance, self.prior_balance);
        let credit = round_currency(self.credit + self.remainder());
        plan.push(AllocationTarget::UnassignedCredit, credit);
        plan
    }
}

/// Checks a legacy debt request against what is still pending.
pub fn check_prior_balance(requested: Decimal, pending: Decimal) -> Result<(), AllocationError> {
    if requested > Decimal::ZERO && exceeds_ceiling(requested, pending) {
        return Err(AllocationError::ExceedsPriorBalance { requested, pending });
    }
    Ok(())
}
