//! Property-based tests for the allocation planners.
//!
//! - FIFO fills older invoices completely before newer ones get anything
//! - No invoice ever receives more than its outstanding balance
//! - Every collected cent ends up in exactly one allocation
//! - Planning is deterministic

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use ardesk_shared::types::{ClientId, InvoiceId};

use super::plan::{ExplicitRequest, FifoAllocator, check_prior_balance};
use super::target::{AllocationLine, AllocationTarget};
use crate::invoice::{InvoiceKind, InvoiceSnapshot, InvoiceState};

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Sorted open invoices for one client: `(day offset, total, settled share in %)`.
fn invoices() -> impl Strategy<Value = Vec<InvoiceSnapshot>> {
    prop::collection::vec((0u32..365, positive_amount(), 0u32..100), 0..12).prop_map(|rows| {
        let client_id = ClientId::new();
        let base = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mut list: Vec<InvoiceSnapshot> = rows
            .into_iter()
            .map(|(offset, total, pct)| InvoiceSnapshot {
                id: InvoiceId::new(),
                client_id,
                date: base + chrono::Days::new(u64::from(offset)),
                total,
                settled: (total * Decimal::from(pct) / Decimal::from(100)).round_dp(2),
                kind: InvoiceKind::OnCredit,
                state: InvoiceState::Confirmed,
            })
            .collect();
        list.sort_by_key(|i| (i.date, i.id));
        list
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_fifo_conserves_total(total in positive_amount(), candidates in invoices()) {
        let plan = FifoAllocator::plan(total, &candidates);
        prop_assert_eq!(plan.allocated(), total);
        prop_assert!(plan.allocations.iter().all(|a| a.amount > Decimal::ZERO));
    }

    #[test]
    fn prop_fifo_never_overpays(total in positive_amount(), candidates in invoices()) {
        let plan = FifoAllocator::plan(total, &candidates);
        for invoice in &candidates {
            prop_assert!(plan.for_invoice(invoice.id) <= invoice.outstanding());
        }
    }

    #[test]
    fn prop_fifo_fills_oldest_first(total in positive_amount(), candidates in invoices()) {
        let plan = FifoAllocator::plan(total, &candidates);
        let mut seen_partial = false;
        for invoice in &candidates {
            let applied = plan.for_invoice(invoice.id);
            if seen_partial {
                prop_assert_eq!(applied, Decimal::ZERO);
            }
            if applied < invoice.outstanding() {
                seen_partial = true;
            }
        }
    }

    #[test]
    fn prop_fifo_credit_only_when_everything_settled(total in positive_amount(), candidates in invoices()) {
        let plan = FifoAllocator::plan(total, &candidates);
        if plan.unassigned_credit() > Decimal::new(1, 2) {
            for invoice in &candidates {
                prop_assert_eq!(plan.for_invoice(invoice.id), invoice.outstanding());
            }
        }
    }

    #[test]
    fn prop_fifo_is_deterministic(total in positive_amount(), candidates in invoices()) {
        prop_assert_eq!(
            FifoAllocator::plan(total, &candidates),
            FifoAllocator::plan(total, &candidates)
        );
    }

    #[test]
    fn prop_explicit_plan_accounts_for_every_cent(
        total in positive_amount(),
        shares in prop::collection::vec(1u32..30, 1..6),
    ) {
        let per_line = (total / Decimal::from(shares.len() + 1))
            .round_dp_with_strategy(2, rust_decimal::RoundingStrategy::ToZero);
        let lines: Vec<AllocationLine> = shares
            .iter()
            .map(|_| AllocationLine {
                target: AllocationTarget::Invoice(InvoiceId::new()),
                amount: per_line,
            })
            .collect();
        let order: Vec<InvoiceId> = lines.iter().filter_map(|l| l.target.invoice_id()).collect();

        let request = ExplicitRequest::group(total, lines).unwrap();
        let plan = request.into_plan(&order);
        prop_assert_eq!(plan.allocated(), total);
    }

    #[test]
    fn prop_prior_balance_cap_holds(requested in positive_amount(), pending in positive_amount()) {
        let result = check_prior_balance(requested, pending);
        if requested <= pending {
            prop_assert!(result.is_ok());
        }
        if requested > pending + Decimal::new(1, 2) {
            prop_assert!(result.is_err());
        }
    }
}
