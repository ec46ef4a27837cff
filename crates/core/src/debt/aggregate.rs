//! Per-client and system-wide debt views.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ardesk_shared::config::SettlementSource;
use ardesk_shared::types::{ClientId, InvoiceId, round_currency};

use super::settlement::resolve_settled;
use crate::invoice::outstanding;
use crate::prior_balance::PriorBalancePosition;

/// One confirmed receivable invoice with both settlement sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDebtRow {
    /// The invoice.
    pub invoice_id: InvoiceId,
    /// Owning client.
    pub client_id: ClientId,
    /// Business date.
    pub date: NaiveDate,
    /// Invoice total.
    pub total: Decimal,
    /// Cached `amount_settled` column.
    pub cached_settled: Decimal,
    /// Σ allocations to the invoice.
    pub allocated: Decimal,
}

/// An invoice that still owes money.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenInvoice {
    /// The invoice.
    pub invoice_id: InvoiceId,
    /// Business date.
    pub date: NaiveDate,
    /// Invoice total.
    pub total: Decimal,
    /// Resolved settled amount.
    pub settled: Decimal,
    /// What is still owed.
    pub outstanding: Decimal,
    /// Days since the invoice date.
    pub days_overdue: i64,
}

/// Everything one client owes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDebt {
    /// The client.
    pub client_id: ClientId,
    /// Σ outstanding over open invoices.
    pub invoice_debt: Decimal,
    /// Legacy debt still pending.
    pub prior_balance_pending: Decimal,
    /// `invoice_debt + prior_balance_pending`.
    pub total_debt: Decimal,
    /// Credit banked from overpayments, not netted against the debt.
    pub unassigned_credit: Decimal,
    /// Open invoices, oldest first.
    pub open_invoices: Vec<OpenInvoice>,
    /// Date of the oldest open invoice.
    pub oldest_open_invoice: Option<NaiveDate>,
    /// `today - oldest_open_invoice`, 0 without open invoices.
    pub days_overdue: i64,
}

/// One line of the system-wide debt report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtSummaryRow {
    /// The client.
    pub client_id: ClientId,
    /// Σ outstanding over open invoices.
    pub invoice_debt: Decimal,
    /// Legacy debt still pending.
    pub prior_balance_pending: Decimal,
    /// Total owed.
    pub total_debt: Decimal,
    /// Number of open invoices.
    pub open_invoice_count: usize,
    /// Date of the oldest open invoice.
    pub oldest_open_invoice: Option<NaiveDate>,
    /// Days since the oldest open invoice.
    pub days_overdue: i64,
}

/// Days between the oldest open invoice and `today`, floored at zero.
#[must_use]
pub fn days_overdue(oldest_open: Option<NaiveDate>, today: NaiveDate) -> i64 {
    oldest_open.map_or(0, |d| (today - d).num_days().max(0))
}

fn open_invoices(rows: &[&InvoiceDebtRow], source: SettlementSource, today: NaiveDate) -> Vec<OpenInvoice> {
    let mut open: Vec<OpenInvoice> = rows
        .iter()
        .filter_map(|row| {
            let settled = resolve_settled(source, row.cached_settled, row.allocated);
            let owed = outstanding(row.total, settled);
            (owed > Decimal::ZERO).then(|| OpenInvoice {
                invoice_id: row.invoice_id,
                date: row.date,
                total: row.total,
                settled,
                outstanding: owed,
                days_overdue: days_overdue(Some(row.date), today),
            })
        })
        .collect();
    open.sort_by_key(|i| (i.date, i.invoice_id));
    open
}

fn sum_outstanding(open: &[OpenInvoice]) -> Decimal {
    open.iter()
        .fold(Decimal::ZERO, |acc, i| round_currency(acc + i.outstanding))
}

/// Builds the debt view of one client.
///
/// `rows` must be the client's confirmed receivable invoices.
#[must_use]
pub fn client_debt(
    client_id: ClientId,
    rows: &[InvoiceDebtRow],
    prior: PriorBalancePosition,
    unassigned_credit: Decimal,
    source: SettlementSource,
    today: NaiveDate,
) -> ClientDebt {
    let own: Vec<&InvoiceDebtRow> = rows.iter().filter(|r| r.client_id == client_id).collect();
    let open = open_invoices(&own, source, today);
    let invoice_debt = sum_outstanding(&open);
    let prior_balance_pending = prior.pending();
    let oldest_open_invoice = open.first().map(|i| i.date);

    ClientDebt {
        client_id,
        invoice_debt,
        prior_balance_pending,
        total_debt: round_currency(invoice_debt + prior_balance_pending),
        unassigned_credit: round_currency(unassigned_credit),
        oldest_open_invoice,
        days_overdue: days_overdue(oldest_open_invoice, today),
        open_invoices: open,
    }
}

/// Builds the system-wide report: clients with positive debt, largest first.
#[must_use]
pub fn summarize(
    rows: &[InvoiceDebtRow],
    prior: &HashMap<ClientId, PriorBalancePosition>,
    source: SettlementSource,
    today: NaiveDate,
) -> Vec<DebtSummaryRow> {
    let mut by_client: BTreeMap<ClientId, Vec<&InvoiceDebtRow>> = BTreeMap::new();
    for row in rows {
        by_client.entry(row.client_id).or_default().push(row);
    }
    for client_id in prior.keys() {
        by_client.entry(*client_id).or_default();
    }

    let mut summary: Vec<DebtSummaryRow> = by_client
        .into_iter()
        .map(|(client_id, own)| {
            let open = open_invoices(&own, source, today);
            let invoice_debt = sum_outstanding(&open);
            let prior_balance_pending = prior
                .get(&client_id)
                .map_or(Decimal::ZERO, PriorBalancePosition::pending);
            let oldest_open_invoice = open.first().map(|i| i.date);
            DebtSummaryRow {
                client_id,
                invoice_debt,
                prior_balance_pending,
                total_debt: round_currency(invoice_debt + prior_balance_pending),
                open_invoice_count: open.len(),
                oldest_open_invoice,
                days_overdue: days_overdue(oldest_open_invoice, today),
            }
        })
        .filter(|row| row.total_debt > Decimal::ZERO)
        .collect();

    summary.sort_by(|a, b| {
        b.total_debt
            .cmp(&a.total_debt)
            .then_with(|| a.client_id.cmp(&b.client_id))
    });
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()
    }

    fn row(client_id: ClientId, month: u32, day: u32, total: Decimal, cached: Decimal, allocated: Decimal) -> InvoiceDebtRow {
        InvoiceDebtRow {
            invoice_id: InvoiceId::new(),
            client_id,
            date: NaiveDate::from_ymd_opt(2026, month, day).unwrap(),
            total,
            cached_settled: cached,
            allocated,
        }
    }

    #[test]
    fn test_days_overdue() {
        assert_eq!(days_overdue(None, today()), 0);
        assert_eq!(
            days_overdue(NaiveDate::from_ymd_opt(2026, 3, 1), today()),
            30
        );
        assert_eq!(
            days_overdue(NaiveDate::from_ymd_opt(2026, 4, 10), today()),
            0
        );
    }

    #[test]
    fn test_client_debt_combines_invoices_and_prior_balance() {
        let client = ClientId::new();
        let rows = vec![
            row(client, 1, 15, dec!(100), dec!(100), dec!(100)),
            row(client, 2, 1, dec!(50), dec!(20), dec!(20)),
            row(client, 3, 1, dec!(70), Decimal::ZERO, Decimal::ZERO),
        ];
        let prior = PriorBalancePosition {
            loaded: dec!(500),
            allocated: dec!(200),
        };

        let debt = client_debt(client, &rows, prior, dec!(15), SettlementSource::Allocations, today());

        assert_eq!(debt.invoice_debt, dec!(100));
        assert_eq!(debt.prior_balance_pending, dec!(300));
        assert_eq!(debt.total_debt, dec!(400));
        assert_eq!(debt.unassigned_credit, dec!(15));
        assert_eq!(debt.open_invoices.len(), 2);
        assert_eq!(debt.oldest_open_invoice, NaiveDate::from_ymd_opt(2026, 2, 1));
        assert_eq!(debt.days_overdue, 58);
    }

    #[test]
    fn test_client_debt_respects_settlement_source() {
        let client = ClientId::new();
        // Cached column ahead of the allocation history.
        let rows = vec![row(client, 1, 1, dec!(100), dec!(60), dec!(40))];

        let canonical = client_debt(
            client,
            &rows,
            PriorBalancePosition::default(),
            Decimal::ZERO,
            SettlementSource::Allocations,
            today(),
        );
        let legacy = client_debt(
            client,
            &rows,
            PriorBalancePosition::default(),
            Decimal::ZERO,
            SettlementSource::LegacyMax,
            today(),
        );

        assert_eq!(canonical.invoice_debt, dec!(60));
        assert_eq!(legacy.invoice_debt, dec!(40));
    }

    #[test]
    fn test_summarize_orders_and_filters() {
        let a = ClientId::new();
        let b = ClientId::new();
        let settled = ClientId::new();
        let legacy_only = ClientId::new();
        let rows = vec![
            row(a, 1, 1, dec!(100), Decimal::ZERO, Decimal::ZERO),
            row(b, 2, 1, dec!(300), dec!(50), dec!(50)),
            row(b, 3, 1, dec!(10), Decimal::ZERO, Decimal::ZERO),
            row(settled, 1, 1, dec!(80), dec!(80), dec!(80)),
        ];
        let mut prior = HashMap::new();
        prior.insert(
            legacy_only,
            PriorBalancePosition {
                loaded: dec!(120),
                allocated: Decimal::ZERO,
            },
        );

        let summary = summarize(&rows, &prior, SettlementSource::Allocations, today());

        let ids: Vec<ClientId> = summary.iter().map(|r| r.client_id).collect();
        assert_eq!(ids, vec![b, legacy_only, a]);
        assert_eq!(summary[0].total_debt, dec!(260));
        assert_eq!(summary[0].open_invoice_count, 2);
        assert_eq!(summary[1].invoice_debt, Decimal::ZERO);
        assert_eq!(summary[1].days_overdue, 0);
        assert_eq!(summary[2].days_overdue, 89);
    }
}
