//! Settlement arithmetic and payment checks.

use rust_decimal::Decimal;
use ardesk_shared::types::{ClientId, exceeds_ceiling, money::floored_difference, round_currency};

use super::error::InvoiceError;
use super::types::{InvoiceSnapshot, InvoiceState};

/// Outstanding balance: `max(0, round(total - settled, 2))`.
#[must_use]
pub fn outstanding(total: Decimal, settled: Decimal) -> Decimal {
    floored_difference(total, settled)
}

/// Checks that `amount` may be applied to the invoice on behalf of `client_id`.
///
/// Returns the outstanding balance left after the payment.
pub fn check_apply(
    invoice: &InvoiceSnapshot,
    client_id: ClientId,
    amount: Decimal,
) -> Result<Decimal, InvoiceError> {
    if invoice.client_id != client_id {
        return Err(InvoiceError::NotOwnedByClient {
            invoice_id: invoice.id,
            client_id,
        });
    }
    if invoice.state != InvoiceState::Confirmed {
        return Err(InvoiceError::NotConfirmed(invoice.id));
    }
    if !invoice.kind.is_receivable() {
        return Err(InvoiceError::NotReceivable(invoice.id));
    }
    let open = invoice.outstanding();
    if exceeds_ceiling(amount, open) {
        return Err(InvoiceError::OverpaymentRejected {
            invoice_id: invoice.id,
            requested: amount,
            outstanding: open,
        });
    }
    Ok(floored_difference(open, amount))
}

/// New cached settled amount after applying a payment.
#[must_use]
pub fn settle(cached: Decimal, amount: Decimal) -> Decimal {
    round_currency(cached + amount)
}

/// New cached settled amount after a reversal, never below zero.
#[must_use]
pub fn unsettle(cached: Decimal, amount: Decimal) -> Decimal {
    floored_difference(cached, amount)
}

/// Outcome of a void request that passed the checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoidOutcome {
    /// The invoice moves to `Voided`.
    Void,
    /// The invoice was voided before; nothing to do.
    AlreadyVoided,
}

/// Checks whether an invoice can be voided.
///
/// Payments must be reversed first so the allocation history stays intact.
pub fn check_void(invoice: &InvoiceSnapshot) -> Result<VoidOutcome, InvoiceError> {
    if invoice.state == InvoiceState::Voided {
        return Ok(VoidOutcome::AlreadyVoided);
    }
    if invoice.settled > Decimal::ZERO {
        return Err(InvoiceError::HasAllocations {
            invoice_id: invoice.id,
            settled: invoice.settled,
        });
    }
    Ok(VoidOutcome::Void)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::InvoiceKind;
    use ardesk_shared::types::InvoiceId;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn snapshot(total: Decimal, settled: Decimal) -> InvoiceSnapshot {
        InvoiceSnapshot {
            id: InvoiceId::new(),
            client_id: ClientId::new(),
            date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            total,
            settled,
            kind: InvoiceKind::OnCredit,
            state: InvoiceState::Confirmed,
        }
    }

    #[test]
    fn test_outstanding_is_floored() {
        assert_eq!(outstanding(dec!(100), dec!(25.5)), dec!(74.5));
        assert_eq!(outstanding(dec!(100), dec!(100.01)), Decimal::ZERO);
    }

    #[test]
    fn test_check_apply_returns_new_outstanding() {
        let invoice = snapshot(dec!(100), dec!(20));
        assert_eq!(check_apply(&invoice, invoice.client_id, dec!(30)).unwrap(), dec!(50));
    }

    #[test]
    fn test_check_apply_tolerates_one_cent() {
        let invoice = snapshot(dec!(100), dec!(20));
        assert_eq!(
            check_apply(&invoice, invoice.client_id, dec!(80.01)).unwrap(),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_check_apply_rejects_overpayment() {
        let invoice = snapshot(dec!(100), dec!(20));
        let err = check_apply(&invoice, invoice.client_id, dec!(80.02)).unwrap_err();
        assert!(matches!(
            err,
            InvoiceError::OverpaymentRejected { outstanding, .. } if outstanding == dec!(80)
        ));
    }

    #[test]
    fn test_check_apply_rejects_settled_invoice() {
        let invoice = snapshot(dec!(100), dec!(100));
        assert!(check_apply(&invoice, invoice.client_id, dec!(0.01)).is_err());
    }

    #[test]
    fn test_check_apply_rejects_foreign_client() {
        let invoice = snapshot(dec!(100), Decimal::ZERO);
        let err = check_apply(&invoice, ClientId::new(), dec!(10)).unwrap_err();
        assert!(matches!(err, InvoiceError::NotOwnedByClient { .. }));
    }

    #[test]
    fn test_check_apply_rejects_voided_and_cash() {
        let mut invoice = snapshot(dec!(100), Decimal::ZERO);
        invoice.state = InvoiceState::Voided;
        assert!(matches!(
            check_apply(&invoice, invoice.client_id, dec!(1)),
            Err(InvoiceError::NotConfirmed(_))
        ));

        invoice.state = InvoiceState::Confirmed;
        invoice.kind = InvoiceKind::Cash;
        assert!(matches!(
            check_apply(&invoice, invoice.client_id, dec!(1)),
            Err(InvoiceError::NotReceivable(_))
        ));
    }

    #[test]
    fn test_settle_and_unsettle() {
        assert_eq!(settle(dec!(10.10), dec!(0.25)), dec!(10.35));
        assert_eq!(unsettle(dec!(10), dec!(4)), dec!(6));
        assert_eq!(unsettle(dec!(10), dec!(15)), Decimal::ZERO);
    }

    #[test]
    fn test_check_void() {
        let open = snapshot(dec!(100), Decimal::ZERO);
        assert_eq!(check_void(&open).unwrap(), VoidOutcome::Void);

        let paid = snapshot(dec!(100), dec!(1));
        assert!(matches!(check_void(&paid), Err(InvoiceError::HasAllocations { .. })));

        let mut voided = snapshot(dec!(100), Decimal::ZERO);
        voided.state = InvoiceState::Voided;
        assert_eq!(check_void(&voided).unwrap(), VoidOutcome::AlreadyVoided);
    }
}
