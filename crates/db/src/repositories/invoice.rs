//! Invoice balance tracker repository.
//!
//! Keeps the cached `amount_settled` column in step with the allocation
//! table. Every settlement change happens on a row locked with
//! `SELECT ... FOR UPDATE` inside the caller's unit of work, and the settled
//! amount is re-read after the lock so concurrent payments never both see
//! the same outstanding balance.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use ardesk_core::allocation::{AllocationLine, AllocationTarget, ExplicitRequest};
use ardesk_core::collection::{AllocationMode, RestoredInvoice, ValidatedCollection};
use ardesk_core::debt::{InvoiceDebtRow, SettlementDrift, detect_drift, resolve_settled};
use ardesk_core::invoice::{
    InvoiceError, InvoiceSnapshot, NewInvoice, VoidOutcome, check_apply, check_void, settle,
    unsettle,
};
use ardesk_core::ledger::{NewLedgerEntry, OriginKind};
use ardesk_shared::config::SettlementSource;
use ardesk_shared::types::{ClientId, InvoiceId, SellerId, round_currency};
use ardesk_shared::{AppError, DomainError};

use super::client::{find_client, seller_exists};
use super::collection::{CollectionError, record_collection};
use super::ledger::{self, LedgerStoreError};
use crate::entities::{
    allocations, invoices,
    sea_orm_active_enums::{InvoiceKind as DbInvoiceKind, InvoiceState as DbInvoiceState},
};
use crate::unit_of_work::UnitOfWorkExt;

/// Error types for invoice operations.
#[derive(Debug, thiserror::Error)]
pub enum InvoiceTrackerError {
    /// Invoice rule violated.
    #[error(transparent)]
    Invoice(#[from] InvoiceError),

    /// The id of an idempotent retry belongs to a different invoice.
    #[error("Invoice id {0} is already used by a different invoice")]
    IdConflict(InvoiceId),

    /// Client not found.
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// Seller not found.
    #[error("Seller not found: {0}")]
    SellerNotFound(SellerId),

    /// Ledger write failed.
    #[error(transparent)]
    Ledger(#[from] LedgerStoreError),

    /// The upfront payment could not be recorded.
    #[error(transparent)]
    Upfront(Box<CollectionError>),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl DomainError for InvoiceTrackerError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Invoice(e) => DomainError::error_code(e),
            Self::IdConflict(_) => "INVOICE_ID_CONFLICT",
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::SellerNotFound(_) => "SELLER_NOT_FOUND",
            Self::Ledger(e) => e.error_code(),
            Self::Upfront(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn classify(&self) -> AppError {
        match self {
            Self::Invoice(e) => e.classify(),
            Self::IdConflict(_) => AppError::Conflict(self.to_string()),
            Self::ClientNotFound(_) | Self::SellerNotFound(_) => {
                AppError::NotFound(self.to_string())
            }
            Self::Ledger(e) => e.classify(),
            Self::Upfront(e) => e.classify(),
            Self::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

impl From<InvoiceTrackerError> for AppError {
    fn from(err: InvoiceTrackerError) -> Self {
        err.classify()
    }
}

/// An invoice with its settlement as resolved by the configured source.
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    /// The stored row.
    #[serde(flatten)]
    pub invoice: invoices::Model,
    /// Σ allocations applied to the invoice.
    pub allocated: Decimal,
    /// Settled amount per the settlement source.
    pub settled: Decimal,
    /// `max(0, total - settled)`.
    pub outstanding: Decimal,
}

impl InvoiceView {
    fn new(invoice: invoices::Model, allocated: Decimal, source: SettlementSource) -> Self {
        let snapshot = to_snapshot(&invoice, allocated, source);
        Self {
            invoice,
            allocated,
            settled: snapshot.settled,
            outstanding: snapshot.outstanding(),
        }
    }
}

/// Builds the engine's view of a stored invoice.
pub(crate) fn to_snapshot(
    model: &invoices::Model,
    allocated: Decimal,
    source: SettlementSource,
) -> InvoiceSnapshot {
    InvoiceSnapshot {
        id: InvoiceId::from_uuid(model.id),
        client_id: ClientId::from_uuid(model.client_id),
        date: model.invoice_date,
        total: model.total,
        settled: resolve_settled(source, model.amount_settled, allocated),
        kind: model.kind.into(),
        state: model.state.into(),
    }
}

/// Locks an invoice row with `SELECT ... FOR UPDATE`.
pub(crate) async fn lock_invoice<C: ConnectionTrait>(
    conn: &C,
    invoice_id: InvoiceId,
) -> Result<Option<invoices::Model>, DbErr> {
    invoices::Entity::find_by_id(invoice_id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
}

/// Σ allocations applied to one invoice.
pub(crate) async fn allocated_to_invoice<C: ConnectionTrait>(
    conn: &C,
    invoice_id: InvoiceId,
) -> Result<Decimal, DbErr> {
    let sum: Option<Option<Decimal>> = allocations::Entity::find()
        .filter(allocations::Column::InvoiceId.eq(invoice_id.into_inner()))
        .select_only()
        .column_as(allocations::Column::AmountApplied.sum(), "allocated")
        .into_tuple()
        .one(conn)
        .await?;
    Ok(round_currency(sum.flatten().unwrap_or(Decimal::ZERO)))
}

/// Σ allocations grouped by invoice. `None` scans every invoice.
pub(crate) async fn allocation_sums<C: ConnectionTrait>(
    conn: &C,
    invoice_ids: Option<Vec<Uuid>>,
) -> Result<HashMap<Uuid, Decimal>, DbErr> {
    let mut query = allocations::Entity::find()
        .filter(allocations::Column::InvoiceId.is_not_null());
    if let Some(ids) = invoice_ids {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        query = query.filter(allocations::Column::InvoiceId.is_in(ids));
    }

    let rows: Vec<(Uuid, Option<Decimal>)> = query
        .select_only()
        .column(allocations::Column::InvoiceId)
        .column_as(allocations::Column::AmountApplied.sum(), "allocated")
        .group_by(allocations::Column::InvoiceId)
        .into_tuple()
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(id, sum)| (id, round_currency(sum.unwrap_or(Decimal::ZERO))))
        .collect())
}

/// Locks the invoice and returns the row with a fresh snapshot.
pub(crate) async fn locked_snapshot<C: ConnectionTrait>(
    conn: &C,
    invoice_id: InvoiceId,
    source: SettlementSource,
) -> Result<Option<(invoices::Model, InvoiceSnapshot)>, DbErr> {
    let Some(model) = lock_invoice(conn, invoice_id).await? else {
        return Ok(None);
    };
    let allocated = allocated_to_invoice(conn, invoice_id).await?;
    let snapshot = to_snapshot(&model, allocated, source);
    Ok(Some((model, snapshot)))
}

/// Applies a payment to an invoice the caller already locked.
///
/// The cached column is rewritten from the resolved settled amount, so a
/// drifted cache heals on the next payment.
pub(crate) async fn apply_to_locked<C: ConnectionTrait>(
    conn: &C,
    model: invoices::Model,
    snapshot: &InvoiceSnapshot,
    client_id: ClientId,
    amount: Decimal,
) -> Result<Decimal, InvoiceTrackerError> {
    let remaining = check_apply(snapshot, client_id, amount)?;
    let mut active: invoices::ActiveModel = model.into();
    active.amount_settled = Set(settle(snapshot.settled, amount));
    active.update(conn).await?;
    Ok(remaining)
}

/// Locks an invoice, checks the payment and increments its settled amount.
///
/// Returns the outstanding balance left after the payment.
///
/// # Errors
///
/// Returns `InvoiceNotFound`, `InvoiceNotOwnedByClient`,
/// `InvoiceNotConfirmed` or `OverpaymentRejected`.
pub async fn apply_payment<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
    invoice_id: InvoiceId,
    amount: Decimal,
    source: SettlementSource,
) -> Result<Decimal, InvoiceTrackerError> {
    let (model, snapshot) = locked_snapshot(conn, invoice_id, source)
        .await?
        .ok_or(InvoiceError::NotFound(invoice_id))?;
    apply_to_locked(conn, model, &snapshot, client_id, amount).await
}

/// Locks an invoice and takes a payment back off its settled amount,
/// clamped at zero. A missing invoice is skipped.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn reverse_payment<C: ConnectionTrait>(
    conn: &C,
    invoice_id: InvoiceId,
    amount: Decimal,
) -> Result<RestoredInvoice, DbErr> {
    let Some(model) = lock_invoice(conn, invoice_id).await? else {
        warn!(invoice_id = %invoice_id, "Reversal skipped missing invoice");
        return Ok(RestoredInvoice {
            invoice_id,
            amount,
            skipped: true,
        });
    };

    let settled = unsettle(model.amount_settled, amount);
    let mut active: invoices::ActiveModel = model.into();
    active.amount_settled = Set(settled);
    active.update(conn).await?;

    Ok(RestoredInvoice {
        invoice_id,
        amount,
        skipped: false,
    })
}

/// Invoice repository for confirmation, voiding and settlement maintenance.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    db: DatabaseConnection,
    settlement_source: SettlementSource,
}

impl InvoiceRepository {
    /// Creates a new invoice repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settlement_source: SettlementSource) -> Self {
        Self {
            db,
            settlement_source,
        }
    }

    /// Confirms an invoice.
    ///
    /// Receivable kinds get their debt ledger entry. An upfront amount on a
    /// partial-upfront invoice is recorded as a collection explicitly
    /// allocated to the invoice, in the same transaction. Resubmitting an
    /// existing id returns the stored invoice; the boolean is false then.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `ClientNotFound`, `SellerNotFound` or
    /// `IdConflict` when the id belongs to another client's invoice.
    pub async fn confirm_invoice(
        &self,
        input: NewInvoice,
    ) -> Result<(InvoiceView, bool), InvoiceTrackerError> {
        let input = input.validate()?;
        let uow = self.db.unit_of_work().await?;
        let txn = uow.transaction();

        if let Some(id) = input.id
            && let Some(existing) = invoices::Entity::find_by_id(id.into_inner()).one(txn).await?
        {
            if existing.client_id != input.client_id.into_inner() || existing.total != input.total
            {
                return Err(InvoiceTrackerError::IdConflict(id));
            }
            let allocated = allocated_to_invoice(txn, id).await?;
            uow.commit().await?;
            info!(invoice_id = %id, "Invoice confirmation retried");
            return Ok((
                InvoiceView::new(existing, allocated, self.settlement_source),
                false,
            ));
        }

        find_client(txn, input.client_id)
            .await?
            .ok_or(InvoiceTrackerError::ClientNotFound(input.client_id))?;
        if let Some(seller_id) = input.seller_id
            && !seller_exists(txn, seller_id).await?
        {
            return Err(InvoiceTrackerError::SellerNotFound(seller_id));
        }

        let invoice_id = input.id.unwrap_or_else(InvoiceId::new);
        let model = invoices::ActiveModel {
            id: Set(invoice_id.into_inner()),
            client_id: Set(input.client_id.into_inner()),
            seller_id: Set(input.seller_id.map(SellerId::into_inner)),
            number: Set(input.number.clone()),
            invoice_date: Set(input.date),
            total: Set(input.total),
            amount_settled: Set(Decimal::ZERO),
            kind: Set(DbInvoiceKind::from(input.kind)),
            state: Set(DbInvoiceState::Confirmed),
            created_at: Set(Utc::now().into()),
        };
        model.insert(txn).await.map_err(|err| match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_)) => {
                InvoiceTrackerError::IdConflict(invoice_id)
            }
            _ => err.into(),
        })?;

        if input.creates_debt() {
            ledger::find_or_create(
                txn,
                NewLedgerEntry::for_invoice(input.client_id, invoice_id, input.date, input.total),
            )
            .await?;
        }

        if let Some(upfront) = input.upfront_amount {
            let request = ExplicitRequest::group(
                upfront,
                vec![AllocationLine {
                    target: AllocationTarget::Invoice(invoice_id),
                    amount: upfront,
                }],
            )
            .map_err(|e| InvoiceTrackerError::Upfront(Box::new(e.into())))?;
            let collection = ValidatedCollection {
                client_id: input.client_id,
                seller_id: input.seller_id,
                date: input.date,
                total_collected: upfront,
                notes: Some(format!("Upfront payment on invoice {invoice_id}")),
                mode: AllocationMode::Explicit(request),
            };
            record_collection(txn, collection, self.settlement_source)
                .await
                .map_err(|e| InvoiceTrackerError::Upfront(Box::new(e)))?;
        }

        let stored = invoices::Entity::find_by_id(invoice_id.into_inner())
            .one(txn)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;
        let allocated = allocated_to_invoice(txn, invoice_id).await?;
        uow.commit().await?;

        info!(
            invoice_id = %invoice_id,
            client_id = %input.client_id,
            total = %input.total,
            kind = ?input.kind,
            "Invoice confirmed"
        );
        Ok((
            InvoiceView::new(stored, allocated, self.settlement_source),
            true,
        ))
    }

    /// Voids a confirmed invoice and removes its debt entry.
    ///
    /// Voiding an already voided invoice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceNotFound`, or `InvoiceHasAllocations` while payments
    /// are still applied.
    pub async fn void_invoice(&self, invoice_id: InvoiceId) -> Result<InvoiceView, InvoiceTrackerError> {
        let uow = self.db.unit_of_work().await?;
        let txn = uow.transaction();

        let (model, snapshot) = locked_snapshot(txn, invoice_id, self.settlement_source)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;
        let allocated = allocated_to_invoice(txn, invoice_id).await?;

        if check_void(&snapshot)? == VoidOutcome::AlreadyVoided {
            uow.commit().await?;
            return Ok(InvoiceView::new(model, allocated, self.settlement_source));
        }

        let mut active: invoices::ActiveModel = model.into();
        active.state = Set(DbInvoiceState::Voided);
        let voided = active.update(txn).await?;
        let removed =
            ledger::remove_entries_for_origin(txn, OriginKind::Invoice, invoice_id.into_inner())
                .await?;
        uow.commit().await?;

        info!(
            invoice_id = %invoice_id,
            ledger_entries_removed = removed,
            "Invoice voided"
        );
        Ok(InvoiceView::new(voided, allocated, self.settlement_source))
    }

    /// Gets an invoice with its settlement.
    ///
    /// # Errors
    ///
    /// Returns `InvoiceNotFound` for an unknown id.
    pub async fn get_invoice(&self, invoice_id: InvoiceId) -> Result<InvoiceView, InvoiceTrackerError> {
        let model = invoices::Entity::find_by_id(invoice_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(InvoiceError::NotFound(invoice_id))?;
        let allocated = allocated_to_invoice(&self.db, invoice_id).await?;
        Ok(InvoiceView::new(model, allocated, self.settlement_source))
    }

    /// Reports invoices whose cached settled column differs from their
    /// allocations and, unless `dry_run`, rewrites the column from the
    /// allocation sums.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn rebuild_settled_amounts(
        &self,
        dry_run: bool,
    ) -> Result<Vec<SettlementDrift>, InvoiceTrackerError> {
        let uow = self.db.unit_of_work().await?;
        let txn = uow.transaction();

        let mut query = invoices::Entity::find()
            .order_by_asc(invoices::Column::InvoiceDate)
            .order_by_asc(invoices::Column::Id);
        if !dry_run {
            query = query.lock_exclusive();
        }
        let models = query.all(txn).await?;
        let sums = allocation_sums(txn, None).await?;

        let rows: Vec<InvoiceDebtRow> = models
            .iter()
            .map(|m| InvoiceDebtRow {
                invoice_id: InvoiceId::from_uuid(m.id),
                client_id: ClientId::from_uuid(m.client_id),
                date: m.invoice_date,
                total: m.total,
                cached_settled: m.amount_settled,
                allocated: sums.get(&m.id).copied().unwrap_or(Decimal::ZERO),
            })
            .collect();
        let drift = detect_drift(&rows);

        if dry_run {
            uow.rollback().await?;
            info!(drifted = drift.len(), "Settlement drift report (dry run)");
            return Ok(drift);
        }

        let by_id: HashMap<Uuid, invoices::Model> =
            models.into_iter().map(|m| (m.id, m)).collect();
        for item in &drift {
            if let Some(model) = by_id.get(&item.invoice_id.into_inner()) {
                let mut active: invoices::ActiveModel = model.clone().into();
                active.amount_settled = Set(round_currency(item.allocated));
                active.update(txn).await?;
                warn!(
                    invoice_id = %item.invoice_id,
                    cached = %item.cached,
                    allocated = %item.allocated,
                    "Cached settled amount rewritten"
                );
            }
        }
        uow.commit().await?;

        info!(rewritten = drift.len(), "Settlement column rebuilt from allocations");
        Ok(drift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn model(total: Decimal, cached: Decimal) -> invoices::Model {
        invoices::Model {
            id: Uuid::now_v7(),
            client_id: Uuid::now_v7(),
            seller_id: None,
            number: None,
            invoice_date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            total,
            amount_settled: cached,
            kind: DbInvoiceKind::OnCredit,
            state: DbInvoiceState::Confirmed,
            created_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_snapshot_uses_allocations_by_default() {
        let snapshot = to_snapshot(&model(dec!(100), dec!(80)), dec!(30), SettlementSource::Allocations);
        assert_eq!(snapshot.settled, dec!(30));
        assert_eq!(snapshot.outstanding(), dec!(70));
    }

    #[test]
    fn test_snapshot_legacy_max_takes_larger_value() {
        let snapshot = to_snapshot(&model(dec!(100), dec!(80)), dec!(30), SettlementSource::LegacyMax);
        assert_eq!(snapshot.settled, dec!(80));
        assert_eq!(snapshot.outstanding(), dec!(20));
    }

    #[test]
    fn test_view_reports_outstanding() {
        let view = InvoiceView::new(model(dec!(50), dec!(20)), dec!(20), SettlementSource::Allocations);
        assert_eq!(view.settled, dec!(20));
        assert_eq!(view.outstanding, dec!(30));
    }

    #[test]
    fn test_error_classification() {
        let conflict = InvoiceTrackerError::IdConflict(InvoiceId::new());
        assert_eq!(conflict.classify().status_code(), 409);

        let missing = InvoiceTrackerError::Invoice(InvoiceError::NotFound(InvoiceId::new()));
        assert_eq!(missing.classify().status_code(), 404);
        assert_eq!(missing.error_code(), "INVOICE_NOT_FOUND");

        let over = InvoiceTrackerError::Invoice(InvoiceError::OverpaymentRejected {
            invoice_id: InvoiceId::new(),
            requested: dec!(10),
            outstanding: dec!(5),
        });
        assert_eq!(over.classify().status_code(), 400);
    }
}
