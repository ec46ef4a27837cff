//! Collection repository: runs the payment allocation engine.
//!
//! A collection is recorded in one unit of work: the planner decides where
//! the money goes, every touched invoice is locked and re-read before its
//! settled amount changes, then the header, its allocations and the ledger
//! entry are written. Deleting a collection undoes all of it in one unit.
//!
//! Lock order is client row first (only when legacy debt is involved), then
//! invoices in `(date, id)` order, for both FIFO and explicit requests.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use ardesk_core::allocation::{
    AllocationError, AllocationPlan, AppliesTo, ExplicitRequest, FifoAllocator, check_prior_balance,
};
use ardesk_core::collection::{AllocationMode, NewCollection, ReversalSummary, ValidatedCollection};
use ardesk_core::invoice::InvoiceError;
use ardesk_core::ledger::{NewLedgerEntry, OriginKind};
use ardesk_shared::config::SettlementSource;
use ardesk_shared::types::{
    AllocationId, ClientId, CollectionId, InvoiceId, PageRequest, PageResponse, SellerId,
    round_currency,
};
use ardesk_shared::{AppError, DomainError};

use super::client::{find_client, lock_client, seller_exists};
use super::invoice::{
    InvoiceTrackerError, allocation_sums, apply_payment, apply_to_locked, locked_snapshot,
    reverse_payment, to_snapshot,
};
use super::ledger::{self, LedgerStoreError};
use super::prior_balance::prior_position;
use crate::entities::{
    allocations, collections, invoices,
    sea_orm_active_enums::{AllocationTarget, InvoiceKind as DbInvoiceKind, InvoiceState as DbInvoiceState},
};
use crate::unit_of_work::UnitOfWorkExt;

/// Error types for collection operations.
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// Collection not found.
    #[error("Collection not found: {0}")]
    NotFound(CollectionId),

    /// Client not found.
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// Seller not found.
    #[error("Seller not found: {0}")]
    SellerNotFound(SellerId),

    /// Request or allocation rule violated.
    #[error(transparent)]
    Allocation(#[from] AllocationError),

    /// Invoice settlement failed.
    #[error(transparent)]
    Tracker(#[from] InvoiceTrackerError),

    /// Ledger write failed.
    #[error(transparent)]
    Ledger(#[from] LedgerStoreError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl DomainError for CollectionError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "COLLECTION_NOT_FOUND",
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::SellerNotFound(_) => "SELLER_NOT_FOUND",
            Self::Allocation(e) => DomainError::error_code(e),
            Self::Tracker(e) => e.error_code(),
            Self::Ledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn classify(&self) -> AppError {
        match self {
            Self::NotFound(_) | Self::ClientNotFound(_) | Self::SellerNotFound(_) => {
                AppError::NotFound(self.to_string())
            }
            Self::Allocation(e) => e.classify(),
            Self::Tracker(e) => e.classify(),
            Self::Ledger(e) => e.classify(),
            Self::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

impl From<CollectionError> for AppError {
    fn from(err: CollectionError) -> Self {
        err.classify()
    }
}

impl From<InvoiceError> for CollectionError {
    fn from(err: InvoiceError) -> Self {
        Self::Tracker(err.into())
    }
}

/// Filter options for listing collections.
#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionFilter {
    /// Only this client's collections.
    pub client_id: Option<ClientId>,
    /// Inclusive lower date bound.
    pub from: Option<NaiveDate>,
    /// Inclusive upper date bound.
    pub to: Option<NaiveDate>,
}

/// A collection with its allocations.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionView {
    /// The header row.
    #[serde(flatten)]
    pub collection: collections::Model,
    /// Allocations, in the order they were applied.
    pub allocations: Vec<allocations::Model>,
    /// Σ allocations to invoices.
    pub applied_to_invoices: Decimal,
    /// Σ allocations to legacy debt.
    pub applied_to_prior_balance: Decimal,
    /// Σ banked as unassigned credit.
    pub unassigned_credit: Decimal,
}

impl CollectionView {
    fn new(collection: collections::Model, allocations: Vec<allocations::Model>) -> Self {
        let sum_of = |target: AllocationTarget| {
            allocations
                .iter()
                .filter(|a| a.applies_to == target)
                .fold(Decimal::ZERO, |acc, a| round_currency(acc + a.amount_applied))
        };
        let applied_to_invoices = sum_of(AllocationTarget::Invoice);
        let applied_to_prior_balance = sum_of(AllocationTarget::PriorBalance);
        let unassigned_credit = sum_of(AllocationTarget::UnassignedCredit);
        Self {
            collection,
            allocations,
            applied_to_invoices,
            applied_to_prior_balance,
            unassigned_credit,
        }
    }
}

/// Records a validated collection inside the caller's transaction.
///
/// # Errors
///
/// Returns `ClientNotFound`, `SellerNotFound`, any invoice or allocation
/// rule violation, or a database error. The caller must roll back on error.
pub async fn record_collection<C: ConnectionTrait>(
    conn: &C,
    collection: ValidatedCollection,
    source: SettlementSource,
) -> Result<CollectionView, CollectionError> {
    let client_id = collection.client_id;
    let needs_client_lock = matches!(
        &collection.mode,
        AllocationMode::Explicit(request) if request.prior_balance() > Decimal::ZERO
    );
    let client = if needs_client_lock {
        lock_client(conn, client_id).await?
    } else {
        find_client(conn, client_id).await?
    };
    client.ok_or(CollectionError::ClientNotFound(client_id))?;

    if let Some(seller_id) = collection.seller_id
        && !seller_exists(conn, seller_id).await?
    {
        return Err(CollectionError::SellerNotFound(seller_id));
    }

    let plan = match collection.mode {
        AllocationMode::Fifo => {
            allocate_fifo(conn, client_id, collection.total_collected, source).await?
        }
        AllocationMode::Explicit(request) => {
            allocate_explicit(conn, client_id, request, source).await?
        }
    };

    let collection_id = CollectionId::new();
    let now = Utc::now().into();
    let header = collections::ActiveModel {
        id: Set(collection_id.into_inner()),
        client_id: Set(client_id.into_inner()),
        seller_id: Set(collection.seller_id.map(SellerId::into_inner)),
        collection_date: Set(collection.date),
        total_collected: Set(collection.total_collected),
        notes: Set(collection.notes),
        created_at: Set(now),
    }
    .insert(conn)
    .await?;

    let mut stored = Vec::with_capacity(plan.allocations.len());
    for planned in &plan.allocations {
        let row = allocations::ActiveModel {
            id: Set(AllocationId::new().into_inner()),
            collection_id: Set(collection_id.into_inner()),
            invoice_id: Set(planned.target.invoice_id().map(InvoiceId::into_inner)),
            amount_applied: Set(planned.amount),
            applies_to: Set(planned.target.applies_to().into()),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
        stored.push(row);
    }

    ledger::append_entry(
        conn,
        NewLedgerEntry::for_collection(
            client_id,
            collection_id,
            collection.date,
            collection.total_collected,
        ),
    )
    .await?;

    Ok(CollectionView::new(header, stored))
}

/// FIFO over the client's open receivable invoices.
///
/// Candidates are read without locks to find the scan order; each one is
/// then locked and re-read right before money is applied to it.
async fn allocate_fifo<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
    total: Decimal,
    source: SettlementSource,
) -> Result<AllocationPlan, CollectionError> {
    let candidates = invoices::Entity::find()
        .filter(invoices::Column::ClientId.eq(client_id.into_inner()))
        .filter(invoices::Column::State.eq(DbInvoiceState::Confirmed))
        .filter(invoices::Column::Kind.ne(DbInvoiceKind::Cash))
        .order_by_asc(invoices::Column::InvoiceDate)
        .order_by_asc(invoices::Column::Id)
        .all(conn)
        .await?;
    let sums = allocation_sums(conn, Some(candidates.iter().map(|i| i.id).collect())).await?;

    let mut allocator = FifoAllocator::new(total);
    for candidate in &candidates {
        if allocator.is_exhausted() {
            break;
        }
        let allocated = sums.get(&candidate.id).copied().unwrap_or(Decimal::ZERO);
        if !to_snapshot(candidate, allocated, source).is_open() {
            continue;
        }

        let invoice_id = InvoiceId::from_uuid(candidate.id);
        let Some((model, snapshot)) = locked_snapshot(conn, invoice_id, source).await? else {
            continue;
        };
        if let Some(take) = allocator.offer(&snapshot) {
            apply_to_locked(conn, model, &snapshot, client_id, take).await?;
        }
    }
    Ok(allocator.finish())
}

/// Explicit targets: legacy debt under the client lock, then invoices in
/// `(date, id)` order.
async fn allocate_explicit<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
    request: ExplicitRequest,
    source: SettlementSource,
) -> Result<AllocationPlan, CollectionError> {
    if request.prior_balance() > Decimal::ZERO {
        let position = prior_position(conn, client_id).await?;
        check_prior_balance(request.prior_balance(), position.pending())?;
    }

    let mut targets: Vec<(NaiveDate, InvoiceId, Decimal)> =
        Vec::with_capacity(request.invoices().len());
    for (invoice_id, amount) in request.invoices() {
        let invoice = invoices::Entity::find_by_id(invoice_id.into_inner())
            .one(conn)
            .await?
            .ok_or(InvoiceError::NotFound(*invoice_id))?;
        targets.push((invoice.invoice_date, *invoice_id, *amount));
    }
    targets.sort_by_key(|(date, id, _)| (*date, *id));

    let mut applied_order = Vec::with_capacity(targets.len());
    for (_, invoice_id, amount) in targets {
        apply_payment(conn, client_id, invoice_id, amount, source).await?;
        applied_order.push(invoice_id);
    }
    Ok(request.into_plan(&applied_order))
}

/// Collection repository.
#[derive(Debug, Clone)]
pub struct CollectionRepository {
    db: DatabaseConnection,
    settlement_source: SettlementSource,
}

impl CollectionRepository {
    /// Creates a new collection repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settlement_source: SettlementSource) -> Self {
        Self {
            db,
            settlement_source,
        }
    }

    /// Records a payment and allocates it, all or nothing.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a malformed request, `ClientNotFound`
    /// or `SellerNotFound`, `InvoiceNotFound` for an unknown explicit
    /// target, or a business rule violation (`OverpaymentRejected`,
    /// `AllocationExceedsTotal`, `ExceedsPriorBalance`, ...).
    pub async fn create_collection(
        &self,
        input: NewCollection,
    ) -> Result<CollectionView, CollectionError> {
        let collection = input.validate()?;
        let fifo = collection.mode == AllocationMode::Fifo;

        let uow = self.db.unit_of_work().await?;
        let view = record_collection(uow.transaction(), collection, self.settlement_source).await?;
        uow.commit().await?;

        info!(
            collection_id = %view.collection.id,
            client_id = %view.collection.client_id,
            total = %view.collection.total_collected,
            fifo,
            applied_to_invoices = %view.applied_to_invoices,
            unassigned_credit = %view.unassigned_credit,
            "Collection recorded"
        );
        Ok(view)
    }

    /// Reverses a collection: settled amounts go back down, allocations, the
    /// ledger entry and the header are deleted. Missing invoices are skipped.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown collection.
    pub async fn delete_collection(
        &self,
        collection_id: CollectionId,
    ) -> Result<ReversalSummary, CollectionError> {
        let uow = self.db.unit_of_work().await?;
        let txn = uow.transaction();

        let header = collections::Entity::find_by_id(collection_id.into_inner())
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(CollectionError::NotFound(collection_id))?;
        let mut rows = header
            .find_related(allocations::Entity)
            .order_by_asc(allocations::Column::Id)
            .all(txn)
            .await?;

        if rows.iter().any(|a| a.applies_to == AllocationTarget::PriorBalance) {
            lock_client(txn, ClientId::from_uuid(header.client_id)).await?;
        }

        // Same invoice lock order as recording: (date, id).
        let invoice_ids: Vec<Uuid> = rows.iter().filter_map(|a| a.invoice_id).collect();
        let dates: HashMap<Uuid, NaiveDate> = if invoice_ids.is_empty() {
            HashMap::new()
        } else {
            invoices::Entity::find()
                .filter(invoices::Column::Id.is_in(invoice_ids))
                .select_only()
                .column(invoices::Column::Id)
                .column(invoices::Column::InvoiceDate)
                .into_tuple::<(Uuid, NaiveDate)>()
                .all(txn)
                .await?
                .into_iter()
                .collect()
        };
        rows.sort_by_key(|a| (a.invoice_id.and_then(|id| dates.get(&id).copied()), a.invoice_id));

        let mut summary = ReversalSummary::new(collection_id);
        for row in &rows {
            match (AppliesTo::from(row.applies_to), row.invoice_id) {
                (AppliesTo::Invoice, Some(invoice_id)) => {
                    let restored =
                        reverse_payment(txn, InvoiceId::from_uuid(invoice_id), row.amount_applied)
                            .await?;
                    summary.restored_invoices.push(restored);
                }
                (AppliesTo::PriorBalance, _) => {
                    summary.prior_balance_released =
                        round_currency(summary.prior_balance_released + row.amount_applied);
                }
                _ => {
                    summary.credit_released =
                        round_currency(summary.credit_released + row.amount_applied);
                }
            }
        }

        allocations::Entity::delete_many()
            .filter(allocations::Column::CollectionId.eq(collection_id.into_inner()))
            .exec(txn)
            .await?;
        summary.ledger_entries_removed =
            ledger::remove_entries_for_origin(txn, OriginKind::Collection, collection_id.into_inner())
                .await?;
        collections::Entity::delete_by_id(collection_id.into_inner())
            .exec(txn)
            .await?;
        uow.commit().await?;

        info!(
            collection_id = %collection_id,
            restored = %summary.restored_total(),
            prior_balance_released = %summary.prior_balance_released,
            credit_released = %summary.credit_released,
            "Collection reversed"
        );
        Ok(summary)
    }

    /// Gets a collection with its allocations.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown collection.
    pub async fn get_collection(
        &self,
        collection_id: CollectionId,
    ) -> Result<CollectionView, CollectionError> {
        let header = collections::Entity::find_by_id(collection_id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(CollectionError::NotFound(collection_id))?;
        let rows = header
            .find_related(allocations::Entity)
            .order_by_asc(allocations::Column::Id)
            .all(&self.db)
            .await?;
        Ok(CollectionView::new(header, rows))
    }

    /// Lists collections, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_collections(
        &self,
        filter: CollectionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<CollectionView>, CollectionError> {
        let mut query = collections::Entity::find();
        if let Some(client_id) = filter.client_id {
            query = query.filter(collections::Column::ClientId.eq(client_id.into_inner()));
        }
        if let Some(from) = filter.from {
            query = query.filter(collections::Column::CollectionDate.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(collections::Column::CollectionDate.lte(to));
        }

        let total = query.clone().count(&self.db).await?;
        let headers = query
            .order_by_desc(collections::Column::CollectionDate)
            .order_by_desc(collections::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = headers.iter().map(|c| c.id).collect();
        let mut by_collection: HashMap<Uuid, Vec<allocations::Model>> = HashMap::new();
        if !ids.is_empty() {
            let rows = allocations::Entity::find()
                .filter(allocations::Column::CollectionId.is_in(ids))
                .order_by_asc(allocations::Column::Id)
                .all(&self.db)
                .await?;
            for row in rows {
                by_collection.entry(row.collection_id).or_default().push(row);
            }
        }

        let data = headers
            .into_iter()
            .map(|header| {
                let rows = by_collection.remove(&header.id).unwrap_or_default();
                CollectionView::new(header, rows)
            })
            .collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}
