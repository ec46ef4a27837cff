//! Prior balance repository: legacy debt loaded at go-live.
//!
//! A load is a `PriorBalance` ledger entry with its own id as origin. The
//! pending amount is the loaded total minus what collections already
//! allocated to legacy debt; every write takes the client row lock first.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, QueryFilter,
    QuerySelect, RelationTrait,
};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use ardesk_core::ledger::{LedgerError, NewLedgerEntry, OriginKind};
use ardesk_core::prior_balance::{NewPriorBalance, PriorBalancePosition, validate_bulk};
use ardesk_shared::types::{ClientId, PriorBalanceId, round_currency};
use ardesk_shared::{AppError, DomainError};

use super::client::lock_client;
use super::ledger::{self, LedgerStoreError};
use crate::entities::{
    allocations, collections, ledger_entries,
    sea_orm_active_enums::{AllocationTarget, OriginKind as DbOriginKind},
};
use crate::unit_of_work::UnitOfWorkExt;

/// Error types for prior balance operations.
#[derive(Debug, thiserror::Error)]
pub enum PriorBalanceError {
    /// Input or removal rule violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Ledger write failed.
    #[error(transparent)]
    Store(#[from] LedgerStoreError),

    /// Client not found.
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// A bulk item names an unknown client.
    #[error("Item {index}: client not found: {client_id}")]
    BulkClientNotFound {
        /// Position in the request.
        index: usize,
        /// The unknown client.
        client_id: ClientId,
    },

    /// Prior balance not found.
    #[error("Prior balance not found: {0}")]
    NotFound(PriorBalanceId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl DomainError for PriorBalanceError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => DomainError::error_code(e),
            Self::Store(e) => e.error_code(),
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::BulkClientNotFound { .. } => "INVALID_BULK_ITEM",
            Self::NotFound(_) => "PRIOR_BALANCE_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn classify(&self) -> AppError {
        match self {
            Self::Ledger(e) => e.classify(),
            Self::Store(e) => e.classify(),
            Self::ClientNotFound(_) | Self::NotFound(_) => AppError::NotFound(self.to_string()),
            Self::BulkClientNotFound { .. } => AppError::Validation(self.to_string()),
            Self::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

impl From<PriorBalanceError> for AppError {
    fn from(err: PriorBalanceError) -> Self {
        err.classify()
    }
}

/// A stored legacy debt load.
#[derive(Debug, Clone, Serialize)]
pub struct PriorBalanceRecord {
    /// Load id, the ledger entry's origin id.
    pub prior_balance_id: PriorBalanceId,
    /// Owing client.
    pub client_id: ClientId,
    /// Amount loaded.
    pub amount: Decimal,
    /// Business date.
    pub date: NaiveDate,
    /// Statement text.
    pub description: String,
    /// Underlying ledger row.
    pub ledger_entry_id: Uuid,
}

impl PriorBalanceRecord {
    fn from_entry(entry: ledger_entries::Model) -> Option<Self> {
        Some(Self {
            prior_balance_id: PriorBalanceId::from_uuid(entry.origin_id?),
            client_id: ClientId::from_uuid(entry.client_id),
            amount: entry.amount,
            date: entry.entry_date,
            description: entry.description,
            ledger_entry_id: entry.id,
        })
    }
}

/// Σ legacy debt loaded and Σ allocated to it for one client.
pub(crate) async fn prior_position<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
) -> Result<PriorBalancePosition, DbErr> {
    let loaded: Option<Option<Decimal>> = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::ClientId.eq(client_id.into_inner()))
        .filter(ledger_entries::Column::OriginKind.eq(DbOriginKind::PriorBalance))
        .select_only()
        .column_as(ledger_entries::Column::Amount.sum(), "loaded")
        .into_tuple()
        .one(conn)
        .await?;

    let allocated: Option<Option<Decimal>> = allocations::Entity::find()
        .join(JoinType::InnerJoin, allocations::Relation::Collections.def())
        .filter(collections::Column::ClientId.eq(client_id.into_inner()))
        .filter(allocations::Column::AppliesTo.eq(AllocationTarget::PriorBalance))
        .select_only()
        .column_as(allocations::Column::AmountApplied.sum(), "allocated")
        .into_tuple()
        .one(conn)
        .await?;

    Ok(PriorBalancePosition {
        loaded: round_currency(loaded.flatten().unwrap_or(Decimal::ZERO)),
        allocated: round_currency(allocated.flatten().unwrap_or(Decimal::ZERO)),
    })
}

/// Legacy debt positions of every client that ever had a load.
pub(crate) async fn prior_positions<C: ConnectionTrait>(
    conn: &C,
) -> Result<HashMap<ClientId, PriorBalancePosition>, DbErr> {
    let loaded: Vec<(Uuid, Option<Decimal>)> = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::OriginKind.eq(DbOriginKind::PriorBalance))
        .select_only()
        .column(ledger_entries::Column::ClientId)
        .column_as(ledger_entries::Column::Amount.sum(), "loaded")
        .group_by(ledger_entries::Column::ClientId)
        .into_tuple()
        .all(conn)
        .await?;

    let allocated: Vec<(Uuid, Option<Decimal>)> = allocations::Entity::find()
        .join(JoinType::InnerJoin, allocations::Relation::Collections.def())
        .filter(allocations::Column::AppliesTo.eq(AllocationTarget::PriorBalance))
        .select_only()
        .column(collections::Column::ClientId)
        .column_as(allocations::Column::AmountApplied.sum(), "allocated")
        .group_by(collections::Column::ClientId)
        .into_tuple()
        .all(conn)
        .await?;

    let mut positions: HashMap<ClientId, PriorBalancePosition> = HashMap::new();
    for (client, sum) in loaded {
        positions.entry(ClientId::from_uuid(client)).or_default().loaded =
            round_currency(sum.unwrap_or(Decimal::ZERO));
    }
    for (client, sum) in allocated {
        positions.entry(ClientId::from_uuid(client)).or_default().allocated =
            round_currency(sum.unwrap_or(Decimal::ZERO));
    }
    Ok(positions)
}

/// Prior balance repository.
#[derive(Debug, Clone)]
pub struct PriorBalanceRepository {
    db: DatabaseConnection,
}

impl PriorBalanceRepository {
    /// Creates a new prior balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Loads legacy debt for one client. The date defaults to `today`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a non-positive amount, or
    /// `ClientNotFound`.
    pub async fn load(
        &self,
        input: NewPriorBalance,
        today: NaiveDate,
    ) -> Result<PriorBalanceRecord, PriorBalanceError> {
        let input = input.validate()?;
        let uow = self.db.unit_of_work().await?;
        let txn = uow.transaction();

        lock_client(txn, input.client_id)
            .await?
            .ok_or(PriorBalanceError::ClientNotFound(input.client_id))?;
        let record = append_load(txn, input, today).await?;
        uow.commit().await?;

        info!(
            prior_balance_id = %record.prior_balance_id,
            client_id = %record.client_id,
            amount = %record.amount,
            "Prior balance loaded"
        );
        Ok(record)
    }

    /// Loads many legacy debts atomically.
    ///
    /// Client rows are locked in id order before any insert.
    ///
    /// # Errors
    ///
    /// Returns the first invalid item with its index; nothing is stored then.
    pub async fn load_bulk(
        &self,
        items: Vec<NewPriorBalance>,
        today: NaiveDate,
    ) -> Result<Vec<PriorBalanceRecord>, PriorBalanceError> {
        let items = validate_bulk(items)?;

        let mut first_index: BTreeMap<ClientId, usize> = BTreeMap::new();
        for (index, item) in items.iter().enumerate() {
            first_index.entry(item.client_id).or_insert(index);
        }

        let uow = self.db.unit_of_work().await?;
        let txn = uow.transaction();
        for (client_id, index) in &first_index {
            if lock_client(txn, *client_id).await?.is_none() {
                return Err(PriorBalanceError::BulkClientNotFound {
                    index: *index,
                    client_id: *client_id,
                });
            }
        }

        let mut records = Vec::with_capacity(items.len());
        for item in items {
            records.push(append_load(txn, item, today).await?);
        }
        uow.commit().await?;

        info!(
            loaded = records.len(),
            clients = first_index.len(),
            "Prior balances bulk loaded"
        );
        Ok(records)
    }

    /// Removes a load, provided the remaining legacy debt still covers what
    /// collections already allocated to it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, or `PriorBalanceInUse` when removal would leave
    /// allocations without debt behind them.
    pub async fn remove(
        &self,
        prior_balance_id: PriorBalanceId,
    ) -> Result<PriorBalanceRecord, PriorBalanceError> {
        let uow = self.db.unit_of_work().await?;
        let txn = uow.transaction();

        let entry = ledger::find_by_origin(txn, OriginKind::PriorBalance, prior_balance_id.into_inner())
            .await?
            .ok_or(PriorBalanceError::NotFound(prior_balance_id))?;
        let client_id = ClientId::from_uuid(entry.client_id);
        lock_client(txn, client_id)
            .await?
            .ok_or(PriorBalanceError::ClientNotFound(client_id))?;

        let position = prior_position(txn, client_id).await?;
        position.check_removal(prior_balance_id.into_inner(), entry.amount)?;
        ledger::remove_entries_for_origin(txn, OriginKind::PriorBalance, prior_balance_id.into_inner())
            .await?;
        uow.commit().await?;

        info!(
            prior_balance_id = %prior_balance_id,
            client_id = %client_id,
            amount = %entry.amount,
            "Prior balance removed"
        );
        PriorBalanceRecord::from_entry(entry).ok_or(PriorBalanceError::NotFound(prior_balance_id))
    }
}

async fn append_load<C: ConnectionTrait>(
    conn: &C,
    input: NewPriorBalance,
    today: NaiveDate,
) -> Result<PriorBalanceRecord, PriorBalanceError> {
    let prior_balance_id = PriorBalanceId::new();
    let entry = NewLedgerEntry::for_prior_balance(
        input.client_id,
        prior_balance_id,
        input.date.unwrap_or(today),
        input.amount,
        input.description,
    );
    let stored = ledger::append_entry(conn, entry).await?;
    PriorBalanceRecord::from_entry(stored).ok_or(PriorBalanceError::NotFound(prior_balance_id))
}
