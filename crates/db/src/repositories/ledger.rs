//! Ledger repository: the append-only record of signed client movements.
//!
//! The free functions take any `ConnectionTrait` so the collection, invoice
//! and prior-balance repositories can write ledger entries inside their own
//! unit of work. Entries are only ever removed by a reversal of the
//! originating document, in that same transaction.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use ardesk_core::ledger::{
    DateRange, LedgerError, LedgerMovement, NewLedgerEntry, OriginKind, Sign, StatementLine,
    balance, statement,
};
use ardesk_shared::types::{ClientId, LedgerEntryId, PageRequest, PageResponse};
use ardesk_shared::{AppError, DomainError};

use super::client::find_client;
use crate::entities::{ledger_entries, sea_orm_active_enums::OriginKind as DbOriginKind};
use crate::unit_of_work::UnitOfWorkExt;

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerStoreError {
    /// Domain rule violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Client not found.
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl DomainError for LedgerStoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => DomainError::error_code(e),
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn classify(&self) -> AppError {
        match self {
            Self::Ledger(e) => e.classify(),
            Self::ClientNotFound(_) => AppError::NotFound(self.to_string()),
            Self::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

impl From<LedgerStoreError> for AppError {
    fn from(err: LedgerStoreError) -> Self {
        err.classify()
    }
}

/// Input for a hand-posted movement.
#[derive(Debug, Clone, Deserialize)]
pub struct ManualMovementInput {
    /// Adjustment, credit note or debit note.
    pub origin_kind: OriginKind,
    /// Required for adjustments; must match for notes.
    #[serde(default)]
    pub sign: Option<Sign>,
    /// Business date.
    pub date: NaiveDate,
    /// Positive amount.
    pub amount: Decimal,
    /// Source document, if any.
    #[serde(default)]
    pub origin_id: Option<Uuid>,
    /// Statement text.
    #[serde(default)]
    pub description: Option<String>,
}

/// A client's ledger balance over an optional date range.
#[derive(Debug, Clone, Serialize)]
pub struct ClientBalance {
    /// The client.
    pub client_id: ClientId,
    /// Inclusive lower bound, if any.
    pub from: Option<NaiveDate>,
    /// Inclusive upper bound, if any.
    pub to: Option<NaiveDate>,
    /// Σ(sign × amount).
    pub balance: Decimal,
}

/// Converts a stored row to the movement it contributes.
///
/// # Errors
///
/// Returns an error if the stored sign is not ±1.
pub fn movement_of(entry: &ledger_entries::Model) -> Result<LedgerMovement, LedgerError> {
    Ok(LedgerMovement {
        date: entry.entry_date,
        sign: Sign::from_factor(entry.sign)?,
        amount: entry.amount,
    })
}

/// Inserts one ledger entry.
///
/// # Errors
///
/// Returns `DuplicateOrigin` if the `(origin_kind, origin_id)` pair is
/// already recorded, or a validation error for a malformed entry.
pub async fn append_entry<C: ConnectionTrait>(
    conn: &C,
    entry: NewLedgerEntry,
) -> Result<ledger_entries::Model, LedgerStoreError> {
    let entry = entry.validate()?;
    let kind = entry.origin_kind;
    let origin_id = entry.origin_id;

    let model = ledger_entries::ActiveModel {
        id: Set(LedgerEntryId::new().into_inner()),
        client_id: Set(entry.client_id.into_inner()),
        entry_date: Set(entry.date),
        sign: Set(entry.sign.factor()),
        amount: Set(entry.amount),
        origin_kind: Set(kind.into()),
        origin_id: Set(origin_id),
        description: Set(entry.description),
        created_at: Set(Utc::now().into()),
    };

    match model.insert(conn).await {
        Ok(inserted) => Ok(inserted),
        Err(err) => match (err.sql_err(), origin_id) {
            (Some(SqlErr::UniqueConstraintViolation(_)), Some(id)) => {
                Err(LedgerError::DuplicateOrigin { kind, id }.into())
            }
            _ => Err(err.into()),
        },
    }
}

/// Finds the entry recorded for an origin document.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub async fn find_by_origin<C: ConnectionTrait>(
    conn: &C,
    kind: OriginKind,
    origin_id: Uuid,
) -> Result<Option<ledger_entries::Model>, DbErr> {
    ledger_entries::Entity::find()
        .filter(ledger_entries::Column::OriginKind.eq(DbOriginKind::from(kind)))
        .filter(ledger_entries::Column::OriginId.eq(origin_id))
        .one(conn)
        .await
}

/// Returns the existing entry for the origin, or inserts a new one.
///
/// The boolean is true when a row was inserted. Used by retried invoice
/// confirmations.
///
/// # Errors
///
/// Returns an error if validation or the database operation fails.
pub async fn find_or_create<C: ConnectionTrait>(
    conn: &C,
    entry: NewLedgerEntry,
) -> Result<(ledger_entries::Model, bool), LedgerStoreError> {
    if let Some(origin_id) = entry.origin_id
        && let Some(existing) = find_by_origin(conn, entry.origin_kind, origin_id).await?
    {
        return Ok((existing, false));
    }
    let inserted = append_entry(conn, entry).await?;
    Ok((inserted, true))
}

/// Deletes the entries of a reversed document. Returns the number removed.
///
/// # Errors
///
/// Returns an error if the database operation fails.
pub async fn remove_entries_for_origin<C: ConnectionTrait>(
    conn: &C,
    kind: OriginKind,
    origin_id: Uuid,
) -> Result<u64, DbErr> {
    let result = ledger_entries::Entity::delete_many()
        .filter(ledger_entries::Column::OriginKind.eq(DbOriginKind::from(kind)))
        .filter(ledger_entries::Column::OriginId.eq(origin_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Σ(sign × amount) for a client, optionally restricted to a date range.
///
/// # Errors
///
/// Returns an error if the database query fails or a stored sign is invalid.
pub async fn balance_for<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
    range: &DateRange,
) -> Result<Decimal, LedgerStoreError> {
    let mut query = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::ClientId.eq(client_id.into_inner()));
    if let Some(from) = range.from {
        query = query.filter(ledger_entries::Column::EntryDate.gte(from));
    }
    if let Some(to) = range.to {
        query = query.filter(ledger_entries::Column::EntryDate.lte(to));
    }

    let rows: Vec<(NaiveDate, i16, Decimal)> = query
        .select_only()
        .column(ledger_entries::Column::EntryDate)
        .column(ledger_entries::Column::Sign)
        .column(ledger_entries::Column::Amount)
        .into_tuple()
        .all(conn)
        .await?;

    let movements = rows
        .into_iter()
        .map(|(date, sign, amount)| {
            Ok(LedgerMovement {
                date,
                sign: Sign::from_factor(sign)?,
                amount,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    Ok(balance(&movements))
}

/// Ledger repository for balance reads, statements and manual movements.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the client's balance over the range.
    ///
    /// # Errors
    ///
    /// Returns `ClientNotFound` for an unknown client.
    pub async fn client_balance(
        &self,
        client_id: ClientId,
        range: DateRange,
    ) -> Result<ClientBalance, LedgerStoreError> {
        find_client(&self.db, client_id)
            .await?
            .ok_or(LedgerStoreError::ClientNotFound(client_id))?;

        let balance = balance_for(&self.db, client_id, &range).await?;
        Ok(ClientBalance {
            client_id,
            from: range.from,
            to: range.to,
            balance,
        })
    }

    /// Lists a client's entries ordered by `(date, id)` with running balances.
    ///
    /// The running balance always starts from the first entry, so the whole
    /// ledger is folded before the page is cut.
    ///
    /// # Errors
    ///
    /// Returns `ClientNotFound` for an unknown client.
    pub async fn list_for_client(
        &self,
        client_id: ClientId,
        page: PageRequest,
    ) -> Result<PageResponse<StatementLine<ledger_entries::Model>>, LedgerStoreError> {
        find_client(&self.db, client_id)
            .await?
            .ok_or(LedgerStoreError::ClientNotFound(client_id))?;

        let entries = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::ClientId.eq(client_id.into_inner()))
            .order_by_asc(ledger_entries::Column::EntryDate)
            .order_by_asc(ledger_entries::Column::Id)
            .all(&self.db)
            .await?;

        let with_movements = entries
            .into_iter()
            .map(|e| movement_of(&e).map(|m| (e, m)))
            .collect::<Result<Vec<_>, LedgerError>>()?;

        let lines: Vec<_> = statement(with_movements, |(_, m)| *m)
            .into_iter()
            .map(|line| StatementLine {
                entry: line.entry.0,
                signed_amount: line.signed_amount,
                running_balance: line.running_balance,
            })
            .collect();
        let total = lines.len() as u64;
        Ok(PageResponse::new(
            page.slice(lines),
            page.page,
            page.per_page,
            total,
        ))
    }

    /// Posts an adjustment, credit note or debit note.
    ///
    /// # Errors
    ///
    /// Returns `ClientNotFound`, a validation error, or `DuplicateOrigin`
    /// when the source document already has an entry.
    pub async fn post_manual_movement(
        &self,
        client_id: ClientId,
        input: ManualMovementInput,
    ) -> Result<ledger_entries::Model, LedgerStoreError> {
        let entry = NewLedgerEntry::manual(
            client_id,
            input.origin_kind,
            input.sign,
            input.date,
            input.amount,
            input.origin_id,
            input
                .description
                .unwrap_or_else(|| input.origin_kind.to_string()),
        )?;

        let uow = self.db.unit_of_work().await?;
        find_client(uow.transaction(), client_id)
            .await?
            .ok_or(LedgerStoreError::ClientNotFound(client_id))?;
        let inserted = append_entry(uow.transaction(), entry).await?;
        uow.commit().await?;

        info!(
            client_id = %client_id,
            entry_id = %inserted.id,
            origin_kind = %input.origin_kind,
            amount = %inserted.amount,
            "Manual ledger movement posted"
        );
        Ok(inserted)
    }
}
