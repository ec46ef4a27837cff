//! Debt query service.
//!
//! Read-only and lock-free. Rows are fetched with the query builder and
//! folded by the pure aggregation in `ardesk_core::debt`.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::Serialize;
use uuid::Uuid;

use ardesk_core::debt::{ClientDebt, DebtSummaryRow, InvoiceDebtRow, client_debt, summarize};
use ardesk_core::ledger::DateRange;
use ardesk_shared::config::SettlementSource;
use ardesk_shared::types::{ClientId, InvoiceId, PageRequest, PageResponse, round_currency};
use ardesk_shared::{AppError, DomainError};

use super::client::find_client;
use super::invoice::allocation_sums;
use super::ledger::{LedgerStoreError, balance_for};
use super::prior_balance::{prior_position, prior_positions};
use crate::entities::{
    allocations, clients, collections, invoices,
    sea_orm_active_enums::{AllocationTarget, InvoiceKind, InvoiceState},
};

/// Error types for debt queries.
#[derive(Debug, thiserror::Error)]
pub enum DebtError {
    /// Client not found.
    #[error("Client not found: {0}")]
    ClientNotFound(ClientId),

    /// Ledger read failed.
    #[error(transparent)]
    Ledger(#[from] LedgerStoreError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl DomainError for DebtError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ClientNotFound(_) => "CLIENT_NOT_FOUND",
            Self::Ledger(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    fn classify(&self) -> AppError {
        match self {
            Self::ClientNotFound(_) => AppError::NotFound(self.to_string()),
            Self::Ledger(e) => e.classify(),
            Self::Database(e) => AppError::Database(e.to_string()),
        }
    }
}

impl From<DebtError> for AppError {
    fn from(err: DebtError) -> Self {
        err.classify()
    }
}

/// Debt of one client plus identity and ledger figures.
#[derive(Debug, Clone, Serialize)]
pub struct ClientDebtReport {
    /// Client name.
    pub client_name: String,
    /// Σ(sign × amount) over the whole ledger.
    pub ledger_balance: Decimal,
    /// Aggregated debt.
    #[serde(flatten)]
    pub debt: ClientDebt,
}

/// One line of the system-wide summary.
#[derive(Debug, Clone, Serialize)]
pub struct DebtSummaryItem {
    /// Client name.
    pub client_name: String,
    /// Aggregated figures.
    #[serde(flatten)]
    pub row: DebtSummaryRow,
}

/// Confirmed receivable invoices with their cached and allocated settlement.
///
/// `None` loads every client.
pub(crate) async fn invoice_debt_rows<C: ConnectionTrait>(
    conn: &C,
    client_id: Option<ClientId>,
) -> Result<Vec<InvoiceDebtRow>, DbErr> {
    let mut query = invoices::Entity::find()
        .filter(invoices::Column::State.eq(InvoiceState::Confirmed))
        .filter(invoices::Column::Kind.ne(InvoiceKind::Cash));
    if let Some(client_id) = client_id {
        query = query.filter(invoices::Column::ClientId.eq(client_id.into_inner()));
    }

    let rows: Vec<(Uuid, Uuid, NaiveDate, Decimal, Decimal)> = query
        .select_only()
        .column(invoices::Column::Id)
        .column(invoices::Column::ClientId)
        .column(invoices::Column::InvoiceDate)
        .column(invoices::Column::Total)
        .column(invoices::Column::AmountSettled)
        .order_by_asc(invoices::Column::InvoiceDate)
        .order_by_asc(invoices::Column::Id)
        .into_tuple()
        .all(conn)
        .await?;

    let sums = match client_id {
        Some(_) => allocation_sums(conn, Some(rows.iter().map(|r| r.0).collect())).await?,
        None => allocation_sums(conn, None).await?,
    };

    Ok(rows
        .into_iter()
        .map(|(id, client, date, total, cached)| InvoiceDebtRow {
            invoice_id: InvoiceId::from_uuid(id),
            client_id: ClientId::from_uuid(client),
            date,
            total,
            cached_settled: cached,
            allocated: sums.get(&id).copied().unwrap_or(Decimal::ZERO),
        })
        .collect())
}

/// Σ unassigned credit banked by a client's collections.
pub(crate) async fn unassigned_credit<C: ConnectionTrait>(
    conn: &C,
    client_id: ClientId,
) -> Result<Decimal, DbErr> {
    let sum: Option<Option<Decimal>> = allocations::Entity::find()
        .join(JoinType::InnerJoin, allocations::Relation::Collections.def())
        .filter(collections::Column::ClientId.eq(client_id.into_inner()))
        .filter(allocations::Column::AppliesTo.eq(AllocationTarget::UnassignedCredit))
        .select_only()
        .column_as(allocations::Column::AmountApplied.sum(), "credit")
        .into_tuple()
        .one(conn)
        .await?;
    Ok(round_currency(sum.flatten().unwrap_or(Decimal::ZERO)))
}

/// Debt repository.
#[derive(Debug, Clone)]
pub struct DebtRepository {
    db: DatabaseConnection,
    settlement_source: SettlementSource,
}

impl DebtRepository {
    /// Creates a new debt repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, settlement_source: SettlementSource) -> Self {
        Self {
            db,
            settlement_source,
        }
    }

    /// Builds the debt view of one client as of `today`.
    ///
    /// # Errors
    ///
    /// Returns `ClientNotFound` for an unknown client.
    pub async fn client_debt(
        &self,
        client_id: ClientId,
        today: NaiveDate,
    ) -> Result<ClientDebtReport, DebtError> {
        let client = find_client(&self.db, client_id)
            .await?
            .ok_or(DebtError::ClientNotFound(client_id))?;

        let rows = invoice_debt_rows(&self.db, Some(client_id)).await?;
        let prior = prior_position(&self.db, client_id).await?;
        let credit = unassigned_credit(&self.db, client_id).await?;
        let ledger_balance = balance_for(&self.db, client_id, &DateRange::default()).await?;

        Ok(ClientDebtReport {
            client_name: client.name,
            ledger_balance,
            debt: client_debt(client_id, &rows, prior, credit, self.settlement_source, today),
        })
    }

    /// System-wide summary of clients with positive debt, largest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn summary(
        &self,
        page: PageRequest,
        today: NaiveDate,
    ) -> Result<PageResponse<DebtSummaryItem>, DebtError> {
        let rows = invoice_debt_rows(&self.db, None).await?;
        let prior = prior_positions(&self.db).await?;
        let summary = summarize(&rows, &prior, self.settlement_source, today);
        let total = summary.len() as u64;
        let page_rows = page.slice(summary);

        let ids: Vec<Uuid> = page_rows.iter().map(|r| r.client_id.into_inner()).collect();
        let names: HashMap<Uuid, String> = if ids.is_empty() {
            HashMap::new()
        } else {
            clients::Entity::find()
                .filter(clients::Column::Id.is_in(ids))
                .select_only()
                .column(clients::Column::Id)
                .column(clients::Column::Name)
                .into_tuple::<(Uuid, String)>()
                .all(&self.db)
                .await?
                .into_iter()
                .collect()
        };

        let data = page_rows
            .into_iter()
            .map(|row| DebtSummaryItem {
                client_name: names
                    .get(&row.client_id.into_inner())
                    .cloned()
                    .unwrap_or_default(),
                row,
            })
            .collect();
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }
}
