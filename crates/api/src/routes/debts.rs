//! System-wide debt summary.

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;

use ardesk_db::DebtRepository;

use crate::{
    AppState,
    error::{error_response, query_rejection},
};

/// Creates the debt routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/debts", get(debt_summary))
}

/// Paging for the summary.
#[derive(Debug, Deserialize)]
pub struct DebtSummaryQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// GET `/debts` - Clients with positive debt, largest first.
async fn debt_summary(
    State(state): State<AppState>,
    query: Result<Query<DebtSummaryQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return query_rejection(&rejection),
    };

    let repo = DebtRepository::new((*state.db).clone(), state.ledger.settlement_source);
    let page = state.page(query.page, query.per_page);
    match repo.summary(page, state.today()).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(&e),
    }
}
