//! Per-client routes: debt, ledger balance, statement and manual movements.

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use ardesk_core::ledger::DateRange;
use ardesk_db::repositories::{LedgerStoreError, ManualMovementInput};
use ardesk_db::{DebtRepository, LedgerRepository};
use ardesk_shared::types::ClientId;

use crate::{
    AppState,
    error::{error_response, json_rejection, path_rejection, query_rejection},
};

/// Creates the client routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clients/{client_id}/debt", get(client_debt))
        .route("/clients/{client_id}/balance", get(client_balance))
        .route("/clients/{client_id}/ledger", get(client_statement))
        .route(
            "/clients/{client_id}/ledger-entries",
            axum::routing::post(post_manual_movement),
        )
}

/// Query parameters for a balance.
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// First included date.
    pub from: Option<NaiveDate>,
    /// Last included date.
    pub to: Option<NaiveDate>,
}

/// Paging for the statement.
#[derive(Debug, Deserialize)]
pub struct StatementQuery {
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// GET `/clients/{client_id}/debt` - Outstanding debt with ageing.
async fn client_debt(
    State(state): State<AppState>,
    client_id: Result<Path<Uuid>, PathRejection>,
) -> impl IntoResponse {
    let Path(client_id) = match client_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };

    let repo = DebtRepository::new((*state.db).clone(), state.ledger.settlement_source);
    match repo
        .client_debt(ClientId::from_uuid(client_id), state.today())
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/clients/{client_id}/balance` - Ledger balance over a date range.
async fn client_balance(
    State(state): State<AppState>,
    client_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<BalanceQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Path(client_id) = match client_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return query_rejection(&rejection),
    };
    let range = match DateRange::new(query.from, query.to) {
        Ok(range) => range,
        Err(e) => return error_response(&LedgerStoreError::from(e)),
    };

    let repo = LedgerRepository::new((*state.db).clone());
    match repo
        .client_balance(ClientId::from_uuid(client_id), range)
        .await
    {
        Ok(balance) => (StatusCode::OK, Json(balance)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/clients/{client_id}/ledger` - Entries with running balance.
async fn client_statement(
    State(state): State<AppState>,
    client_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<StatementQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Path(client_id) = match client_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return query_rejection(&rejection),
    };

    let repo = LedgerRepository::new((*state.db).clone());
    let page = state.page(query.page, query.per_page);
    match repo
        .list_for_client(ClientId::from_uuid(client_id), page)
        .await
    {
        Ok(statement) => (StatusCode::OK, Json(statement)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/clients/{client_id}/ledger-entries` - Adjustment, credit or debit note.
async fn post_manual_movement(
    State(state): State<AppState>,
    client_id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<ManualMovementInput>, JsonRejection>,
) -> impl IntoResponse {
    let Path(client_id) = match client_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return json_rejection(&rejection),
    };

    let repo = LedgerRepository::new((*state.db).clone());
    match repo
        .post_manual_movement(ClientId::from_uuid(client_id), payload)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, send};

    #[tokio::test]
    async fn test_balance_rejects_inverted_range() {
        let uri = format!(
            "/api/v1/clients/{}/balance?from=2026-06-01&to=2026-05-01",
            Uuid::now_v7()
        );
        let response = send("GET", &uri, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "INVALID_DATE_RANGE");
    }

    #[tokio::test]
    async fn test_debt_rejects_bad_client_id() {
        let response = send("GET", "/api/v1/clients/42/debt", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_manual_movement_rejects_system_origin() {
        let uri = format!("/api/v1/clients/{}/ledger-entries", Uuid::now_v7());
        let body = r#"{"origin_kind":"collection","date":"2026-05-01","amount":"10"}"#;
        let response = send("POST", &uri, Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "NOT_MANUAL_ORIGIN");
    }

    #[tokio::test]
    async fn test_adjustment_requires_sign() {
        let uri = format!("/api/v1/clients/{}/ledger-entries", Uuid::now_v7());
        let body = r#"{"origin_kind":"adjustment","date":"2026-05-01","amount":"10"}"#;
        let response = send("POST", &uri, Some(body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "MISSING_SIGN");
    }
}
