//! Prior (legacy) balance routes.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use ardesk_core::prior_balance::NewPriorBalance;
use ardesk_db::PriorBalanceRepository;
use ardesk_shared::types::PriorBalanceId;

use crate::{
    AppState,
    error::{error_response, json_rejection, path_rejection},
};

/// Creates the prior balance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/prior-balances", post(load_prior_balance))
        .route("/prior-balances/bulk", post(load_prior_balances))
        .route("/prior-balances/{prior_balance_id}", delete(remove_prior_balance))
}

/// Request body for a bulk load.
#[derive(Debug, Deserialize)]
pub struct BulkPriorBalanceRequest {
    /// Loads, applied in order.
    pub items: Vec<NewPriorBalance>,
}

/// POST `/prior-balances` - Load legacy debt for one client.
async fn load_prior_balance(
    State(state): State<AppState>,
    payload: Result<Json<NewPriorBalance>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return json_rejection(&rejection),
    };

    let repo = PriorBalanceRepository::new((*state.db).clone());
    match repo.load(payload, state.today()).await {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/prior-balances/bulk` - Load many legacy debts atomically.
async fn load_prior_balances(
    State(state): State<AppState>,
    payload: Result<Json<BulkPriorBalanceRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return json_rejection(&rejection),
    };

    let repo = PriorBalanceRepository::new((*state.db).clone());
    match repo.load_bulk(payload.items, state.today()).await {
        Ok(records) => (
            StatusCode::CREATED,
            Json(json!({
                "loaded": records.len(),
                "prior_balances": records,
            })),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE `/prior-balances/{prior_balance_id}` - Remove an unused load.
async fn remove_prior_balance(
    State(state): State<AppState>,
    prior_balance_id: Result<Path<Uuid>, PathRejection>,
) -> impl IntoResponse {
    let Path(prior_balance_id) = match prior_balance_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };

    let repo = PriorBalanceRepository::new((*state.db).clone());
    match repo
        .remove(PriorBalanceId::from_uuid(prior_balance_id))
        .await
    {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(e) => error_response(&e),
    }
}
