//! Invoice confirmation routes.
//!
//! Invoice lifecycle beyond confirmation and voiding lives in the sales
//! system; these endpoints only feed the receivables side.

use axum::{
    Json, Router,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use ardesk_core::invoice::NewInvoice;
use ardesk_db::InvoiceRepository;
use ardesk_shared::types::InvoiceId;

use crate::{
    AppState,
    error::{error_response, json_rejection, path_rejection},
};

/// Creates the invoice routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/invoices", post(confirm_invoice))
        .route("/invoices/{invoice_id}", get(get_invoice))
        .route("/invoices/{invoice_id}/void", post(void_invoice))
}

fn repository(state: &AppState) -> InvoiceRepository {
    InvoiceRepository::new((*state.db).clone(), state.ledger.settlement_source)
}

/// POST `/invoices` - Confirm an invoice.
///
/// Returns 201 on first confirmation and 200 when the same id is resubmitted.
async fn confirm_invoice(
    State(state): State<AppState>,
    payload: Result<Json<NewInvoice>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return json_rejection(&rejection),
    };

    match repository(&state).confirm_invoice(payload).await {
        Ok((view, true)) => (StatusCode::CREATED, Json(view)).into_response(),
        Ok((view, false)) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/invoices/{invoice_id}` - Invoice with its settlement.
async fn get_invoice(
    State(state): State<AppState>,
    invoice_id: Result<Path<Uuid>, PathRejection>,
) -> impl IntoResponse {
    let Path(invoice_id) = match invoice_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };

    match repository(&state)
        .get_invoice(InvoiceId::from_uuid(invoice_id))
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/invoices/{invoice_id}/void` - Void an invoice without payments.
async fn void_invoice(
    State(state): State<AppState>,
    invoice_id: Result<Path<Uuid>, PathRejection>,
) -> impl IntoResponse {
    let Path(invoice_id) = match invoice_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };

    match repository(&state)
        .void_invoice(InvoiceId::from_uuid(invoice_id))
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}
