//! Collection (payment document) routes.

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

use ardesk_core::collection::NewCollection;
use ardesk_db::CollectionRepository;
use ardesk_db::repositories::CollectionFilter;
use ardesk_shared::types::{ClientId, CollectionId};

use crate::{
    AppState,
    error::{error_response, json_rejection, path_rejection, query_rejection, validation_response},
};

/// Creates the collection routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/collections", get(list_collections).post(create_collection))
        .route(
            "/collections/{collection_id}",
            get(get_collection).delete(delete_collection),
        )
}

/// Query parameters for listing collections.
#[derive(Debug, Deserialize)]
pub struct ListCollectionsQuery {
    /// Only this client's collections.
    pub client_id: Option<Uuid>,
    /// Collection date range start (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Collection date range end (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

fn repository(state: &AppState) -> CollectionRepository {
    CollectionRepository::new((*state.db).clone(), state.ledger.settlement_source)
}

/// GET `/collections` - List collections, newest first.
async fn list_collections(
    State(state): State<AppState>,
    query: Result<Query<ListCollectionsQuery>, QueryRejection>,
) -> impl IntoResponse {
    let Query(query) = match query {
        Ok(q) => q,
        Err(rejection) => return query_rejection(&rejection),
    };
    if let (Some(from), Some(to)) = (query.from, query.to)
        && from > to
    {
        return validation_response(format!("Date range start {from} is after end {to}"));
    }

    let filter = CollectionFilter {
        client_id: query.client_id.map(ClientId::from_uuid),
        from: query.from,
        to: query.to,
    };
    let page = state.page(query.page, query.per_page);

    match repository(&state).list_collections(filter, page).await {
        Ok(collections) => (StatusCode::OK, Json(collections)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/collections/{collection_id}` - Get a collection with its allocations.
async fn get_collection(
    State(state): State<AppState>,
    collection_id: Result<Path<Uuid>, PathRejection>,
) -> impl IntoResponse {
    let Path(collection_id) = match collection_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };

    match repository(&state)
        .get_collection(CollectionId::from_uuid(collection_id))
        .await
    {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST `/collections` - Record a payment and allocate it.
///
/// Without `allocations` the amount goes to open invoices oldest first and
/// any excess becomes unassigned credit.
async fn create_collection(
    State(state): State<AppState>,
    payload: Result<Json<NewCollection>, JsonRejection>,
) -> impl IntoResponse {
    let Json(payload) = match payload {
        Ok(p) => p,
        Err(rejection) => return json_rejection(&rejection),
    };

    match repository(&state).create_collection(payload).await {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE `/collections/{collection_id}` - Reverse a collection.
async fn delete_collection(
    State(state): State<AppState>,
    collection_id: Result<Path<Uuid>, PathRejection>,
) -> impl IntoResponse {
    let Path(collection_id) = match collection_id {
        Ok(p) => p,
        Err(rejection) => return path_rejection(&rejection),
    };

    match repository(&state)
        .delete_collection(CollectionId::from_uuid(collection_id))
        .await
    {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::test_support::{body_json, send};

    #[tokio::test]
    async fn test_create_rejects_non_positive_total() {
        let body = format!(
            r#"{{"client_id":"{}","date":"2026-05-01","total_collected":"0"}}"#,
            Uuid::now_v7()
        );
        let response = send("POST", "/api/v1/collections", Some(&body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "NON_POSITIVE_TOTAL");
    }

    #[tokio::test]
    async fn test_create_rejects_conflicting_target() {
        let body = format!(
            r#"{{"client_id":"{}","date":"2026-05-01","total_collected":"50",
                "allocations":[{{"invoice_id":"{}","amount":"10","applies_to":"prior_balance"}}]}}"#,
            Uuid::now_v7(),
            Uuid::now_v7()
        );
        let response = send("POST", "/api/v1/collections", Some(&body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_create_rejects_allocations_above_total() {
        let body = format!(
            r#"{{"client_id":"{}","date":"2026-05-01","total_collected":"50",
                "allocations":[{{"invoice_id":"{}","amount":"60"}}]}}"#,
            Uuid::now_v7(),
            Uuid::now_v7()
        );
        let response = send("POST", "/api/v1/collections", Some(&body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "ALLOCATION_EXCEEDS_COLLECTED");
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_body() {
        let response = send("POST", "/api/v1/collections", Some(r#"{"client_id":1}"#)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_get_rejects_bad_id() {
        let response = send("GET", "/api/v1/collections/not-a-uuid", None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_range() {
        let response = send(
            "GET",
            "/api/v1/collections?from=2026-05-10&to=2026-05-01",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_database_failure_is_generic() {
        let uri = format!("/api/v1/collections/{}", Uuid::now_v7());
        let response = send("GET", &uri, None).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["message"], "An error occurred");
    }
}
