//! API route definitions.

use axum::Router;

use crate::AppState;

pub mod clients;
pub mod collections;
pub mod debts;
pub mod health;
pub mod invoices;
pub mod prior_balances;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(collections::routes())
        .merge(clients::routes())
        .merge(prior_balances::routes())
        .merge(debts::routes())
        .merge(invoices::routes())
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::{
        Router,
        body::Body,
        http::{Request, Response},
    };
    use http_body_util::BodyExt;
    use sea_orm::DatabaseConnection;
    use tower::ServiceExt;

    use ardesk_shared::config::LedgerConfig;

    use crate::{AppState, create_router};

    /// Router over a connection that was never opened. Requests that reach
    /// the database fail with 500, so 400 and 404 answers prove the request
    /// was rejected at the boundary.
    pub fn app() -> Router {
        create_router(AppState::new(
            DatabaseConnection::Disconnected,
            LedgerConfig::default(),
        ))
    }

    pub async fn send(method: &str, uri: &str, body: Option<&str>) -> Response<Body> {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header("Content-Type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        app()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap()
    }

    pub async fn body_json(response: Response<Body>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }
}
