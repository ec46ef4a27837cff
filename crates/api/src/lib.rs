//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for collections, debts, prior balances and invoices
//! - JSON error responses mapped from domain errors
//! - Shared application state

pub mod error;
pub mod routes;

use axum::Router;
use chrono::{NaiveDate, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use ardesk_shared::config::LedgerConfig;
use ardesk_shared::types::PageRequest;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Receivables ledger settings.
    pub ledger: LedgerConfig,
}

impl AppState {
    /// Creates the state from a connection and ledger settings.
    #[must_use]
    pub fn new(db: DatabaseConnection, ledger: LedgerConfig) -> Self {
        Self {
            db: Arc::new(db),
            ledger,
        }
    }

    /// Normalises caller paging against the configured sizes.
    #[must_use]
    pub fn page(&self, page: Option<u32>, per_page: Option<u32>) -> PageRequest {
        PageRequest::new(
            page,
            per_page,
            self.ledger.default_page_size,
            self.ledger.max_page_size,
        )
    }

    /// Business date used for ageing.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
