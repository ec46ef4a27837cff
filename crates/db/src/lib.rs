//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions for the receivables schema
//! - Repositories that run the allocation engine under row locks
//! - Database migrations
//! - The unit-of-work transaction wrapper

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod unit_of_work;

pub use repositories::{
    CollectionRepository, DebtRepository, InvoiceRepository, LedgerRepository,
    PriorBalanceRepository,
};
pub use unit_of_work::{UnitOfWork, UnitOfWorkExt};

use std::time::Duration;

use ardesk_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a connection pool from the database configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .sqlx_logging(config.sqlx_logging);
    Database::connect(options).await
}

/// Connects with default pool settings.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_url(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}
