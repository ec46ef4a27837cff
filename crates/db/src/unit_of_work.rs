//! Unit of work: one database transaction per mutating operation.
//!
//! Every write the engine performs (ledger, invoice settlement, collection
//! header and allocations) goes through the transaction held here, so a
//! failure at any step leaves nothing behind.
//!
//! # Usage
//!
//! ```ignore
//! use ardesk_db::unit_of_work::UnitOfWorkExt;
//!
//! let uow = db.unit_of_work().await?;
//! let invoice = invoices::Entity::find_by_id(id).one(uow.transaction()).await?;
//! uow.commit().await?;
//! ```

use sea_orm::{
    AccessMode, DatabaseConnection, DatabaseTransaction, DbErr, IsolationLevel, TransactionTrait,
};

/// A transaction wrapper that rolls back unless explicitly committed.
///
/// Runs at READ COMMITTED; correctness comes from row locks taken with
/// `SELECT ... FOR UPDATE`, not from the isolation level.
pub struct UnitOfWork {
    txn: DatabaseTransaction,
}

impl UnitOfWork {
    /// Begins a new unit of work.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    pub async fn begin(db: &DatabaseConnection) -> Result<Self, DbErr> {
        let txn = db
            .begin_with_config(Some(IsolationLevel::ReadCommitted), Some(AccessMode::ReadWrite))
            .await?;
        Ok(Self { txn })
    }

    /// Returns the transaction every query of this unit must run on.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Commits all changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }

    /// Discards all changes.
    ///
    /// Dropping the unit without committing has the same effect.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback fails.
    pub async fn rollback(self) -> Result<(), DbErr> {
        self.txn.rollback().await
    }
}

/// Extension trait for `DatabaseConnection` to open units of work.
#[async_trait::async_trait]
pub trait UnitOfWorkExt {
    /// Begins a new unit of work on this connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    async fn unit_of_work(&self) -> Result<UnitOfWork, DbErr>;
}

#[async_trait::async_trait]
impl UnitOfWorkExt for DatabaseConnection {
    async fn unit_of_work(&self) -> Result<UnitOfWork, DbErr> {
        UnitOfWork::begin(self).await
    }
}
