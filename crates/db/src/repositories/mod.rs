//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Mutating operations each run in one unit of work.

mod client;
pub mod collection;
pub mod debt;
pub mod invoice;
pub mod ledger;
pub mod prior_balance;

pub use collection::{CollectionError, CollectionFilter, CollectionRepository, CollectionView};
pub use debt::{ClientDebtReport, DebtError, DebtRepository, DebtSummaryItem};
pub use invoice::{InvoiceRepository, InvoiceTrackerError, InvoiceView};
pub use ledger::{ClientBalance, LedgerRepository, LedgerStoreError, ManualMovementInput};
pub use prior_balance::{PriorBalanceError, PriorBalanceRecord, PriorBalanceRepository};
