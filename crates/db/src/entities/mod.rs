//! `SeaORM` entity definitions.

pub mod allocations;
pub mod clients;
pub mod collections;
pub mod invoices;
pub mod ledger_entries;
pub mod sea_orm_active_enums;
pub mod sellers;
