//! Receivables schema.
//!
//! Creates the enums, the minimal client/seller identity tables, invoices,
//! collections, allocations and the ledger, with the CHECK constraints and
//! indexes the allocation engine relies on.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: ENUMS
        // ============================================================
        db.execute_unprepared(ENUMS_SQL).await?;

        // ============================================================
        // PART 2: IDENTITY TABLES
        // ============================================================
        db.execute_unprepared(CLIENTS_SQL).await?;
        db.execute_unprepared(SELLERS_SQL).await?;

        // ============================================================
        // PART 3: DOCUMENTS
        // ============================================================
        db.execute_unprepared(INVOICES_SQL).await?;
        db.execute_unprepared(COLLECTIONS_SQL).await?;
        db.execute_unprepared(ALLOCATIONS_SQL).await?;

        // ============================================================
        // PART 4: LEDGER
        // ============================================================
        db.execute_unprepared(LEDGER_ENTRIES_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const ENUMS_SQL: &str = r"
CREATE TYPE origin_kind AS ENUM (
    'invoice',
    'collection',
    'adjustment',
    'credit_note',
    'debit_note',
    'prior_balance'
);

CREATE TYPE invoice_kind AS ENUM ('cash', 'on_credit', 'partial_upfront');

CREATE TYPE invoice_state AS ENUM ('confirmed', 'voided');

CREATE TYPE allocation_target AS ENUM ('invoice', 'unassigned_credit', 'prior_balance');
";

const CLIENTS_SQL: &str = r"
CREATE TABLE clients (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const SELLERS_SQL: &str = r"
CREATE TABLE sellers (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);
";

const INVOICES_SQL: &str = r"
CREATE TABLE invoices (
    id UUID PRIMARY KEY,
    client_id UUID NOT NULL REFERENCES clients(id),
    seller_id UUID REFERENCES sellers(id),
    number VARCHAR(50),
    invoice_date DATE NOT NULL,
    total NUMERIC(14, 2) NOT NULL,
    amount_settled NUMERIC(14, 2) NOT NULL DEFAULT 0,
    kind invoice_kind NOT NULL,
    state invoice_state NOT NULL DEFAULT 'confirmed',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_invoice_total_non_negative CHECK (total >= 0),
    CONSTRAINT chk_invoice_settled_non_negative CHECK (amount_settled >= 0),
    CONSTRAINT chk_invoice_settled_within_total CHECK (amount_settled <= total + 0.01)
);

CREATE INDEX idx_invoices_client ON invoices(client_id);
CREATE INDEX idx_invoices_fifo ON invoices(client_id, state, invoice_date, id)
    WHERE kind <> 'cash';
";

const COLLECTIONS_SQL: &str = r"
CREATE TABLE collections (
    id UUID PRIMARY KEY,
    client_id UUID NOT NULL REFERENCES clients(id),
    seller_id UUID REFERENCES sellers(id),
    collection_date DATE NOT NULL,
    total_collected NUMERIC(14, 2) NOT NULL,
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_collection_total_positive CHECK (total_collected > 0)
);

CREATE INDEX idx_collections_client_date ON collections(client_id, collection_date);
";

const ALLOCATIONS_SQL: &str = r"
CREATE TABLE allocations (
    id UUID PRIMARY KEY,
    collection_id UUID NOT NULL REFERENCES collections(id),
    invoice_id UUID REFERENCES invoices(id),
    amount_applied NUMERIC(14, 2) NOT NULL,
    applies_to allocation_target NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_allocation_amount_positive CHECK (amount_applied > 0),
    CONSTRAINT chk_allocation_target CHECK (
        (invoice_id IS NOT NULL) = (applies_to = 'invoice')
    )
);

CREATE INDEX idx_allocations_collection ON allocations(collection_id);
CREATE INDEX idx_allocations_invoice ON allocations(invoice_id) WHERE invoice_id IS NOT NULL;
";

const LEDGER_ENTRIES_SQL: &str = r"
CREATE TABLE ledger_entries (
    id UUID PRIMARY KEY,
    client_id UUID NOT NULL REFERENCES clients(id),
    entry_date DATE NOT NULL,
    sign SMALLINT NOT NULL,
    amount NUMERIC(14, 2) NOT NULL,
    origin_kind origin_kind NOT NULL,
    origin_id UUID,
    description VARCHAR(500) NOT NULL DEFAULT '',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_ledger_sign CHECK (sign IN (-1, 1)),
    CONSTRAINT chk_ledger_amount_non_negative CHECK (amount >= 0)
);

CREATE UNIQUE INDEX uq_ledger_origin ON ledger_entries(origin_kind, origin_id)
    WHERE origin_id IS NOT NULL;
CREATE INDEX idx_ledger_client_date ON ledger_entries(client_id, entry_date, id);
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS ledger_entries;
DROP TABLE IF EXISTS allocations;
DROP TABLE IF EXISTS collections;
DROP TABLE IF EXISTS invoices;
DROP TABLE IF EXISTS sellers;
DROP TABLE IF EXISTS clients;
DROP TYPE IF EXISTS allocation_target;
DROP TYPE IF EXISTS invoice_state;
DROP TYPE IF EXISTS invoice_kind;
DROP TYPE IF EXISTS origin_kind;
";
