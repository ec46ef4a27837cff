//! End-to-end receivables scenarios against PostgreSQL.
//!
//! Covers FIFO allocation, overshoot into credit, the legacy debt ceiling,
//! idempotent invoice confirmation, collection reversal and invoice voiding.

#![allow(clippy::uninlined_format_args)]

mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
};

use ardesk_core::allocation::{AllocationError, RawAllocation};
use ardesk_core::collection::NewCollection;
use ardesk_core::invoice::{InvoiceError, InvoiceKind, NewInvoice};
use ardesk_core::ledger::{DateRange, LedgerError, NewLedgerEntry, OriginKind, Sign};
use ardesk_core::prior_balance::NewPriorBalance;
use ardesk_db::entities::{
    invoices as invoice_rows, ledger_entries, sea_orm_active_enums::OriginKind as OriginColumn,
};
use ardesk_db::repositories::{
    self, CollectionError, InvoiceTrackerError, LedgerStoreError, ManualMovementInput,
    PriorBalanceError,
};
use ardesk_db::{
    CollectionRepository, DebtRepository, LedgerRepository, PriorBalanceRepository,
};
use ardesk_shared::config::SettlementSource;
use ardesk_shared::types::{ClientId, InvoiceId, PageRequest};

use common::{connect, create_client, create_seller, credit_invoice, date, invoices};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, 30).unwrap()
}

fn collections(db: &sea_orm::DatabaseConnection) -> CollectionRepository {
    CollectionRepository::new(db.clone(), SettlementSource::Allocations)
}

fn debts(db: &sea_orm::DatabaseConnection) -> DebtRepository {
    DebtRepository::new(db.clone(), SettlementSource::Allocations)
}

fn payment(client_id: ClientId, total: Decimal, allocations: Option<Vec<RawAllocation>>) -> NewCollection {
    NewCollection {
        client_id,
        seller_id: None,
        date: date(20),
        total_collected: total,
        notes: None,
        allocations,
    }
}

fn to_invoice(invoice_id: InvoiceId, amount: Decimal) -> RawAllocation {
    RawAllocation {
        invoice_id: Some(invoice_id),
        amount,
        applies_to: None,
    }
}

fn to_prior_balance(amount: Decimal) -> RawAllocation {
    RawAllocation {
        invoice_id: None,
        amount,
        applies_to: Some("prior_balance".to_string()),
    }
}

async fn ledger_balance(db: &sea_orm::DatabaseConnection, client_id: ClientId) -> Decimal {
    LedgerRepository::new(db.clone())
        .client_balance(client_id, DateRange::default())
        .await
        .expect("balance query failed")
        .balance
}

#[tokio::test]
async fn test_simple_fifo_settles_oldest_first() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let newer = credit_invoice(&db, client, 10, dec!(50)).await;
    let older = credit_invoice(&db, client, 5, dec!(100)).await;

    let view = collections(&db)
        .create_collection(payment(client, dec!(120), None))
        .await
        .expect("collection failed");

    assert_eq!(view.applied_to_invoices, dec!(120));
    assert_eq!(view.unassigned_credit, Decimal::ZERO);
    assert_eq!(view.allocations.len(), 2);
    assert_eq!(view.allocations[0].invoice_id, Some(older.invoice.id));
    assert_eq!(view.allocations[0].amount_applied, dec!(100));
    assert_eq!(view.allocations[1].invoice_id, Some(newer.invoice.id));
    assert_eq!(view.allocations[1].amount_applied, dec!(20));

    let older = invoices(&db)
        .get_invoice(InvoiceId::from_uuid(older.invoice.id))
        .await
        .unwrap();
    assert_eq!(older.outstanding, Decimal::ZERO);
    assert_eq!(older.invoice.amount_settled, dec!(100));

    let newer = invoices(&db)
        .get_invoice(InvoiceId::from_uuid(newer.invoice.id))
        .await
        .unwrap();
    assert_eq!(newer.outstanding, dec!(30));

    let debt = debts(&db).client_debt(client, today()).await.unwrap();
    assert_eq!(debt.debt.total_debt, dec!(30));
    assert_eq!(debt.ledger_balance, dec!(30));
    assert_eq!(debt.debt.open_invoices.len(), 1);
    assert_eq!(debt.debt.oldest_open_invoice, Some(date(10)));
}

#[tokio::test]
async fn test_overshoot_is_banked_as_credit() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    credit_invoice(&db, client, 1, dec!(100)).await;
    credit_invoice(&db, client, 2, dec!(50)).await;

    let view = collections(&db)
        .create_collection(payment(client, dec!(200), None))
        .await
        .expect("collection failed");

    assert_eq!(view.applied_to_invoices, dec!(150));
    assert_eq!(view.unassigned_credit, dec!(50));
    assert_eq!(view.allocations.len(), 3);

    let debt = debts(&db).client_debt(client, today()).await.unwrap();
    assert_eq!(debt.debt.total_debt, Decimal::ZERO);
    assert!(debt.debt.open_invoices.is_empty());
    assert_eq!(debt.debt.unassigned_credit, dec!(50));
    assert_eq!(debt.debt.days_overdue, 0);
    assert_eq!(debt.ledger_balance, dec!(-50));
}

#[tokio::test]
async fn test_payment_without_open_invoices_is_all_credit() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");

    let view = collections(&db)
        .create_collection(payment(client, dec!(75.5), None))
        .await
        .expect("collection failed");

    assert_eq!(view.allocations.len(), 1);
    assert_eq!(view.unassigned_credit, dec!(75.50));
}

#[tokio::test]
async fn test_explicit_prior_balance_is_capped() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    PriorBalanceRepository::new(db.clone())
        .load(
            NewPriorBalance {
                client_id: client,
                amount: dec!(500),
                date: None,
                description: None,
            },
            today(),
        )
        .await
        .expect("prior balance load failed");

    let err = collections(&db)
        .create_collection(payment(client, dec!(600), Some(vec![to_prior_balance(dec!(600))])))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CollectionError::Allocation(AllocationError::ExceedsPriorBalance { .. })
    ));

    collections(&db)
        .create_collection(payment(client, dec!(500), Some(vec![to_prior_balance(dec!(500))])))
        .await
        .expect("payment within the ceiling failed");

    let err = collections(&db)
        .create_collection(payment(client, dec!(1), Some(vec![to_prior_balance(dec!(1))])))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CollectionError::Allocation(AllocationError::ExceedsPriorBalance { .. })
    ));

    let debt = debts(&db).client_debt(client, today()).await.unwrap();
    assert_eq!(debt.debt.prior_balance_pending, Decimal::ZERO);
    assert_eq!(debt.debt.total_debt, Decimal::ZERO);
    assert_eq!(ledger_balance(&db, client).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_explicit_overpayment_rolls_back_everything() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let first = credit_invoice(&db, client, 1, dec!(40)).await;
    let second = credit_invoice(&db, client, 2, dec!(30)).await;

    let err = collections(&db)
        .create_collection(payment(
            client,
            dec!(100),
            Some(vec![
                to_invoice(InvoiceId::from_uuid(first.invoice.id), dec!(40)),
                to_invoice(InvoiceId::from_uuid(second.invoice.id), dec!(60)),
            ]),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CollectionError::Tracker(InvoiceTrackerError::Invoice(
            InvoiceError::OverpaymentRejected { .. }
        ))
    ));

    let first = invoices(&db)
        .get_invoice(InvoiceId::from_uuid(first.invoice.id))
        .await
        .unwrap();
    assert_eq!(first.invoice.amount_settled, Decimal::ZERO);
    assert_eq!(ledger_balance(&db, client).await, dec!(70));
}

#[tokio::test]
async fn test_explicit_rejects_foreign_and_missing_invoices() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let other = create_client(&db).await.expect("client setup failed");
    let foreign = credit_invoice(&db, other, 1, dec!(40)).await;

    let err = collections(&db)
        .create_collection(payment(
            client,
            dec!(10),
            Some(vec![to_invoice(InvoiceId::from_uuid(foreign.invoice.id), dec!(10))]),
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CollectionError::Tracker(InvoiceTrackerError::Invoice(
            InvoiceError::NotOwnedByClient { .. }
        ))
    ));

    let err = collections(&db)
        .create_collection(payment(client, dec!(10), Some(vec![to_invoice(InvoiceId::new(), dec!(10))])))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CollectionError::Tracker(InvoiceTrackerError::Invoice(InvoiceError::NotFound(_)))
    ));
}

#[tokio::test]
async fn test_unknown_client_and_seller_are_not_found() {
    let Some(db) = connect().await else { return };

    let err = collections(&db)
        .create_collection(payment(ClientId::new(), dec!(10), None))
        .await
        .unwrap_err();
    assert!(matches!(err, CollectionError::ClientNotFound(_)));

    let client = create_client(&db).await.expect("client setup failed");
    let mut input = payment(client, dec!(10), None);
    input.seller_id = Some(ardesk_shared::types::SellerId::new());
    let err = collections(&db).create_collection(input).await.unwrap_err();
    assert!(matches!(err, CollectionError::SellerNotFound(_)));

    let seller = create_seller(&db).await.expect("seller setup failed");
    let mut input = payment(client, dec!(10), None);
    input.seller_id = Some(seller);
    let view = collections(&db).create_collection(input).await.unwrap();
    assert_eq!(view.collection.seller_id, Some(seller.into_inner()));
}

#[tokio::test]
async fn test_invoice_confirmation_is_idempotent() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let input = NewInvoice {
        id: Some(InvoiceId::new()),
        client_id: client,
        seller_id: None,
        number: Some("F-0001".to_string()),
        date: date(3),
        total: dec!(80),
        kind: InvoiceKind::OnCredit,
        upfront_amount: None,
    };

    let (first, created) = invoices(&db).confirm_invoice(input.clone()).await.unwrap();
    assert!(created);
    let (second, created) = invoices(&db).confirm_invoice(input.clone()).await.unwrap();
    assert!(!created);
    assert_eq!(first.invoice.id, second.invoice.id);
    assert_eq!(ledger_balance(&db, client).await, dec!(80));

    let other = create_client(&db).await.expect("client setup failed");
    let mut clash = input;
    clash.client_id = other;
    let err = invoices(&db).confirm_invoice(clash).await.unwrap_err();
    assert!(matches!(err, InvoiceTrackerError::IdConflict(_)));
}

#[tokio::test]
async fn test_cash_invoice_creates_no_debt() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let (view, _) = invoices(&db)
        .confirm_invoice(NewInvoice {
            id: None,
            client_id: client,
            seller_id: None,
            number: None,
            date: date(3),
            total: dec!(80),
            kind: InvoiceKind::Cash,
            upfront_amount: None,
        })
        .await
        .unwrap();
    assert_eq!(view.invoice.amount_settled, Decimal::ZERO);
    assert_eq!(ledger_balance(&db, client).await, Decimal::ZERO);

    let err = collections(&db)
        .create_collection(payment(
            client,
            dec!(10),
            Some(vec![to_invoice(InvoiceId::from_uuid(view.invoice.id), dec!(10))]),
        ))
        .await
        .unwrap_err();
    assert_eq!(ardesk_shared::DomainError::classify(&err).status_code(), 400);
}

#[tokio::test]
async fn test_partial_upfront_records_a_collection() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let (view, _) = invoices(&db)
        .confirm_invoice(NewInvoice {
            id: None,
            client_id: client,
            seller_id: None,
            number: None,
            date: date(4),
            total: dec!(100),
            kind: InvoiceKind::PartialUpfront,
            upfront_amount: Some(dec!(40)),
        })
        .await
        .unwrap();

    assert_eq!(view.allocated, dec!(40));
    assert_eq!(view.outstanding, dec!(60));
    assert_eq!(ledger_balance(&db, client).await, dec!(60));

    let page = collections(&db)
        .list_collections(
            ardesk_db::repositories::CollectionFilter {
                client_id: Some(client),
                ..Default::default()
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.meta.total, 1);
    assert_eq!(page.data[0].applied_to_invoices, dec!(40));
}

#[tokio::test]
async fn test_reversal_restores_previous_state() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let invoice = credit_invoice(&db, client, 1, dec!(90)).await;
    let before = debts(&db).client_debt(client, today()).await.unwrap();

    let view = collections(&db)
        .create_collection(payment(client, dec!(120), None))
        .await
        .unwrap();
    let summary = collections(&db)
        .delete_collection(ardesk_shared::types::CollectionId::from_uuid(view.collection.id))
        .await
        .unwrap();

    assert_eq!(summary.restored_total(), dec!(90));
    assert_eq!(summary.credit_released, dec!(30));
    assert_eq!(summary.ledger_entries_removed, 1);

    let after = debts(&db).client_debt(client, today()).await.unwrap();
    assert_eq!(after.debt.total_debt, before.debt.total_debt);
    assert_eq!(after.ledger_balance, before.ledger_balance);
    assert_eq!(after.debt.unassigned_credit, Decimal::ZERO);

    let invoice = invoices(&db)
        .get_invoice(InvoiceId::from_uuid(invoice.invoice.id))
        .await
        .unwrap();
    assert_eq!(invoice.invoice.amount_settled, Decimal::ZERO);

    let err = collections(&db)
        .delete_collection(ardesk_shared::types::CollectionId::from_uuid(view.collection.id))
        .await
        .unwrap_err();
    assert!(matches!(err, CollectionError::NotFound(_)));
}

#[tokio::test]
async fn test_void_requires_reversed_payments() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let invoice = credit_invoice(&db, client, 1, dec!(60)).await;
    let invoice_id = InvoiceId::from_uuid(invoice.invoice.id);

    let view = collections(&db)
        .create_collection(payment(client, dec!(10), None))
        .await
        .unwrap();
    let err = invoices(&db).void_invoice(invoice_id).await.unwrap_err();
    assert!(matches!(
        err,
        InvoiceTrackerError::Invoice(InvoiceError::HasAllocations { .. })
    ));

    collections(&db)
        .delete_collection(ardesk_shared::types::CollectionId::from_uuid(view.collection.id))
        .await
        .unwrap();
    let voided = invoices(&db).void_invoice(invoice_id).await.unwrap();
    assert_eq!(voided.outstanding, dec!(60));
    assert_eq!(ledger_balance(&db, client).await, Decimal::ZERO);

    // Voiding twice is a no-op.
    invoices(&db).void_invoice(invoice_id).await.unwrap();
}

#[tokio::test]
async fn test_prior_balance_removal_respects_allocations() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let repo = PriorBalanceRepository::new(db.clone());
    let loaded = repo
        .load_bulk(
            vec![
                NewPriorBalance {
                    client_id: client,
                    amount: dec!(100),
                    date: Some(date(1)),
                    description: Some("Legacy A".to_string()),
                },
                NewPriorBalance {
                    client_id: client,
                    amount: dec!(50),
                    date: None,
                    description: None,
                },
            ],
            today(),
        )
        .await
        .unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[1].date, today());

    collections(&db)
        .create_collection(payment(client, dec!(120), Some(vec![to_prior_balance(dec!(120))])))
        .await
        .unwrap();

    let err = repo.remove(loaded[0].prior_balance_id).await.unwrap_err();
    assert!(matches!(
        err,
        PriorBalanceError::Ledger(LedgerError::PriorBalanceInUse { .. })
    ));

    let err = repo
        .load_bulk(
            vec![NewPriorBalance {
                client_id: ClientId::new(),
                amount: dec!(5),
                date: None,
                description: None,
            }],
            today(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PriorBalanceError::BulkClientNotFound { index: 0, .. }));
}

#[tokio::test]
async fn test_manual_movement_origin_is_unique() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let repo = LedgerRepository::new(db.clone());
    let note = ManualMovementInput {
        origin_kind: OriginKind::CreditNote,
        sign: None,
        date: date(2),
        amount: dec!(15),
        origin_id: Some(uuid::Uuid::now_v7()),
        description: None,
    };

    let entry = repo.post_manual_movement(client, note.clone()).await.unwrap();
    assert_eq!(entry.sign, Sign::Decrease.factor());

    let err = repo.post_manual_movement(client, note).await.unwrap_err();
    assert!(matches!(
        err,
        LedgerStoreError::Ledger(LedgerError::DuplicateOrigin { .. })
    ));

    let statement = repo
        .list_for_client(client, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(statement.meta.total, 1);
    assert_eq!(statement.data[0].running_balance, dec!(-15));
}

#[tokio::test]
async fn test_rebuild_rewrites_drifted_cache() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let invoice = credit_invoice(&db, client, 1, dec!(100)).await;
    collections(&db)
        .create_collection(payment(client, dec!(30), None))
        .await
        .unwrap();

    let stored = invoice_rows::Entity::find_by_id(invoice.invoice.id)
        .one(&db)
        .await
        .unwrap()
        .unwrap();
    let mut corrupt: invoice_rows::ActiveModel = stored.into();
    corrupt.amount_settled = Set(dec!(70));
    corrupt.update(&db).await.unwrap();

    let repo = invoices(&db);
    let drift = repo.rebuild_settled_amounts(true).await.unwrap();
    let ours = drift
        .iter()
        .find(|d| d.invoice_id.into_inner() == invoice.invoice.id)
        .expect("drift not reported");
    assert_eq!(ours.cached, dec!(70));
    assert_eq!(ours.allocated, dec!(30));

    repo.rebuild_settled_amounts(false).await.unwrap();
    let fixed = repo
        .get_invoice(InvoiceId::from_uuid(invoice.invoice.id))
        .await
        .unwrap();
    assert_eq!(fixed.invoice.amount_settled, dec!(30));
}

#[tokio::test]
async fn test_find_or_create_returns_existing_origin() {
    let Some(db) = connect().await else { return };
    let client = create_client(&db).await.expect("client setup failed");
    let invoice_id = InvoiceId::new();
    let entry = NewLedgerEntry::for_invoice(client, invoice_id, date(3), dec!(120));

    let (first, created) = repositories::ledger::find_or_create(&db, entry.clone())
        .await
        .unwrap();
    assert!(created);

    let (second, created) = repositories::ledger::find_or_create(&db, entry).await.unwrap();
    assert!(!created);
    assert_eq!(second.id, first.id);
    assert_eq!(second.amount, dec!(120));

    let rows = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::OriginKind.eq(OriginColumn::Invoice))
        .filter(ledger_entries::Column::OriginId.eq(invoice_id.into_inner()))
        .count(&db)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}
