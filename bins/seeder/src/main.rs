//! Database seeder for Ardesk development and testing.
//!
//! Seeds a seller and a few clients with invoices, legacy debt and one
//! FIFO payment so every debt endpoint has data to show. Clients that
//! already exist are left untouched.
//!
//! Usage: cargo run --bin seeder

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use std::str::FromStr;
use uuid::Uuid;

use ardesk_core::collection::NewCollection;
use ardesk_core::invoice::{InvoiceKind, NewInvoice};
use ardesk_core::prior_balance::NewPriorBalance;
use ardesk_db::entities::{clients, sellers};
use ardesk_db::{CollectionRepository, InvoiceRepository, PriorBalanceRepository};
use ardesk_shared::config::SettlementSource;
use ardesk_shared::types::{ClientId, SellerId};

/// Test seller ID (consistent for all seeds)
const TEST_SELLER_ID: &str = "00000000-0000-0000-0000-00000000a001";

/// Seeded clients: id, name, legacy debt.
const CLIENTS: [(&str, &str, &str); 3] = [
    ("00000000-0000-0000-0000-00000000c001", "Almacenes Norte", "350.00"),
    ("00000000-0000-0000-0000-00000000c002", "Ferreteria Sur", "0"),
    ("00000000-0000-0000-0000-00000000c003", "Kiosco Central", "120.50"),
];

/// Invoices per client: days ago, total, kind, upfront.
const INVOICES: [(i64, &str, InvoiceKind, Option<&str>); 4] = [
    (45, "250.00", InvoiceKind::OnCredit, None),
    (20, "180.40", InvoiceKind::OnCredit, None),
    (10, "300.00", InvoiceKind::PartialUpfront, Some("100.00")),
    (2, "75.00", InvoiceKind::Cash, None),
];

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set in environment");

    println!("Connecting to database...");
    let db = ardesk_db::connect_url(&database_url)
        .await
        .expect("Failed to connect to database");

    println!("Seeding test seller...");
    let seller_id = seed_seller(&db).await;

    let today = Utc::now().date_naive();
    for (index, (id, name, prior)) in CLIENTS.iter().enumerate() {
        println!("Seeding client {name}...");
        let client_id = ClientId::from_uuid(Uuid::parse_str(id).unwrap());
        if !seed_client(&db, client_id, name).await {
            continue;
        }
        seed_prior_balance(&db, client_id, Decimal::from_str(prior).unwrap(), today).await;
        seed_invoices(&db, client_id, seller_id, index, today).await;
        seed_payment(&db, client_id, seller_id, today).await;
    }

    println!("Seeding complete!");
}

/// Seeds the test seller.
async fn seed_seller(db: &DatabaseConnection) -> SellerId {
    let seller_id = SellerId::from_uuid(Uuid::parse_str(TEST_SELLER_ID).unwrap());
    if sellers::Entity::find_by_id(seller_id.into_inner())
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Test seller already exists, skipping...");
        return seller_id;
    }

    let seller = sellers::ActiveModel {
        id: Set(seller_id.into_inner()),
        name: Set("Test Seller".to_string()),
        active: Set(true),
        created_at: Set(Utc::now().into()),
    };
    if let Err(e) = seller.insert(db).await {
        eprintln!("Failed to insert test seller: {e}");
    } else {
        println!("  Created test seller");
    }
    seller_id
}

/// Seeds a client. Returns false when it already existed.
async fn seed_client(db: &DatabaseConnection, client_id: ClientId, name: &str) -> bool {
    if clients::Entity::find_by_id(client_id.into_inner())
        .one(db)
        .await
        .ok()
        .flatten()
        .is_some()
    {
        println!("  Client already exists, skipping...");
        return false;
    }

    let client = clients::ActiveModel {
        id: Set(client_id.into_inner()),
        name: Set(name.to_string()),
        active: Set(true),
        created_at: Set(Utc::now().into()),
    };
    match client.insert(db).await {
        Ok(_) => true,
        Err(e) => {
            eprintln!("Failed to insert client: {e}");
            false
        }
    }
}

/// Seeds legacy debt carried from before go-live.
async fn seed_prior_balance(
    db: &DatabaseConnection,
    client_id: ClientId,
    amount: Decimal,
    today: NaiveDate,
) {
    if amount <= Decimal::ZERO {
        return;
    }
    let repo = PriorBalanceRepository::new(db.clone());
    let load = NewPriorBalance {
        client_id,
        amount,
        date: Some(today - Duration::days(120)),
        description: Some("Saldo previo migrado".to_string()),
    };
    match repo.load(load, today).await {
        Ok(record) => println!("  Loaded prior balance {}", record.amount),
        Err(e) => eprintln!("Failed to load prior balance: {e}"),
    }
}

/// Seeds the sample invoices, numbered per client.
async fn seed_invoices(
    db: &DatabaseConnection,
    client_id: ClientId,
    seller_id: SellerId,
    client_index: usize,
    today: NaiveDate,
) {
    let repo = InvoiceRepository::new(db.clone(), SettlementSource::Allocations);
    let mut created = 0;

    for (n, (days_ago, total, kind, upfront)) in INVOICES.iter().enumerate() {
        let invoice = NewInvoice {
            id: None,
            client_id,
            seller_id: Some(seller_id),
            number: Some(format!("F-{:03}-{:04}", client_index + 1, n + 1)),
            date: today - Duration::days(*days_ago),
            total: Decimal::from_str(total).unwrap(),
            kind: *kind,
            upfront_amount: upfront.map(|u| Decimal::from_str(u).unwrap()),
        };
        match repo.confirm_invoice(invoice).await {
            Ok(_) => created += 1,
            Err(e) => eprintln!("Failed to confirm invoice: {e}"),
        }
    }

    println!("  Confirmed {created} invoices");
}

/// Seeds one FIFO payment that settles the oldest invoice and part of the next.
async fn seed_payment(
    db: &DatabaseConnection,
    client_id: ClientId,
    seller_id: SellerId,
    today: NaiveDate,
) {
    let repo = CollectionRepository::new(db.clone(), SettlementSource::Allocations);
    let payment = NewCollection {
        client_id,
        seller_id: Some(seller_id),
        date: today - Duration::days(5),
        total_collected: Decimal::from_str("300.00").unwrap(),
        notes: Some("Seeded payment".to_string()),
        allocations: None,
    };
    match repo.create_collection(payment).await {
        Ok(view) => println!(
            "  Recorded payment: {} to invoices, {} credit",
            view.applied_to_invoices, view.unassigned_credit
        ),
        Err(e) => eprintln!("Failed to record payment: {e}"),
    }
}
