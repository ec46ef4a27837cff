//! Rewrites each invoice's cached settled amount from its allocations.
//!
//! Usage:
//!   ardesk-rebuild-settlements --dry-run   - Report drift only
//!   ardesk-rebuild-settlements             - Report and rewrite
//!
//! Run with `--dry-run` first, then without, then switch
//! `ledger.settlement_source` to `allocations`.

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ardesk_db::{InvoiceRepository, connect};
use ardesk_shared::AppConfig;
use ardesk_shared::config::SettlementSource;

/// Rebuild cached settled amounts from allocations
#[derive(Parser, Debug)]
#[command(name = "ardesk-rebuild-settlements")]
#[command(about = "Report and repair drift between cached settled amounts and allocations")]
struct Args {
    /// Report drift without writing anything
    #[arg(short = 'n', long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ardesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;
    let db = connect(&config.database).await?;

    let repo = InvoiceRepository::new(db, SettlementSource::Allocations);
    let drift = repo.rebuild_settled_amounts(args.dry_run).await?;

    for item in &drift {
        println!(
            "{}\tcached={}\tallocated={}\tdifference={}",
            item.invoice_id,
            item.cached,
            item.allocated,
            item.difference()
        );
    }

    if drift.is_empty() {
        info!("No settlement drift found");
    } else if args.dry_run {
        warn!(drifted = drift.len(), "Drift found; rerun without --dry-run to repair");
    } else {
        info!(repaired = drift.len(), "Cached settled amounts rewritten");
    }

    Ok(())
}
