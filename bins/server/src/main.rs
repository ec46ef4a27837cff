//! Ardesk API Server
//!
//! Main entry point for the receivables ledger service.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ardesk_api::{AppState, create_router};
use ardesk_db::connect;
use ardesk_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ardesk=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect(&config.database).await?;
    info!(
        max_connections = config.database.max_connections,
        settlement_source = ?config.ledger.settlement_source,
        "Connected to database"
    );

    let app = create_router(AppState::new(db, config.ledger.clone()));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
