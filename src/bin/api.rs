use std::sync::Arc;

use bank_ledger::api::start_server;
use bank_ledger::config::ServiceConfig;
use bank_ledger::ledger::LedgerService;
use bank_ledger::store::LedgerStore;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();
    let config = ServiceConfig::from_env();

    info!("Bank Ledger Service - API Server");
    info!("Database: {}", config.database_url);
    info!("Port: {}", config.port);

    let store = LedgerStore::init(&config.database_url).await?;

    if std::env::var("SEED_DEMO_DATA").is_ok() {
        seed_demo_data(&store).await?;
    }

    let ledger = Arc::new(LedgerService::new(store, config.storage_timeout));

    info!("Starting API server...");
    start_server(ledger, config.port).await?;

    Ok(())
}

/// Seed a pair of demo accounts if they don't exist yet. Accounts are
/// otherwise created out-of-band; the API exposes no creation endpoint.
async fn seed_demo_data(store: &LedgerStore) -> Result<(), bank_ledger::LedgerError> {
    if store.find_account("john").await?.is_none() {
        store
            .create_user("john", 1001, "john@example.com", "+10000000001")
            .await?;
        store.create_account("john", 100_000).await?;
        info!("seeded account: john");
    }
    if store.find_account("jane").await?.is_none() {
        store
            .create_user("jane", 1002, "jane@example.com", "+10000000002")
            .await?;
        store.create_account("jane", 50_000).await?;
        info!("seeded account: jane");
    }
    Ok(())
}
