use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use suuq_core::{
    AppState, config, create_app, db,
    gateway::WaafiClient,
    services::{AssignmentEngine, DbNotifier, PaymentLedger},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    let gateway = WaafiClient::new(&config);
    tracing::info!(url = %config.gateway_url, "WaafiPay client initialized");

    let ledger = PaymentLedger::new(pool.clone(), gateway, &config);
    let notifier = Arc::new(DbNotifier::new(pool.clone()));
    let engine = AssignmentEngine::new(pool.clone(), notifier);

    let state = AppState {
        db: pool,
        config: config.clone(),
        ledger,
        engine,
    };

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
