//! Storefront Orders - Order Management Service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_orders::config::AppConfig;
use storefront_orders::events::EventBus;
use storefront_orders::http::{router, AppState};
use storefront_orders::payments::RefundDispatcher;
use storefront_orders::service::{CancellationService, StatusUpdateService};
use storefront_orders::storage::PgOrderStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let nats = match &config.nats_url {
        Some(url) => Some(async_nats::connect(url.as_str()).await?),
        None => None,
    };
    let events = EventBus::new(nats);

    let store = Arc::new(PgOrderStore::new(db));
    let refunds = Arc::new(RefundDispatcher::new(config.card.clone(), config.wallet.clone())?);
    if config.card.is_none() {
        tracing::warn!("card provider credentials absent; card refunds will be reported as failures");
    }
    if config.wallet.is_none() {
        tracing::warn!("wallet provider credentials absent; wallet refunds will be reported as failures");
    }

    let cancellations = Arc::new(CancellationService::new(
        store.clone(),
        refunds,
        events.clone(),
    ));
    let status_updates = Arc::new(StatusUpdateService::new(
        store.clone(),
        cancellations.clone(),
        events,
    ));

    let app = router(AppState {
        store,
        cancellations,
        status_updates,
    });

    tracing::info!("storefront-orders listening on 0.0.0.0:{}", config.port);
    axum::serve(
        tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?,
        app,
    )
    .await?;
    Ok(())
}
