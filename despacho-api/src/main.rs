use std::sync::Arc;
use std::net::SocketAddr;
use anyhow::Context;
use despacho_api::{app, AppState};
use despacho_order::{InMemoryOrderRepository, OrderManager, OrderRepository};
use despacho_store::{DbClient, EventBroadcaster, PgOrderRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "despacho_api=debug,despacho_order=info,despacho_store=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = despacho_store::app_config::Config::load().context("Failed to load config")?;
    tracing::info!("Starting Despacho API on port {}", config.server.port);

    let repository: Arc<dyn OrderRepository> = match &config.database {
        Some(database) => {
            let db = DbClient::new(database)
                .await
                .context("Failed to connect to Postgres")?;
            db.migrate().await.context("Failed to run migrations")?;
            Arc::new(PgOrderRepository::new(db.pool.clone()))
        }
        None => {
            tracing::warn!("No database configured; orders are kept in memory only");
            Arc::new(InMemoryOrderRepository::new())
        }
    };

    let events = EventBroadcaster::new(config.notifications.channel_capacity);
    let orders = OrderManager::new(repository, Arc::new(events.clone()))
        .with_review_policy(config.wallet.review_policy());
    orders.hydrate().await.context("Failed to load orders")?;

    let app_state = AppState {
        orders: Arc::new(orders),
        events,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
