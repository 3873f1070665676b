//! digital-storefront - download delivery service
//!
//! Serves download redemption over HTTP and periodically replays payment
//! events whose processing did not finish.

use std::sync::Arc;

use digital_storefront::adapters::http::{delivery_router, DeliveryAppState};
use digital_storefront::adapters::notifications::TracingNotifier;
use digital_storefront::adapters::postgres::{
    self, PostgresDownloadTokenRepository, PostgresOrderRepository,
    PostgresProductRepository, PostgresWebhookEventRepository,
};
use digital_storefront::application::{ReplayUnprocessedCommand, Storefront, StorefrontPorts};
use digital_storefront::config::AppConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        "Starting digital-storefront"
    );

    let pool = postgres::connect(&config.database).await?;

    let ports = StorefrontPorts {
        orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        tokens: Arc::new(PostgresDownloadTokenRepository::new(pool.clone())),
        events: Arc::new(PostgresWebhookEventRepository::new(pool.clone())),
        products: Arc::new(PostgresProductRepository::new(pool)),
        notifier: Arc::new(TracingNotifier::new()),
    };
    let storefront = Storefront::new(
        ports,
        config.delivery.token_policy()?,
        config.delivery.replay_grace(),
    );

    if let Some(every) = config.delivery.replay_interval() {
        let replay = storefront.replay.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = replay.handle(ReplayUnprocessedCommand::default()).await {
                    tracing::warn!(error = %e, "Event replay sweep failed");
                }
            }
        });
    }

    let app = delivery_router(
        DeliveryAppState::new(storefront.request_download.clone()),
        config.server.download_timeout(),
    );

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "HTTP listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
