use std::net::SocketAddr;
use std::sync::Arc;

use platron_gateway::api::{self, AppState};
use platron_gateway::config::Config;
use platron_gateway::database::{self, LedgerHandler, PgAtomicScope, PoolConfig};
use platron_gateway::payments::{CallbackProcessor, PaymentClient};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting Platron gateway");
    tracing::info!("Environment: {}", config.server.environment);
    tracing::info!(
        "Merchant account: {} (test mode: {})",
        config.gateway.account_id(),
        config.gateway.test_mode()
    );

    let pool = database::init_pool(
        &config.database.url,
        Some(PoolConfig {
            max_connections: config.database.max_connections,
            ..PoolConfig::default()
        }),
    )
    .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let gateway_config = Arc::new(config.gateway.clone());
    let client = PaymentClient::from_config(Arc::clone(&gateway_config))?;
    let processor = CallbackProcessor::new(Arc::clone(&gateway_config), PgAtomicScope::new(pool));

    let app = api::router(AppState {
        gateway: Arc::new(client),
        processor: Arc::new(processor),
        handler: Arc::new(LedgerHandler),
    });

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
