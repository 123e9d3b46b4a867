use anyhow::Context;
use tracing_subscriber::EnvFilter;

use console_bff::{app, config, proxy::mock::MockCatalog, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up the *_SERVICE_URL variables
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("console_bff=info,tower_http=info")),
        )
        .init();

    let config = config::config().clone();
    tracing::info!("Starting console BFF in {:?} mode", config.environment);

    for key in config.services.keys() {
        tracing::info!("{} configured", key);
    }
    if config.mock.enabled {
        tracing::warn!("Mock mode is on, no request will reach a backend");
    }

    let mocks = MockCatalog::load(config.mock.catalog_path.as_deref()).context("loading mock catalog")?;
    let port = config.server.port;
    let state = AppState::new(config, mocks).context("building HTTP client")?;

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("🚀 Console BFF listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await.context("server")?;
    Ok(())
}
