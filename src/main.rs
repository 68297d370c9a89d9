use anyhow::Context;
use tokio::net::TcpListener;

use growth_guard::app;
use growth_guard::config::AppConfig;
use growth_guard::db;
use growth_guard::logging::{init_logging, LoggingConfig};
use growth_guard::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging FIRST
    init_logging(LoggingConfig::from_env())?;

    let config = AppConfig::from_env()?;
    let pool = db::init_pool(&config).await?;

    let state = AppState::new(pool);
    let app = app::create_app(state, &config);

    let listener = TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;
    tracing::info!("🚀 Growth Guard backend running at http://{}/", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
