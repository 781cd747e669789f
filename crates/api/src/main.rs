//! easyMO HTTP gateway.
//!
//! Serves the message router, memory webhook, predictive response and
//! template manager endpoints over one SQLite database.

mod config;
mod error;
mod routes;
mod state;

use database::Database;
use tracing::info;

use crate::config::Config;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!(addr = %config.addr, "Starting easyMO API");

    let db = Database::connect(&config.database_url).await?;
    db.migrate().await?;

    let state = AppState::from_config(db, &config)?;
    let app = routes::router().with_state(state);

    info!(addr = %config.addr, "easyMO API listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
