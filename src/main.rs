use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use podnotes::config::Config;
use podnotes::database::Database;
use podnotes::server::{run_server, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::load().map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let db = if config.database_path == ":memory:" {
        Database::open_in_memory().context("Failed to open in-memory database")?
    } else {
        Database::open(Path::new(&config.database_path))
            .context("Failed to open database")?
    };

    let state = AppState::new(Arc::new(db), config);
    run_server(state).await
}
