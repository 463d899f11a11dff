use std::path::{Path, PathBuf};

use anyhow::Context;
use jukebox_core::IndexConfig;
use jukebox_library::Library;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Index config: JUKEBOX_CONFIG or built-in defaults
    let config_path = std::env::var("JUKEBOX_CONFIG").ok().map(PathBuf::from);
    let config = IndexConfig::load_or_default(config_path.as_deref());
    info!(
        dimensions = config.dimensions().len(),
        workers = config.workers,
        "index config ready"
    );

    // Catalog of scraped items, if one is given
    let library = match std::env::var("JUKEBOX_CATALOG") {
        Ok(path) => {
            jukebox_library::catalog::load_catalog(Path::new(&path))
                .with_context(|| format!("failed to load catalog {path}"))?
        }
        Err(_) => {
            info!("no catalog given, starting with an empty library");
            Library::new()
        }
    };

    let app_state = jukebox_server::state::AppState::new(config, library);

    // Initial build; the API answers 503 until one succeeds.
    match jukebox_server::rebuild::run_build(&app_state).await {
        Ok(summary) => info!(
            build_id = %summary.build_id,
            items = summary.items,
            masters = summary.masters,
            "initial index build complete"
        ),
        Err(e) => warn!(error = %e.0, "initial index build failed"),
    }

    let app = jukebox_server::routes::build_router(app_state);

    let bind_addr = std::env::var("JUKEBOX_BIND").unwrap_or_else(|_| "0.0.0.0:8097".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .context("failed to bind")?;
    info!(addr = %bind_addr, "server listening");

    axum::serve(listener, app).await?;
    Ok(())
}
