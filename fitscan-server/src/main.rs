//! fitscan-server - fittings scan, inventory and invoicing service
//!
//! Serves the REST API and the uploaded images from one process backed by a
//! SQLite database in the root folder.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fitscan_common::config::load_toml_config;
use fitscan_common::db::init_database;
use fitscan_server::config::{Cli, ServerConfig};
use fitscan_server::services::reference_catalog::{CatalogReader, ReferenceCatalog};
use fitscan_server::services::upload_store::UploadStore;
use fitscan_server::services::vision::VisionAnalyzer;
use fitscan_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let toml_config = load_toml_config(cli.config.as_deref())?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&toml_config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting fitscan-server (scan, inventory and invoicing)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::resolve(&cli, &toml_config);
    info!("Root folder: {}", config.root.path().display());

    config
        .root
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;

    let db_path = config.root.database_path();
    info!("Database: {}", db_path.display());
    let db = init_database(&db_path).await?;
    info!("Database connection established");

    let uploads = UploadStore::new(config.upload_dir.clone());
    uploads
        .ensure_dir()
        .await
        .context("Failed to create upload directory")?;
    info!("Uploads: {}", config.upload_dir.display());

    let reference_catalog: Arc<dyn CatalogReader> =
        Arc::new(ReferenceCatalog::load(&config.reference_catalog_path));
    let vision = Arc::new(VisionAnalyzer::from_config(
        &config.vision,
        Arc::clone(&reference_catalog),
    ));

    let mut state = AppState::new(db, vision, reference_catalog, uploads);
    state.public_base_url = config.public_base_url.clone();
    state.frontend_origin = Some(config.frontend_origin.clone());

    let app = fitscan_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/api/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
