use anyhow::Result;
use std::sync::Arc;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use crate::error::AppError;
use crate::services::{file_repository::FileRepository, storage::FileStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.bind_addr;

    // Build our application state
    let state = Arc::new(AppState::new(config).await?);

    let app = routes::router(state);

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// Application state
pub struct AppState {
    pub config: config::Config,
    pub store: FileStore,
    pub files: FileRepository,
}

impl AppState {
    pub async fn new(config: config::Config) -> Result<Self, AppError> {
        let store = FileStore::new(&config.upload_dir, config.max_file_size).await?;
        let files = FileRepository::open(&config.database_path)?;
        Ok(Self {
            config,
            store,
            files,
        })
    }
}
