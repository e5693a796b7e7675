//! Notebook images API
//!
//! Serves merged build intent and image views from the configured store

use anyhow::{Context, Result};
use notebook_images_api::{create_router, AppState, Config, KubeStore, MemoryStore, RecordStore, StoreMode};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notebook_images_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Notebook Images API");
    info!("Namespace: {}", config.namespace);
    info!("Correlation mode: {}", config.correlation);

    let store: Arc<dyn RecordStore> = match config.store_mode {
        StoreMode::Kube => Arc::new(
            KubeStore::new(&config.namespace)
                .await
                .context("Failed to initialize Kubernetes store")?,
        ),
        StoreMode::Memory => {
            warn!("Using in-memory store, records are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState {
        store,
        correlation: config.correlation,
        admin_users: config.admin_users.clone(),
        admin_groups: config.admin_groups.clone(),
    };

    let app = create_router(state);

    let addr = config.api_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Notebook Images API running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
