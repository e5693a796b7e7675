//! Notebook images API
//!
//! REST surface over build intents and the images the operator produces
//! for them. Records live in the cluster; this service only reads, merges
//! and forwards writes.

pub mod auth;
pub mod config;
pub mod handlers;
pub mod kube_store;
pub mod memory;
pub mod service;
pub mod store;

use axum::{
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use config::{Config, StoreMode};
pub use handlers::AppState;
pub use kube_store::KubeStore;
pub use memory::MemoryStore;
pub use store::RecordStore;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route(
            "/api/images/{image}",
            get(handlers::list_images_handler)
                .put(handlers::update_image_handler)
                .delete(handlers::delete_image_handler),
        )
        .route(
            "/api/cre",
            get(handlers::list_resources_handler).post(handlers::create_resource_handler),
        )
        .route(
            "/api/cre/{id}",
            get(handlers::get_resource_handler).delete(handlers::delete_resource_handler),
        )
        .with_state(shared_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
