//! HTTP application wiring (axum router + service construction).
//!
//! Folder layout:
//! - `service.rs`: the catalog service, validation in front of the store
//! - `routes/`: HTTP routes and handlers
//! - `dto.rs`: envelope and payload DTOs
//! - `errors.rs`: error-to-envelope mapping

use std::sync::Arc;
use std::time::Duration;

use axum::{Extension, Router};

use kilim_infra::CatalogStore;

use self::service::CatalogService;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod service;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogService>,
    pub call_timeout: Duration,
}

/// Build the full HTTP router over the given store (public entrypoint used
/// by `main.rs` and the black-box tests).
pub fn build_app(store: Arc<dyn CatalogStore>, call_timeout: Duration) -> Router {
    let state = AppState { catalog: Arc::new(CatalogService::new(store)), call_timeout };
    routes::router().layer(Extension(state))
}
