use axum::{
    Router,
    routing::{get, post},
};

pub mod call;
pub mod system;

/// Full routing tree.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/v1/call", post(call::general_call))
}
