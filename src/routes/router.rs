use axum::{Router, routing::{get, post}};
use tower_http::trace::TraceLayer;

use crate::handlers::{AppState, health, list_printers, refresh_all, refresh_printer};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/printers", get(list_printers))
        .route("/printers/refresh", post(refresh_all))
        .route("/printers/{id}/refresh", post(refresh_printer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
