//! Router creation and configuration

use super::handlers::*;
use super::types::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use sqlsage_runtime::QueryGateway;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Create REST API router
pub fn create_router(gateway: Arc<QueryGateway>) -> Router {
    let state = AppState { gateway };

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ask-sql", post(ask_sql))
        .route("/tables", get(list_tables))
        .route("/tables/search", get(search_tables))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
