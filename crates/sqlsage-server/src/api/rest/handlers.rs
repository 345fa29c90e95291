//! API endpoint handlers

use super::extractors::JsonExtractor;
use super::types::*;
use crate::error::ServerError;
use axum::{
    extract::{Query, State},
    Json,
};
use sqlsage_runtime::QueryRequest;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Service banner
pub(super) async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "E-commerce SQL Agent API".to_string(),
        status: "running".to_string(),
    })
}

/// Health check endpoint
pub(super) async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, ServerError> {
    match state.gateway.health().await {
        Ok(report) => Ok(Json(report.into())),
        Err(e) => {
            warn!("Health check failed: {}", e);
            Err(ServerError::Unhealthy(e.to_string()))
        }
    }
}

/// Answer a natural-language question
#[axum::debug_handler]
pub(super) async fn ask_sql(
    State(state): State<AppState>,
    JsonExtractor(payload): JsonExtractor<AskSqlRequest>,
) -> Result<Json<AskSqlResponse>, ServerError> {
    let request_id = Uuid::new_v4();
    let request: QueryRequest = payload.into();
    info!(
        %request_id,
        hint = ?request.hint(),
        "Received question: {}",
        request.question
    );

    match state.gateway.ask(&request).await {
        Ok(response) => {
            info!(%request_id, db = %response.db, "Question answered");
            Ok(Json(response.into()))
        }
        Err(e) => {
            error!(%request_id, error = ?e, "Error processing request: {}", e);
            Err(ServerError::from(e))
        }
    }
}

/// Every indexed table
pub(super) async fn list_tables(State(state): State<AppState>) -> Json<TablesResponse> {
    let tables = state.gateway.tables().await;
    Json(TablesResponse {
        count: tables.len(),
        tables,
    })
}

/// Tables most similar to a free-text query
pub(super) async fn search_tables(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ServerError> {
    let query = params
        .query
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ServerError::InvalidRequest("Query parameter 'query' is required".to_string()))?;

    let matches = state
        .gateway
        .search_tables(&query, params.max_results)
        .await
        .map_err(|e| {
            error!(error = ?e, "Table search failed");
            ServerError::from(e)
        })?;

    Ok(Json(SearchResponse::new(query, matches)))
}
