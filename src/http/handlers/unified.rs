//! Unified user profile: merged reads and split updates.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde_json::Value;

use crate::aggregate::error::Result;
use crate::http::request::RequestIdExt;
use crate::http::server::AppState;

/// `GET /api/v1/users/{username}/profile`
pub async fn get_unified_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    tracing::info!(request_id = %headers.request_id(), username = %username, "Unified read");
    let aggregator = state.aggregator();
    let document = aggregator.unified_read(&username, &headers).await?;
    Ok(Json(document))
}

/// `PATCH|PUT /api/v1/users/{username}/profile`
pub async fn update_unified_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    tracing::info!(request_id = %headers.request_id(), username = %username, "Unified update");
    let aggregator = state.aggregator();
    let document = aggregator.unified_update(&username, &headers, &body).await?;
    Ok(Json(document))
}
