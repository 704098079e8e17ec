use axum::extract::State;
use axum::Json;
use chrono::{SecondsFormat, Utc};
use serde::Serialize;

use crate::http::server::AppState;
use crate::upstream::Upstream;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: String,
    pub upstreams: UpstreamLocations,
}

#[derive(Debug, Serialize)]
pub struct UpstreamLocations {
    pub auth: String,
    pub profiles: String,
    pub orchestrator: String,
}

/// `GET /health`. Reports liveness only; upstreams are listed, not probed.
pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    let aggregator = state.aggregator();
    let urls = aggregator.urls();
    Json(HealthStatus {
        status: "UP",
        service: "api-gateway",
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        upstreams: UpstreamLocations {
            auth: urls.base(Upstream::Auth).to_string(),
            profiles: urls.base(Upstream::Profile).to_string(),
            orchestrator: urls.base(Upstream::Orchestrator).to_string(),
        },
    })
}
