//! Health handler
//!
//! - GET /health

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Shared state for the health handler
#[derive(Debug, Clone)]
pub struct HealthState {
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl HealthState {
    pub fn new(version: String) -> Self {
        Self {
            version,
            started_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: i64,
}

/// GET /health
#[instrument(skip(state))]
pub async fn health(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("health check");

    let response = HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds(),
    };

    (StatusCode::OK, Json(response))
}
