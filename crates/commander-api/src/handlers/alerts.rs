//! Alert webhook handler
//!
//! - POST /webhook/alert - investigate one alert and return the RCA report
//!
//! The body is decoded by hand so that malformed JSON and non-object bodies
//! get the same `INVALID_PAYLOAD` rejection.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use incident_commander_core::prelude::{RcaReport, RunTrace, Stage};
use incident_commander_ingestion::normalize;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::handlers::commander::CommanderState;
use crate::ErrorResponse;

/// Body returned when an accepted alert could not be investigated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationFailedResponse {
    /// Always `INVESTIGATION_FAILED`
    pub error: String,
    pub stage: Stage,
    /// Code of the underlying failure, e.g. `FETCH_FAILURE`
    pub cause: String,
    pub message: String,
    pub incident_id: Option<Uuid>,
    /// Stages visited, ending with the failed span
    pub trace: RunTrace,
    /// Always null; failed runs never return a partial report
    pub rca: Option<RcaReport>,
}

/// POST /webhook/alert
#[instrument(skip(state, body), fields(body_bytes = body.len()))]
pub async fn receive_alert(State(state): State<Arc<CommanderState>>, body: Bytes) -> Response {
    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "alert body is not JSON");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(
                    "INVALID_PAYLOAD",
                    format!("alert body is not valid JSON: {}", e),
                )),
            )
                .into_response();
        }
    };

    let alert = match normalize(&payload) {
        Ok(alert) => alert,
        Err(e) => {
            warn!(error = %e, "alert payload rejected");
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(e.code(), e.to_string())),
            )
                .into_response();
        }
    };

    info!(service = %alert.service, trigger = %alert.trigger_kind, "alert accepted");

    match state.graph.run(alert).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(failure) => {
            error!(
                incident_id = ?failure.incident_id,
                stage = %failure.stage,
                error = %failure.cause,
                "investigation failed"
            );
            let response = InvestigationFailedResponse {
                error: "INVESTIGATION_FAILED".to_string(),
                stage: failure.stage,
                cause: failure.cause.code().to_string(),
                message: failure.cause.to_string(),
                incident_id: failure.incident_id,
                trace: failure.trace,
                rca: None,
            };
            (StatusCode::BAD_GATEWAY, Json(response)).into_response()
        }
    }
}
