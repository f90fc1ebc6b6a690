//! Commander operator handlers
//!
//! - GET /api/v1/commander/config - active reasoning and investigation settings
//! - GET /api/v1/commander/stats - orchestrator run statistics

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use incident_commander_agents::{GraphDescription, GraphStats, InvestigationGraph};
use incident_commander_core::prelude::{Config, InvestigationConfig, ReasoningConfig};
use serde::Serialize;
use tracing::{info, instrument};

use crate::SuccessResponse;

/// Shared state for the webhook and commander handlers
#[derive(Debug)]
pub struct CommanderState {
    pub graph: Arc<InvestigationGraph>,
    pub config: Config,
}

impl CommanderState {
    pub fn new(graph: InvestigationGraph, config: Config) -> Self {
        Self {
            graph: Arc::new(graph),
            config,
        }
    }
}

/// Agent configuration response. API keys are never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct CommanderConfigResponse {
    pub reasoning: ReasoningConfig,
    pub investigation: InvestigationConfig,
    pub graph: GraphDescription,
}

/// GET /api/v1/commander/config
#[instrument(skip(state))]
pub async fn commander_config(State(state): State<Arc<CommanderState>>) -> impl IntoResponse {
    info!("Getting commander configuration");

    let response = CommanderConfigResponse {
        reasoning: state.config.reasoning.clone(),
        investigation: state.config.investigation.clone(),
        graph: state.graph.describe(),
    };

    (StatusCode::OK, Json(SuccessResponse::new(response)))
}

/// GET /api/v1/commander/stats
#[instrument(skip(state))]
pub async fn commander_stats(State(state): State<Arc<CommanderState>>) -> impl IntoResponse {
    info!("Getting commander statistics");

    let stats: GraphStats = state.graph.stats();

    (StatusCode::OK, Json(SuccessResponse::new(stats)))
}
