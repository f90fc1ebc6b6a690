//! API route definitions.
//!
//! ## Webhook
//! - `POST /webhook/alert` - investigate an alert
//!
//! ## Commander Endpoints
//! - `/api/v1/commander/config` - active configuration and graph shape
//! - `/api/v1/commander/stats` - run statistics
//!
//! ## Infrastructure Endpoints
//! - `/health` - liveness

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;

use crate::{
    handlers::{commander_config, commander_stats, health, receive_alert, CommanderState, HealthState},
    middleware::{cors_middleware, logging_middleware},
    ApiConfig,
};

/// Create the API router.
pub fn create_router(
    config: ApiConfig,
    health_state: Arc<HealthState>,
    commander_state: Arc<CommanderState>,
) -> Router {
    let api_v1 = Router::new()
        .route("/commander/config", get(commander_config))
        .route("/commander/stats", get(commander_stats))
        .with_state(Arc::clone(&commander_state));

    let webhook_routes = Router::new()
        .route("/webhook/alert", post(receive_alert))
        .with_state(commander_state);

    let health_routes = Router::new()
        .route("/health", get(health))
        .with_state(health_state);

    let app = Router::new()
        .nest("/api/v1", api_v1)
        .merge(webhook_routes)
        .merge(health_routes);

    let app = if config.enable_logging {
        app.layer(middleware::from_fn(logging_middleware))
    } else {
        app
    };

    let app = if config.enable_cors {
        app.layer(cors_middleware(config.cors_origins))
    } else {
        app
    };

    app.layer(TimeoutLayer::new(Duration::from_secs(config.timeout_secs)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use incident_commander_agents::prelude::{InvestigationGraph, StaticReasoning};
    use incident_commander_core::prelude::Config;
    use incident_commander_ingestion::prelude::FixtureTelemetry;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const REPORT: &str = r#"{"summary":"S","root_cause":"R","evidence_summary":["E1"],"recommended_actions":["A1"]}"#;

    fn state_with(reasoning: &str) -> Arc<CommanderState> {
        let mut config = Config::default();
        config.reasoning.api_key = Some("secret-key".to_string());
        let fixture = Arc::new(FixtureTelemetry::new());
        let graph = InvestigationGraph::from_sources(
            &config,
            fixture.clone(),
            fixture.clone(),
            fixture,
            Arc::new(StaticReasoning::new(reasoning)),
        );
        Arc::new(CommanderState::new(graph, config))
    }

    fn router(state: Arc<CommanderState>) -> Router {
        create_router(
            ApiConfig::default(),
            Arc::new(HealthState::new("0.1.0".to_string())),
            state,
        )
    }

    fn post_alert(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/webhook/alert")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = router(state_with(REPORT))
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], "0.1.0");
    }

    #[tokio::test]
    async fn test_webhook_rejects_non_object_body() {
        for body in ["[1, 2, 3]", "\"alert\"", "not json at all"] {
            let response = router(state_with(REPORT))
                .oneshot(post_alert(body))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {}", body);
            let body = json_body(response).await;
            assert_eq!(body["error"], "INVALID_PAYLOAD");
        }
    }

    #[tokio::test]
    async fn test_webhook_returns_report() {
        let state = state_with(REPORT);
        let alert = json!({
            "trigger_type": "latency_spike",
            "service": "api-gateway",
            "threshold": 1000,
            "value": 2500
        });

        let response = router(Arc::clone(&state))
            .oneshot(post_alert(&alert.to_string()))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert!(body["incident_id"].is_string());
        assert_eq!(body["alert"]["service"], "api-gateway");
        assert_eq!(body["alert"]["trigger_kind"], "latency_spike");
        assert_eq!(body["rca"]["summary"], "S");
        assert_eq!(body["rca"]["evidence_summary"][0]["source"], "decision_engine");
        assert_eq!(state.graph.stats().runs_completed, 1);
    }

    #[tokio::test]
    async fn test_webhook_reports_failed_run() {
        let response = router(state_with("no structured report, sorry"))
            .oneshot(post_alert(r#"{"service": "checkout"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = json_body(response).await;
        assert_eq!(body["error"], "INVESTIGATION_FAILED");
        assert_eq!(body["stage"], "synthesize");
        assert_eq!(body["cause"], "SYNTHESIS_PARSE_FAILURE");
        assert!(body["incident_id"].is_string());
        assert!(body["rca"].is_null());

        let spans = body["trace"]["spans"].as_array().unwrap();
        assert_eq!(spans.len(), 4);
        assert_eq!(spans[3]["stage"], "synthesize");
        assert_eq!(spans[3]["status"], "FAILED");
        assert!(spans[3]["failure_reasons"][0].is_string());
    }

    #[tokio::test]
    async fn test_config_hides_api_key() {
        let response = router(state_with(REPORT))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/commander/config")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["reasoning"]["model"], "mistral:latest");
        assert!(body["data"]["reasoning"].get("api_key").is_none());
        assert_eq!(body["data"]["graph"]["correlate_investigator"], "deploy_intel");
    }

    #[tokio::test]
    async fn test_stats_start_empty() {
        let response = router(state_with(REPORT))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/commander/stats")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["data"]["runs_started"], 0);
        assert_eq!(body["data"]["runs_failed"], 0);
    }
}
