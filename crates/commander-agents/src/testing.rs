//! Test doubles shared by the unit tests in this crate.

use crate::reasoning::ReasoningService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use incident_commander_core::prelude::AlertEvent;
use incident_commander_core::{Error, Result};
use incident_commander_ingestion::normalize;
use incident_commander_ingestion::telemetry::{
    DeployRecord, DeploySource, LogRecord, LogSource, MetricsSnapshot, MetricsSource,
};
use serde_json::json;
use std::time::Duration;
use tokio::sync::Mutex;

pub(crate) fn sample_alert() -> AlertEvent {
    normalize(&json!({
        "trigger_type": "latency_spike",
        "service": "api-gateway",
        "threshold": 1000,
        "value": 2500
    }))
    .unwrap()
}

/// Answers with a fixed response and keeps every (system, user) prompt pair.
pub(crate) struct RecordingReasoning {
    response: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingReasoning {
    pub(crate) fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ReasoningService for RecordingReasoning {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .await
            .push((system_prompt.to_string(), user_prompt.to_string()));
        Ok(self.response.clone())
    }
}

/// Sleeps before answering.
pub(crate) struct SlowReasoning(pub Duration);

#[async_trait]
impl ReasoningService for SlowReasoning {
    async fn complete(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        tokio::time::sleep(self.0).await;
        Ok("late".to_string())
    }
}

/// Telemetry source whose every fetch fails.
pub(crate) struct FailingTelemetry;

#[async_trait]
impl LogSource for FailingTelemetry {
    fn name(&self) -> &'static str {
        "failing-logs"
    }

    async fn fetch_logs(
        &self,
        _service: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<LogRecord>> {
        Err(Error::fetch(LogSource::name(self), "connection refused"))
    }
}

#[async_trait]
impl MetricsSource for FailingTelemetry {
    fn name(&self) -> &'static str {
        "failing-metrics"
    }

    async fn fetch_metrics(
        &self,
        _service: &str,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<MetricsSnapshot> {
        Err(Error::fetch(MetricsSource::name(self), "connection refused"))
    }
}

#[async_trait]
impl DeploySource for FailingTelemetry {
    fn name(&self) -> &'static str {
        "failing-deploys"
    }

    async fn fetch_deploy_history(
        &self,
        _service: &str,
        _since: DateTime<Utc>,
    ) -> Result<Vec<DeployRecord>> {
        Err(Error::fetch(DeploySource::name(self), "connection refused"))
    }
}
