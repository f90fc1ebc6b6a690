//! Telemetry records and the source traits investigators pull from.
//!
//! Sources are pure data providers. They are swapped for fixtures in tests
//! and in the default deployment.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use incident_commander_core::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One application log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub message: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
}

/// Aggregated metrics for a service over a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub service: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub p99_latency_ms: f64,
    pub error_rate: f64,
    pub request_rate: f64,
    /// Named series, oldest sample first
    #[serde(default)]
    pub time_series: BTreeMap<String, Vec<f64>>,
}

/// Before/after value of one configuration key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigChange {
    pub old: serde_json::Value,
    pub new: serde_json::Value,
}

/// One deployment of a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployRecord {
    pub deploy_id: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub commit: String,
    pub branch: String,
    pub status: String,
    #[serde(default)]
    pub config_diff: BTreeMap<String, ConfigChange>,
}

/// Source of application logs.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &'static str;

    /// Logs for `service` between `start` and `end`
    async fn fetch_logs(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<LogRecord>>;
}

/// Source of service metrics.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_metrics(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<MetricsSnapshot>;
}

/// Source of deployment and config-change history.
#[async_trait]
pub trait DeploySource: Send + Sync {
    fn name(&self) -> &'static str;

    /// Deployments of `service` since `since`, newest first
    async fn fetch_deploy_history(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DeployRecord>>;
}
