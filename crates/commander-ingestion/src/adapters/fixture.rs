//! # Fixture Telemetry Adapter
//!
//! Serves canned logs, metrics and deploy history for any service. The data
//! describes one coherent incident: a deploy thirty minutes ago raised the
//! database pool size and cut the request timeout, after which the service
//! started exhausting database connections.
//!
//! Used by the default deployment until real backends are wired in, and by
//! the pipeline tests.

use crate::telemetry::{
    ConfigChange, DeployRecord, DeploySource, LogRecord, LogSource, MetricsSnapshot,
    MetricsSource,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use incident_commander_core::Result;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Telemetry source backed by built-in incident fixtures.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureTelemetry;

impl FixtureTelemetry {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LogSource for FixtureTelemetry {
    fn name(&self) -> &'static str {
        "fixture-logs"
    }

    async fn fetch_logs(
        &self,
        service: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> Result<Vec<LogRecord>> {
        debug!(service, "serving fixture logs");

        Ok(vec![
            LogRecord {
                timestamp: start,
                level: "ERROR".to_string(),
                message: "Connection timeout to database pool".to_string(),
                service: service.to_string(),
                trace_id: Some("abc123".to_string()),
                stack_trace: Some(
                    "java.sql.SQLException: Connection timeout\n  at com.app.DatabasePool.getConnection(DatabasePool.java:42)\n  at com.app.UserService.findById(UserService.java:89)"
                        .to_string(),
                ),
                latency_ms: None,
            },
            LogRecord {
                timestamp: start + Duration::minutes(2),
                level: "ERROR".to_string(),
                message: "Too many connections".to_string(),
                service: service.to_string(),
                trace_id: Some("def456".to_string()),
                stack_trace: Some(
                    "org.postgresql.util.PSQLException: Too many connections\n  at org.postgresql.core.v3.QueryExecutorImpl.receiveErrorResponse"
                        .to_string(),
                ),
                latency_ms: None,
            },
            LogRecord {
                timestamp: start + Duration::minutes(5),
                level: "WARN".to_string(),
                message: "High latency detected in /api/users".to_string(),
                service: service.to_string(),
                trace_id: None,
                stack_trace: None,
                latency_ms: Some(4500.0),
            },
        ])
    }
}

#[async_trait]
impl MetricsSource for FixtureTelemetry {
    fn name(&self) -> &'static str {
        "fixture-metrics"
    }

    async fn fetch_metrics(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<MetricsSnapshot> {
        debug!(service, "serving fixture metrics");

        let mut time_series = BTreeMap::new();
        time_series.insert("p99".to_string(), vec![1200.0, 1500.0, 2800.0, 4200.0, 3800.0]);
        time_series.insert("cpu".to_string(), vec![45.0, 62.0, 78.0, 92.0, 91.0]);
        time_series.insert(
            "error_rate".to_string(),
            vec![0.01, 0.02, 0.08, 0.15, 0.14],
        );

        Ok(MetricsSnapshot {
            service: service.to_string(),
            window_start: start,
            window_end: end,
            cpu_percent: 92.5,
            memory_percent: 78.2,
            p99_latency_ms: 4200.0,
            error_rate: 0.15,
            request_rate: 1200.0,
            time_series,
        })
    }
}

#[async_trait]
impl DeploySource for FixtureTelemetry {
    fn name(&self) -> &'static str {
        "fixture-deploys"
    }

    async fn fetch_deploy_history(
        &self,
        service: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<DeployRecord>> {
        debug!(service, since = %since, "serving fixture deploy history");

        let now = Utc::now();
        let mut risky_diff = BTreeMap::new();
        risky_diff.insert(
            "pool_size".to_string(),
            ConfigChange {
                old: json!(10),
                new: json!(50),
            },
        );
        risky_diff.insert(
            "timeout_seconds".to_string(),
            ConfigChange {
                old: json!(30),
                new: json!(5),
            },
        );

        let deploys = vec![
            DeployRecord {
                deploy_id: "dpl-001".to_string(),
                version: "v2.3.1".to_string(),
                timestamp: now - Duration::minutes(30),
                commit: "a1b2c3d".to_string(),
                branch: "main".to_string(),
                status: "success".to_string(),
                config_diff: risky_diff,
            },
            DeployRecord {
                deploy_id: "dpl-002".to_string(),
                version: "v2.3.0".to_string(),
                timestamp: now - Duration::hours(2),
                commit: "e4f5g6h".to_string(),
                branch: "main".to_string(),
                status: "success".to_string(),
                config_diff: BTreeMap::new(),
            },
        ];

        Ok(deploys.into_iter().filter(|d| d.timestamp >= since).collect())
    }
}
