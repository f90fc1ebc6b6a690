//! Metrics investigator (telemetry analyst).

use crate::agents::contract::{
    describe_window, prompt_json, Investigator, InvestigatorSettings, METRICS_AGENT,
    METRICS_EVIDENCE,
};
use crate::reasoning::{complete_within, ReasoningService};
use async_trait::async_trait;
use chrono::Utc;
use incident_commander_core::prelude::{AlertEvent, SharedIncidentRecord};
use incident_commander_core::Result;
use incident_commander_ingestion::telemetry::MetricsSource;
use std::sync::Arc;
use tracing::{debug, info};

/// Confidence attached to every metrics finding
pub const METRICS_CONFIDENCE: f64 = 0.80;

pub const METRICS_SYSTEM_PROMPT: &str = "You are a Metrics Agent (Telemetry Analyst). Analyze system metrics to identify:
- Anomalies in CPU, memory, latency (p99)
- Error rate trends
- Downstream dependency issues inferred from metrics

Be concise. Output a structured finding: what you observed, what it suggests, and your confidence (0-1).";

/// Investigator over service metrics.
pub struct MetricsInvestigator {
    source: Arc<dyn MetricsSource>,
    reasoning: Arc<dyn ReasoningService>,
    settings: InvestigatorSettings,
}

impl MetricsInvestigator {
    pub fn new(
        source: Arc<dyn MetricsSource>,
        reasoning: Arc<dyn ReasoningService>,
        settings: InvestigatorSettings,
    ) -> Self {
        Self {
            source,
            reasoning,
            settings,
        }
    }
}

impl std::fmt::Debug for MetricsInvestigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsInvestigator")
            .field("source", &self.source.name())
            .field("settings", &self.settings)
            .finish()
    }
}

#[async_trait]
impl Investigator for MetricsInvestigator {
    fn name(&self) -> &'static str {
        METRICS_AGENT
    }

    async fn investigate(&self, alert: &AlertEvent, record: &SharedIncidentRecord) -> Result<()> {
        let end = Utc::now();
        let start = end - self.settings.metrics_window;

        let metrics = self
            .settings
            .fetch_within(
                self.source.name(),
                self.source.fetch_metrics(&alert.service, start, end),
            )
            .await?;
        debug!(
            incident_id = %record.incident_id(),
            service = %alert.service,
            p99_ms = metrics.p99_latency_ms,
            error_rate = metrics.error_rate,
            "fetched metrics"
        );

        let metrics_json = prompt_json(&metrics)?;
        record
            .add_evidence(METRICS_EVIDENCE, serde_json::to_value(&metrics)?)
            .await;

        let prompt = format!(
            "{}\nTime range: {}\n\nMetrics data:\n{}\n\nAnalyze these metrics. Identify anomalies in CPU, p99 latency, error rate. What does this suggest about the root cause?",
            alert.headline(),
            describe_window(self.settings.metrics_window),
            metrics_json
        );

        let response = complete_within(
            self.reasoning.as_ref(),
            self.settings.reasoning_timeout,
            METRICS_SYSTEM_PROMPT,
            &prompt,
        )
        .await?;

        record
            .add_finding(METRICS_AGENT, response, METRICS_CONFIDENCE)
            .await?;
        info!(incident_id = %record.incident_id(), agent = METRICS_AGENT, "metrics finding recorded");
        Ok(())
    }
}
