//! Logs investigator (forensic analyst).
//!
//! Reads the trailing log window for the alerting service and asks the
//! reasoning service for error patterns, stack traces and temporal
//! correlations.

use crate::agents::contract::{
    describe_window, prompt_json, Investigator, InvestigatorSettings, LOGS_AGENT, LOGS_EVIDENCE,
};
use crate::reasoning::{complete_within, ReasoningService};
use async_trait::async_trait;
use chrono::Utc;
use incident_commander_core::prelude::{AlertEvent, SharedIncidentRecord};
use incident_commander_core::Result;
use incident_commander_ingestion::telemetry::LogSource;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info};

/// Confidence attached to every logs finding
pub const LOGS_CONFIDENCE: f64 = 0.85;

pub const LOGS_SYSTEM_PROMPT: &str = "You are a Logs Agent (Forensic Analyst). Analyze application logs to identify:
- Error patterns and stack traces
- Temporal correlations (when did errors spike?)
- Root cause clues from exception messages

Be concise. Output a structured finding: what you observed, what it suggests, and your confidence (0-1).";

/// Investigator over application logs.
pub struct LogsInvestigator {
    source: Arc<dyn LogSource>,
    reasoning: Arc<dyn ReasoningService>,
    settings: InvestigatorSettings,
}

impl LogsInvestigator {
    pub fn new(
        source: Arc<dyn LogSource>,
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

impl std::fmt::Debug for LogsInvestigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogsInvestigator")
            .field("source", &self.source.name())
            .field("settings", &self.settings)
            .finish()
    }
}

#[async_trait]
impl Investigator for LogsInvestigator {
    fn name(&self) -> &'static str {
        LOGS_AGENT
    }

    async fn investigate(&self, alert: &AlertEvent, record: &SharedIncidentRecord) -> Result<()> {
        let end = Utc::now();
        let start = end - self.settings.logs_window;

        let logs = self
            .settings
            .fetch_within(
                self.source.name(),
                self.source.fetch_logs(&alert.service, start, end),
            )
            .await?;
        debug!(
            incident_id = %record.incident_id(),
            service = %alert.service,
            count = logs.len(),
            "fetched logs"
        );

        let logs_json = prompt_json(&logs)?;
        record
            .add_evidence(LOGS_EVIDENCE, json!({ "logs": logs }))
            .await;

        let prompt = format!(
            "{}\nTime range: {}\n\nLogs data:\n{}\n\nAnalyze these logs. Identify error patterns, stack traces, and temporal correlations. What does this suggest about the root cause?",
            alert.headline(),
            describe_window(self.settings.logs_window),
            logs_json
        );

        let response = complete_within(
            self.reasoning.as_ref(),
            self.settings.reasoning_timeout,
            LOGS_SYSTEM_PROMPT,
            &prompt,
        )
        .await?;

        record
            .add_finding(LOGS_AGENT, response, LOGS_CONFIDENCE)
            .await?;
        info!(incident_id = %record.incident_id(), agent = LOGS_AGENT, "logs finding recorded");
        Ok(())
    }
}
