//! Investigator contract.
//!
//! Every investigator role implements [`Investigator`]. The orchestration
//! graph knows nothing about a role beyond this trait: roles report through
//! the shared incident record, never through return values.

use async_trait::async_trait;
use incident_commander_core::config::{InvestigationConfig, ReasoningConfig};
use incident_commander_core::prelude::{AlertEvent, SharedIncidentRecord};
use incident_commander_core::{Error, Result};
use std::future::Future;
use std::time::Duration as StdDuration;

use crate::reasoning::bounded;

/// Agent name written on logs findings
pub const LOGS_AGENT: &str = "logs";
/// Agent name written on metrics findings
pub const METRICS_AGENT: &str = "metrics";
/// Agent name written on deploy-intelligence findings
pub const DEPLOY_INTEL_AGENT: &str = "deploy_intel";

/// Evidence source tag for fetched logs
pub const LOGS_EVIDENCE: &str = "logs";
/// Evidence source tag for fetched metrics
pub const METRICS_EVIDENCE: &str = "metrics";
/// Evidence source tag for fetched deploy history
pub const DEPLOY_EVIDENCE: &str = "deploy_history";

/// One investigator role.
///
/// `investigate` fetches its telemetry, records it as evidence, asks the
/// reasoning service for an interpretation and appends a finding. Errors are
/// returned to the caller untouched.
#[async_trait]
pub trait Investigator: Send + Sync {
    /// Agent name, as written on findings
    fn name(&self) -> &'static str;

    async fn investigate(&self, alert: &AlertEvent, record: &SharedIncidentRecord) -> Result<()>;
}

/// Time windows and call deadlines shared by the investigator roles.
#[derive(Debug, Clone)]
pub struct InvestigatorSettings {
    /// Trailing window for log fetches
    pub logs_window: chrono::Duration,
    /// Trailing window for metrics fetches
    pub metrics_window: chrono::Duration,
    /// How far back deploy history is read
    pub deploy_lookback: chrono::Duration,
    /// Deadline for each telemetry fetch
    pub fetch_timeout: StdDuration,
    /// Deadline for each reasoning call
    pub reasoning_timeout: StdDuration,
}

impl InvestigatorSettings {
    pub fn from_config(investigation: &InvestigationConfig, reasoning: &ReasoningConfig) -> Self {
        Self {
            logs_window: chrono::Duration::minutes(investigation.logs_window_minutes),
            metrics_window: chrono::Duration::minutes(investigation.metrics_window_minutes),
            deploy_lookback: chrono::Duration::hours(investigation.deploy_lookback_hours),
            fetch_timeout: StdDuration::from_secs(investigation.fetch_timeout_secs),
            reasoning_timeout: StdDuration::from_secs(reasoning.timeout_secs),
        }
    }

    /// Run a telemetry fetch under the fetch deadline.
    pub async fn fetch_within<T, F>(&self, source_name: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let limit = self.fetch_timeout;
        bounded(limit, fut, || {
            Error::fetch(
                source_name,
                format!("no response within {}s", limit.as_secs()),
            )
        })
        .await
    }
}

impl Default for InvestigatorSettings {
    fn default() -> Self {
        Self::from_config(&InvestigationConfig::default(), &ReasoningConfig::default())
    }
}

/// Render a duration as the "last N minutes/hours" phrase used in prompts.
pub(crate) fn describe_window(window: chrono::Duration) -> String {
    let minutes = window.num_minutes();
    if minutes >= 60 && minutes % 60 == 0 {
        let hours = minutes / 60;
        format!("last {} hour{}", hours, if hours == 1 { "" } else { "s" })
    } else {
        format!("last {} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    }
}

/// Pretty JSON for prompt embedding.
pub(crate) fn prompt_json<T: serde::Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
