//! Root-cause analysis report and run outcome.

use crate::alert::AlertSummary;
use crate::execution::RunTrace;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Source tag for evidence summaries the synthesizer had to wrap itself.
pub const DECISION_ENGINE_SOURCE: &str = "decision_engine";

/// Confidence assigned to wrapped evidence summaries.
pub const DEFAULT_SUMMARY_CONFIDENCE: f64 = 0.8;

/// One supporting point in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub description: String,
    pub source: String,
    pub confidence: f64,
}

impl EvidenceSummary {
    /// Wrap a bare description with the decision-engine defaults.
    pub fn from_description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            source: DECISION_ENGINE_SOURCE.to_string(),
            confidence: DEFAULT_SUMMARY_CONFIDENCE,
        }
    }
}

/// Final artifact of a successful run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RcaReport {
    pub summary: String,
    pub root_cause: String,
    pub evidence_summary: Vec<EvidenceSummary>,
    pub recommended_actions: Vec<String>,
}

/// Result of a completed investigation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationOutcome {
    pub incident_id: Uuid,
    pub alert: AlertSummary,
    pub rca: RcaReport,
    pub trace: RunTrace,
}
