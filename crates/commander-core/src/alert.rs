//! Canonical alert event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// What kind of condition fired the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    LatencySpike,
    #[default]
    ErrorRate,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::LatencySpike => "latency_spike",
            TriggerKind::ErrorRate => "error_rate",
        }
    }

    /// Parse the wire name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "latency_spike" => Some(TriggerKind::LatencySpike),
            "error_rate" => Some(TriggerKind::ErrorRate),
            _ => None,
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized alert, created once per inbound payload and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub trigger_kind: TriggerKind,
    pub service: String,
    pub timestamp: DateTime<Utc>,
    pub threshold: f64,
    pub value: Option<f64>,
    /// Original payload, kept verbatim for audit
    pub raw_payload: serde_json::Value,
}

impl AlertEvent {
    /// SHA-256 of the raw payload, hex encoded.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let json = serde_json::to_string(&self.raw_payload).unwrap_or_default();
        hasher.update(json.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn summary(&self) -> AlertSummary {
        AlertSummary {
            trigger_kind: self.trigger_kind,
            service: self.service.clone(),
        }
    }

    /// One-line description used at the top of investigator prompts.
    pub fn headline(&self) -> String {
        let mut line = format!("Alert: {} on service {}", self.trigger_kind, self.service);
        match self.value {
            Some(value) => line.push_str(&format!(
                " (observed {} against threshold {})",
                value, self.threshold
            )),
            None => line.push_str(&format!(" (threshold {})", self.threshold)),
        }
        line
    }
}

/// The slice of an alert echoed back in a run result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub trigger_kind: TriggerKind,
    pub service: String,
}
