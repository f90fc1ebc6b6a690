//! Incident record: the shared memory of one investigation run.
//!
//! The record is append-only. Findings, hypotheses and evidence are only ever
//! pushed, never edited, removed or reordered, so [`IncidentRecord::render_context`]
//! is a stable log that only grows as the run progresses.
//!
//! Investigators never read each other's raw evidence. The rendered context
//! is the only view of the record that reaches the reasoning service.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Placeholder rendered for a record with nothing in it.
pub const EMPTY_CONTEXT: &str = "(No findings yet)";

/// Cap on the rendered length of one evidence payload.
pub const MAX_EVIDENCE_RENDER_CHARS: usize = 500;

/// Cap on the rendered length of one finding.
pub const MAX_FINDING_RENDER_CHARS: usize = 2000;

const EVIDENCE_ID_LEN: usize = 8;

/// Conclusion written by one investigator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub agent: String,
    pub content: String,
    /// Always within [0, 1]
    pub confidence: f64,
}

/// Candidate causal explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub description: String,
    pub supporting_evidence_ids: Vec<String>,
}

/// Raw data pulled from a telemetry source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Unique within the record
    pub id: String,
    pub source: String,
    pub data: serde_json::Value,
}

/// Findings, hypotheses and evidence gathered for one incident.
#[derive(Debug, Clone, Serialize)]
pub struct IncidentRecord {
    incident_id: Uuid,
    created_at: DateTime<Utc>,
    findings: Vec<Finding>,
    hypotheses: Vec<Hypothesis>,
    evidence: Vec<Evidence>,
    #[serde(skip)]
    evidence_ids: HashSet<String>,
}

impl Default for IncidentRecord {
    fn default() -> Self {
        Self::new()
    }
}

impl IncidentRecord {
    /// Create an empty record with a fresh incident id.
    pub fn new() -> Self {
        Self {
            incident_id: Uuid::new_v4(),
            created_at: Utc::now(),
            findings: Vec::new(),
            hypotheses: Vec::new(),
            evidence: Vec::new(),
            evidence_ids: HashSet::new(),
        }
    }

    pub fn incident_id(&self) -> Uuid {
        self.incident_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn hypotheses(&self) -> &[Hypothesis] {
        &self.hypotheses
    }

    pub fn evidence(&self) -> &[Evidence] {
        &self.evidence
    }

    pub fn is_empty(&self) -> bool {
        self.findings.is_empty() && self.hypotheses.is_empty() && self.evidence.is_empty()
    }

    /// Append a finding. Confidence outside [0, 1] (or NaN) is rejected.
    pub fn add_finding(
        &mut self,
        agent: impl Into<String>,
        content: impl Into<String>,
        confidence: f64,
    ) -> Result<()> {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::validation(format!(
                "finding confidence must be within [0, 1], got {}",
                confidence
            )));
        }
        self.findings.push(Finding {
            agent: agent.into(),
            content: content.into(),
            confidence,
        });
        Ok(())
    }

    pub fn add_hypothesis(
        &mut self,
        description: impl Into<String>,
        supporting_evidence_ids: Vec<String>,
    ) {
        self.hypotheses.push(Hypothesis {
            description: description.into(),
            supporting_evidence_ids,
        });
    }

    /// Append evidence and return its id.
    pub fn add_evidence(&mut self, source: impl Into<String>, data: serde_json::Value) -> String {
        let id = self.next_evidence_id();
        self.evidence_ids.insert(id.clone());
        self.evidence.push(Evidence {
            id: id.clone(),
            source: source.into(),
            data,
        });
        id
    }

    fn next_evidence_id(&self) -> String {
        loop {
            let candidate: String = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(EVIDENCE_ID_LEN)
                .collect();
            if !self.evidence_ids.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Render the record as the context block handed to the reasoning service.
    ///
    /// Sections appear in fixed order (Findings, Hypotheses, Evidence) and only
    /// when non-empty. An empty record renders as [`EMPTY_CONTEXT`].
    pub fn render_context(&self) -> String {
        let mut sections: Vec<String> = Vec::new();

        if !self.findings.is_empty() {
            let mut lines = vec!["## Findings".to_string()];
            for f in &self.findings {
                lines.push(format!(
                    "- [{}] {} (confidence: {})",
                    f.agent,
                    truncate_chars(&f.content, MAX_FINDING_RENDER_CHARS),
                    f.confidence
                ));
            }
            sections.push(lines.join("\n"));
        }

        if !self.hypotheses.is_empty() {
            let mut lines = vec!["## Hypotheses".to_string()];
            for h in &self.hypotheses {
                lines.push(format!("- {}", h.description));
            }
            sections.push(lines.join("\n"));
        }

        if !self.evidence.is_empty() {
            let mut lines = vec!["## Evidence".to_string()];
            for e in &self.evidence {
                let data = match &e.data {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                lines.push(format!(
                    "- [{}] {}: {}",
                    e.id,
                    e.source,
                    truncate_chars(&data, MAX_EVIDENCE_RENDER_CHARS)
                ));
            }
            sections.push(lines.join("\n"));
        }

        if sections.is_empty() {
            EMPTY_CONTEXT.to_string()
        } else {
            sections.join("\n\n")
        }
    }
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Handle to a record shared by the investigators of one run.
///
/// Each append takes the lock for exactly one push. Cloning the handle does
/// not copy the record.
#[derive(Debug, Clone)]
pub struct SharedIncidentRecord {
    incident_id: Uuid,
    inner: Arc<Mutex<IncidentRecord>>,
}

impl SharedIncidentRecord {
    pub fn new(record: IncidentRecord) -> Self {
        Self {
            incident_id: record.incident_id(),
            inner: Arc::new(Mutex::new(record)),
        }
    }

    pub fn incident_id(&self) -> Uuid {
        self.incident_id
    }

    pub async fn add_finding(
        &self,
        agent: impl Into<String>,
        content: impl Into<String>,
        confidence: f64,
    ) -> Result<()> {
        self.inner.lock().await.add_finding(agent, content, confidence)
    }

    pub async fn add_hypothesis(
        &self,
        description: impl Into<String>,
        supporting_evidence_ids: Vec<String>,
    ) {
        self.inner
            .lock()
            .await
            .add_hypothesis(description, supporting_evidence_ids)
    }

    pub async fn add_evidence(&self, source: impl Into<String>, data: serde_json::Value) -> String {
        self.inner.lock().await.add_evidence(source, data)
    }

    pub async fn render_context(&self) -> String {
        self.inner.lock().await.render_context()
    }

    /// Copy of the record as it stands now.
    pub async fn snapshot(&self) -> IncidentRecord {
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_record_omits_id_index() {
        let mut record = IncidentRecord::new();
        let id = record.add_evidence("logs", json!("raw"));

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("evidence_ids").is_none());
        assert_eq!(value["evidence"][0]["id"], id.as_str());
        assert_eq!(value["created_at"], json!(record.created_at()));
    }

    #[test]
    fn test_add_finding() {
        let mut record = IncidentRecord::new();
        record
            .add_finding("logs", "Connection timeout detected", 0.9)
            .unwrap();
        assert_eq!(record.findings().len(), 1);
        assert_eq!(record.findings()[0].agent, "logs");
        assert_eq!(record.findings()[0].content, "Connection timeout detected");
        assert_eq!(record.findings()[0].confidence, 0.9);
    }

    #[test]
    fn test_confidence_out_of_range_rejected() {
        let mut record = IncidentRecord::new();
        assert!(record.add_finding("logs", "x", 1.5).is_err());
        assert!(record.add_finding("logs", "x", -0.1).is_err());
        assert!(record.add_finding("logs", "x", f64::NAN).is_err());
        assert!(record.findings().is_empty());
        assert!(record.add_finding("logs", "x", 0.0).is_ok());
        assert!(record.add_finding("logs", "x", 1.0).is_ok());
    }

    #[test]
    fn test_add_hypothesis() {
        let mut record = IncidentRecord::new();
        record.add_hypothesis(
            "Database pool exhaustion",
            vec!["ev1".to_string(), "ev2".to_string()],
        );
        assert_eq!(record.hypotheses().len(), 1);
        assert!(record.hypotheses()[0].description.contains("pool exhaustion"));
        assert_eq!(
            record.hypotheses()[0].supporting_evidence_ids,
            vec!["ev1".to_string(), "ev2".to_string()]
        );
    }

    #[test]
    fn test_add_evidence_returns_id() {
        let mut record = IncidentRecord::new();
        let id = record.add_evidence("logs", json!({"error": "timeout"}));
        assert_eq!(id.len(), EVIDENCE_ID_LEN);
        assert_eq!(record.evidence().len(), 1);
        assert_eq!(record.evidence()[0].id, id);
    }

    #[test]
    fn test_evidence_ids_are_distinct() {
        let mut record = IncidentRecord::new();
        let ids: HashSet<String> = (0..500)
            .map(|i| record.add_evidence("metrics", json!({ "sample": i })))
            .collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_incident_ids_are_unique() {
        assert_ne!(
            IncidentRecord::new().incident_id(),
            IncidentRecord::new().incident_id()
        );
    }

    #[test]
    fn test_empty_record_renders_placeholder() {
        let record = IncidentRecord::new();
        assert!(record.is_empty());
        assert_eq!(record.render_context(), EMPTY_CONTEXT);
    }

    #[test]
    fn test_render_context_section_order() {
        let mut record = IncidentRecord::new();
        record.add_evidence("logs", json!("raw log line"));
        record.add_hypothesis("Config change caused issue", vec![]);
        record.add_finding("logs", "Stack trace found", 0.85).unwrap();

        let ctx = record.render_context();
        let findings = ctx.find("## Findings").unwrap();
        let hypotheses = ctx.find("## Hypotheses").unwrap();
        let evidence = ctx.find("## Evidence").unwrap();
        assert!(findings < hypotheses && hypotheses < evidence);
        assert!(ctx.contains("- [logs] Stack trace found (confidence: 0.85)"));
        assert!(ctx.contains("- Config change caused issue"));
        assert!(ctx.contains("logs: raw log line"));
    }

    #[test]
    fn test_render_omits_empty_sections() {
        let mut record = IncidentRecord::new();
        record.add_finding("metrics", "CPU saturated", 0.8).unwrap();
        let ctx = record.render_context();
        assert!(ctx.starts_with("## Findings"));
        assert!(!ctx.contains("## Hypotheses"));
        assert!(!ctx.contains("## Evidence"));
    }

    #[test]
    fn test_evidence_rendering_is_capped() {
        let mut record = IncidentRecord::new();
        let id = record.add_evidence("logs", json!("é".repeat(2000)));
        let ctx = record.render_context();
        let line = ctx.lines().find(|l| l.contains(&id)).unwrap();
        let payload = line.split_once("logs: ").unwrap().1;
        assert_eq!(payload.chars().count(), MAX_EVIDENCE_RENDER_CHARS);
    }

    #[test]
    fn test_structured_evidence_renders_as_json() {
        let mut record = IncidentRecord::new();
        record.add_evidence("metrics", json!({"cpu_percent": 92.5}));
        assert!(record
            .render_context()
            .contains(r#"metrics: {"cpu_percent":92.5}"#));
    }

    #[test]
    fn test_render_is_stable_across_calls() {
        let mut record = IncidentRecord::new();
        record.add_finding("logs", "a", 0.5).unwrap();
        let first = record.render_context();
        assert_eq!(first, record.render_context());
        record.add_finding("metrics", "b", 0.5).unwrap();
        assert!(record.render_context().starts_with(&first));
    }

    #[tokio::test]
    async fn test_shared_record_concurrent_appends() {
        let shared = SharedIncidentRecord::new(IncidentRecord::new());
        let mut handles = Vec::new();
        for agent in ["logs", "metrics"] {
            let shared = shared.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..50 {
                    shared.add_evidence(agent, json!({ "i": i })).await;
                    shared.add_finding(agent, format!("{agent} {i}"), 0.5).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = shared.snapshot().await;
        assert_eq!(snapshot.incident_id(), shared.incident_id());
        assert_eq!(snapshot.findings().len(), 100);
        assert_eq!(snapshot.evidence().len(), 100);
        let ids: HashSet<&str> = snapshot.evidence().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids.len(), 100);
    }
}
