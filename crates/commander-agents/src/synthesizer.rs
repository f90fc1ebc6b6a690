//! Decision synthesizer.
//!
//! Turns the full incident record into an [`RcaReport`] with a single
//! reasoning call. The reply is expected to be JSON but may arrive wrapped in
//! a fenced code block or surrounded by prose inside one. Anything that does
//! not decode to the report shape fails the run; nothing is guessed.

use crate::reasoning::{complete_within, ReasoningService};
use incident_commander_core::prelude::{EvidenceSummary, IncidentRecord, RcaReport};
use incident_commander_core::report::{DECISION_ENGINE_SOURCE, DEFAULT_SUMMARY_CONFIDENCE};
use incident_commander_core::{Error, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DECISION_SYSTEM_PROMPT: &str = r#"You are a Decision & Action Engine. Synthesize all findings, hypotheses, and evidence into:
1. A concise incident summary
2. The most likely root cause
3. A brief evidence summary (list of key points)
4. Recommended actions (e.g., "Rollback to version v2.3.0", "Increase database pool size")

Output MUST be valid JSON in this exact format:
{
  "summary": "...",
  "root_cause": "...",
  "evidence_summary": ["...", "..."],
  "recommended_actions": ["...", "..."]
}"#;

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fence pattern is a valid regex")
    })
}

/// Produces the final report from an incident record.
pub struct DecisionSynthesizer {
    reasoning: Arc<dyn ReasoningService>,
    timeout: Duration,
}

impl std::fmt::Debug for DecisionSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionSynthesizer")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl DecisionSynthesizer {
    pub fn new(reasoning: Arc<dyn ReasoningService>, timeout: Duration) -> Self {
        Self { reasoning, timeout }
    }

    pub async fn synthesize(&self, record: &IncidentRecord) -> Result<RcaReport> {
        let prompt = format!(
            "Incident ID: {}\n\nAll findings, hypotheses, and evidence:\n{}\n\nGenerate the RCA report as JSON.",
            record.incident_id(),
            record.render_context()
        );

        let raw = complete_within(
            self.reasoning.as_ref(),
            self.timeout,
            DECISION_SYSTEM_PROMPT,
            &prompt,
        )
        .await?;
        debug!(incident_id = %record.incident_id(), chars = raw.len(), "synthesis reply received");

        let report = extract_report(&raw).map_err(|e| {
            warn!(incident_id = %record.incident_id(), error = %e, "synthesis reply rejected");
            e
        })?;
        info!(
            incident_id = %record.incident_id(),
            actions = report.recommended_actions.len(),
            "rca report synthesized"
        );
        Ok(report)
    }
}

/// Decode a reasoning reply into a report.
///
/// The first fenced block is parsed when present, otherwise the whole trimmed
/// text. The decoded value must be an object.
pub fn extract_report(raw: &str) -> Result<RcaReport> {
    let fenced = fence_regex().captures(raw).and_then(|c| c.get(1));
    let payload = match fenced {
        Some(block) => block.as_str().trim(),
        None => raw.trim(),
    };

    let value: Value = serde_json::from_str(payload)
        .map_err(|e| Error::synthesis_parse(format!("reply is not valid JSON: {}", e)))?;

    let fields = match value {
        Value::Object(fields) => fields,
        other => {
            return Err(Error::synthesis_parse(format!(
                "expected a JSON object, got {}",
                type_name(&other)
            )))
        }
    };

    Ok(RcaReport {
        summary: string_field(&fields, "summary")?,
        root_cause: string_field(&fields, "root_cause")?,
        evidence_summary: evidence_field(&fields)?,
        recommended_actions: actions_field(&fields)?,
    })
}

/// Present-but-null fields are treated as missing.
fn field<'a>(fields: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    fields.get(name).filter(|v| !v.is_null())
}

fn string_field(fields: &Map<String, Value>, name: &str) -> Result<String> {
    match field(fields, name) {
        None => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(wrong_type(name, "a string", other)),
    }
}

fn actions_field(fields: &Map<String, Value>) -> Result<Vec<String>> {
    match field(fields, "recommended_actions") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                other => Err(wrong_type("recommended_actions[]", "a string", other)),
            })
            .collect(),
        Some(other) => Err(wrong_type("recommended_actions", "an array", other)),
    }
}

fn evidence_field(fields: &Map<String, Value>) -> Result<Vec<EvidenceSummary>> {
    match field(fields, "evidence_summary") {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(evidence_entry).collect(),
        Some(other) => Err(wrong_type("evidence_summary", "an array", other)),
    }
}

fn evidence_entry(item: &Value) -> Result<EvidenceSummary> {
    match item {
        Value::String(s) => Ok(EvidenceSummary::from_description(s.clone())),
        Value::Object(entry) => {
            let description = match field(entry, "description") {
                None => item.to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => return Err(wrong_type("evidence_summary[].description", "a string", other)),
            };
            let source = match field(entry, "source") {
                None => DECISION_ENGINE_SOURCE.to_string(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => return Err(wrong_type("evidence_summary[].source", "a string", other)),
            };
            let confidence = match field(entry, "confidence") {
                None => DEFAULT_SUMMARY_CONFIDENCE,
                Some(Value::Number(n)) => match n.as_f64() {
                    Some(c) if (0.0..=1.0).contains(&c) => c,
                    _ => {
                        return Err(Error::synthesis_parse(format!(
                            "evidence_summary[].confidence must be within [0, 1], got {}",
                            n
                        )))
                    }
                },
                Some(other) => return Err(wrong_type("evidence_summary[].confidence", "a number", other)),
            };
            Ok(EvidenceSummary {
                description,
                source,
                confidence,
            })
        }
        Value::Array(_) => Err(wrong_type("evidence_summary[]", "a string or object", item)),
        scalar => Ok(EvidenceSummary::from_description(scalar.to_string())),
    }
}

fn wrong_type(name: &str, expected: &str, found: &Value) -> Error {
    Error::synthesis_parse(format!(
        "field {} must be {}, got {}",
        name,
        expected,
        type_name(found)
    ))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
