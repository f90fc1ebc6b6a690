//! Alert normalization.
//!
//! Converts inbound webhook payloads into one canonical [`AlertEvent`].
//! Two shapes are recognized:
//!
//! - **Alertmanager batch**: a non-empty `alerts` array whose first entry
//!   carries `labels` (`alertname`, `service` / `job`) and `annotations`
//!   (`threshold`, `value`).
//! - **Flat webhook**: top-level `trigger_kind` (or the older
//!   `trigger_type`), `service`, `threshold`, `value`.
//!
//! Normalization is best-effort. Missing or unparseable fields fall back to
//! defaults; only a payload that is not a JSON object is rejected.

use chrono::{DateTime, Utc};
use incident_commander_core::alert::{AlertEvent, TriggerKind};
use incident_commander_core::{Error, Result};
use serde_json::{Map, Value};
use tracing::debug;

/// Service name used when the payload does not name one.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// Normalize an inbound payload into an [`AlertEvent`].
pub fn normalize(payload: &Value) -> Result<AlertEvent> {
    let object = payload.as_object().ok_or_else(|| {
        Error::invalid_payload(format!(
            "expected a JSON object, got {}",
            json_type_name(payload)
        ))
    })?;

    let alert = match object.get("alerts").and_then(Value::as_array) {
        Some(alerts) if !alerts.is_empty() => {
            debug!(batch_size = alerts.len(), "normalizing alertmanager payload");
            from_batch(&alerts[0], payload)
        }
        _ => {
            debug!("normalizing flat webhook payload");
            from_flat(object, payload)
        }
    };

    Ok(alert)
}

fn from_batch(entry: &Value, payload: &Value) -> AlertEvent {
    let empty = Map::new();
    let labels = entry.get("labels").and_then(Value::as_object).unwrap_or(&empty);
    let annotations = entry
        .get("annotations")
        .and_then(Value::as_object)
        .unwrap_or(&empty);

    let alert_name = labels
        .get("alertname")
        .map(value_as_text)
        .unwrap_or_default()
        .to_lowercase();
    let trigger_kind = if alert_name.contains("latency") {
        TriggerKind::LatencySpike
    } else {
        TriggerKind::ErrorRate
    };

    let service = labels
        .get("service")
        .and_then(Value::as_str)
        .or_else(|| labels.get("job").and_then(Value::as_str))
        .unwrap_or(UNKNOWN_SERVICE)
        .to_string();

    AlertEvent {
        trigger_kind,
        service,
        timestamp: entry
            .get("startsAt")
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
        threshold: annotations.get("threshold").and_then(parse_number).unwrap_or(0.0),
        value: annotations.get("value").and_then(parse_number),
        raw_payload: payload.clone(),
    }
}

fn from_flat(object: &Map<String, Value>, payload: &Value) -> AlertEvent {
    let trigger_kind = object
        .get("trigger_kind")
        .or_else(|| object.get("trigger_type"))
        .and_then(Value::as_str)
        .and_then(TriggerKind::parse)
        .unwrap_or_default();

    let service = object
        .get("service")
        .and_then(Value::as_str)
        .unwrap_or(UNKNOWN_SERVICE)
        .to_string();

    AlertEvent {
        trigger_kind,
        service,
        timestamp: object
            .get("timestamp")
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now),
        threshold: object.get("threshold").and_then(parse_number).unwrap_or(0.0),
        value: object.get("value").and_then(parse_number),
        raw_payload: payload.clone(),
    }
}

/// Accept JSON numbers and numeric strings; anything else is absent.
fn parse_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    value
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
