//! Execution trace for investigation runs.
//!
//! Each run walks a fixed sequence of stages:
//!
//! ```text
//! INIT → PARALLEL_INVESTIGATE → CORRELATE → SYNTHESIZE → DONE
//! ```
//!
//! The orchestrator opens one [`StageSpan`] per stage it enters. Spans are
//! append-only and ordered by entry, so a finished [`RunTrace`] reads as the
//! path the run actually took, including the stage that failed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// =============================================================================
// STAGES
// =============================================================================

/// Stages of the investigation graph, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Allocate the incident record
    Init,
    /// Logs and metrics investigators, concurrently
    ParallelInvestigate,
    /// Deploy-intelligence investigator, after the parallel barrier
    Correlate,
    /// Decision synthesis into the RCA report
    Synthesize,
    /// Terminal
    Done,
}

impl Stage {
    /// The stage that follows this one. `Done` is terminal.
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Init => Some(Stage::ParallelInvestigate),
            Stage::ParallelInvestigate => Some(Stage::Correlate),
            Stage::Correlate => Some(Stage::Synthesize),
            Stage::Synthesize => Some(Stage::Done),
            Stage::Done => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::ParallelInvestigate => "parallel_investigate",
            Stage::Correlate => "correlate",
            Stage::Synthesize => "synthesize",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SPANS
// =============================================================================

/// Status of a stage span.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpanStatus {
    Running,
    Completed,
    Failed,
}

/// Something a stage produced, referenced by a stable id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    /// Stable reference (evidence id, agent name, incident id)
    pub reference: String,
    /// What kind of artifact this is
    pub kind: String,
}

/// One stage of one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSpan {
    pub span_id: Uuid,
    pub stage: Stage,
    pub status: SpanStatus,
    pub start_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failure_reasons: Vec<String>,
}

impl StageSpan {
    /// Open a running span for a stage.
    pub fn open(stage: Stage) -> Self {
        Self {
            span_id: Uuid::new_v4(),
            stage,
            status: SpanStatus::Running,
            start_time: Utc::now(),
            end_time: None,
            artifacts: Vec::new(),
            failure_reasons: Vec::new(),
        }
    }

    pub fn complete(&mut self) {
        self.status = SpanStatus::Completed;
        self.end_time = Some(Utc::now());
    }

    pub fn fail(&mut self, reasons: Vec<String>) {
        self.status = SpanStatus::Failed;
        self.end_time = Some(Utc::now());
        self.failure_reasons = reasons;
    }

    pub fn attach_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Wall-clock duration, once the span has closed.
    pub fn duration_ms(&self) -> Option<i64> {
        self.end_time
            .map(|end| (end - self.start_time).num_milliseconds())
    }
}

// =============================================================================
// RUN TRACE
// =============================================================================

/// All stage spans of one investigation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunTrace {
    pub run_id: Uuid,
    pub spans: Vec<StageSpan>,
}

impl RunTrace {
    /// The stage the run ended in, if any span was opened.
    pub fn last_stage(&self) -> Option<Stage> {
        self.spans.last().map(|s| s.stage)
    }

    /// Stages visited, in order.
    pub fn stages(&self) -> Vec<Stage> {
        self.spans.iter().map(|s| s.stage).collect()
    }

    /// Check that the visited stages follow the fixed order with no skips.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        match self.spans.first() {
            Some(first) if first.stage != Stage::Init => {
                errors.push(format!("run must start at init, started at {}", first.stage));
            }
            None => errors.push("no stage spans recorded".to_string()),
            _ => {}
        }

        for pair in self.spans.windows(2) {
            if pair[0].stage.next() != Some(pair[1].stage) {
                errors.push(format!(
                    "illegal transition {} -> {}",
                    pair[0].stage, pair[1].stage
                ));
            }
            if pair[0].status != SpanStatus::Completed {
                errors.push(format!(
                    "stage {} was left {:?} before {} started",
                    pair[0].stage, pair[0].status, pair[1].stage
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Thread-safe collector for stage spans while a run is in flight.
#[derive(Debug, Clone)]
pub struct RunTraceCollector {
    run_id: Uuid,
    spans: Arc<Mutex<Vec<StageSpan>>>,
}

impl Default for RunTraceCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTraceCollector {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            spans: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    fn spans(&self) -> MutexGuard<'_, Vec<StageSpan>> {
        // Only push and clone run under the lock; a poisoned vec is still whole.
        self.spans.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a closed span.
    pub fn add_span(&self, span: StageSpan) {
        self.spans().push(span);
    }

    /// Snapshot the spans collected so far.
    pub fn finalize(&self) -> RunTrace {
        RunTrace {
            run_id: self.run_id,
            spans: self.spans().clone(),
        }
    }
}
