//! # Incident Commander Core
//!
//! Shared types for the incident commander:
//! - Error taxonomy ([`Error`], [`RunFailure`])
//! - Canonical alert ([`alert::AlertEvent`])
//! - Incident record, the append-only shared memory of a run ([`record`])
//! - Root-cause report ([`report::RcaReport`])
//! - Stage model and run trace ([`execution`])
//! - Configuration ([`config::Config`])

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod alert;
pub mod config;
pub mod error;
pub mod execution;
pub mod record;
pub mod report;

pub use error::{Error, Result, RunFailure};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::alert::{AlertEvent, AlertSummary, TriggerKind};
    pub use crate::config::{Config, InvestigationConfig, ReasoningConfig, ReasoningProvider};
    pub use crate::execution::{RunTrace, RunTraceCollector, Stage, StageSpan};
    pub use crate::record::{Evidence, Finding, Hypothesis, IncidentRecord, SharedIncidentRecord};
    pub use crate::report::{EvidenceSummary, InvestigationOutcome, RcaReport};
    pub use crate::{Error, Result, RunFailure};
}
