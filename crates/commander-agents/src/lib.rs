//! # Incident Commander Agents
//!
//! The investigation pipeline:
//! - Reasoning-service client ([`reasoning`])
//! - Investigator roles ([`agents`])
//! - Decision synthesizer ([`synthesizer`])
//! - Orchestration graph ([`graph`])

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod agents;
pub mod graph;
pub mod reasoning;
pub mod synthesizer;

#[cfg(test)]
pub(crate) mod testing;

pub use graph::{GraphDescription, GraphStats, InvestigationGraph};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::agents::{
        DeployIntelInvestigator, Investigator, InvestigatorSettings, LogsInvestigator,
        MetricsInvestigator,
    };
    pub use crate::graph::{GraphDescription, GraphStats, InvestigationGraph};
    pub use crate::reasoning::{HttpReasoningClient, ReasoningService, StaticReasoning};
    pub use crate::synthesizer::{extract_report, DecisionSynthesizer};
}
