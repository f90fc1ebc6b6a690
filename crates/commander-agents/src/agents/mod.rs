//! Investigator roles
//!
//! Every role implements the [`Investigator`] contract and only ever appends
//! to the shared incident record.
//!
//! # Available Investigators
//!
//! - **LogsInvestigator**: error patterns and stack traces in the trailing
//!   log window. Runs in the parallel stage.
//!
//! - **MetricsInvestigator**: CPU, p99 latency and error-rate anomalies in
//!   the trailing metrics window. Runs in the parallel stage.
//!
//! - **DeployIntelInvestigator**: correlates prior findings with recent
//!   deploys and config changes, and proposes a root-cause hypothesis. Runs
//!   in the correlate stage.

pub mod contract;
pub mod deploy_intel;
pub mod logs;
pub mod metrics;

pub use contract::{
    Investigator, InvestigatorSettings, DEPLOY_EVIDENCE, DEPLOY_INTEL_AGENT, LOGS_AGENT,
    LOGS_EVIDENCE, METRICS_AGENT, METRICS_EVIDENCE,
};
pub use deploy_intel::{DeployIntelInvestigator, DEPLOY_INTEL_CONFIDENCE};
pub use logs::{LogsInvestigator, LOGS_CONFIDENCE};
pub use metrics::{MetricsInvestigator, METRICS_CONFIDENCE};
