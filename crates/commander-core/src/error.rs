//! Error taxonomy for the incident commander.
//!
//! Every stage of an investigation reports failures through [`Error`]. The
//! orchestrator wraps the first failure of a run in a [`RunFailure`] that
//! names the stage it came from.

use crate::execution::{RunTrace, Stage};
use thiserror::Error;
use uuid::Uuid;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by investigation components.
#[derive(Debug, Error)]
pub enum Error {
    /// Inbound alert could not be interpreted as a mapping
    #[error("invalid alert payload: {0}")]
    InvalidPayload(String),

    /// An external telemetry source failed or timed out
    #[error("fetch from {source_name} failed: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// The reasoning service failed or timed out
    #[error("reasoning service failure: {0}")]
    Reasoning(String),

    /// The final reasoning output held no valid structured report
    #[error("failed to parse synthesis output: {0}")]
    SynthesisParse(String),

    /// An investigator task panicked or was cancelled
    #[error("investigator task aborted: {0}")]
    TaskAborted(String),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// A value violated a record or contract invariant
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization of an outbound payload failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem access failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid-payload error
    pub fn invalid_payload(msg: impl Into<String>) -> Self {
        Self::InvalidPayload(msg.into())
    }

    /// Create a fetch failure for the named telemetry source
    pub fn fetch(source_name: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: msg.into(),
        }
    }

    /// Create a reasoning-service failure
    pub fn reasoning(msg: impl Into<String>) -> Self {
        Self::Reasoning(msg.into())
    }

    /// Create a synthesis parse failure
    pub fn synthesis_parse(msg: impl Into<String>) -> Self {
        Self::SynthesisParse(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Short machine-readable code, used in API error bodies
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidPayload(_) => "INVALID_PAYLOAD",
            Error::Fetch { .. } => "FETCH_FAILURE",
            Error::Reasoning(_) => "REASONING_SERVICE_FAILURE",
            Error::SynthesisParse(_) => "SYNTHESIS_PARSE_FAILURE",
            Error::TaskAborted(_) => "TASK_ABORTED",
            Error::Config(_) => "CONFIGURATION_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Io(_) => "IO_ERROR",
        }
    }
}

/// Failure of a whole investigation run.
///
/// Carries the stage that failed, the error that stopped it and the trace up
/// to and including the failed span. Runs never return a partial report
/// alongside a failure.
#[derive(Debug, Error)]
#[error("investigation failed during {stage}: {cause}")]
pub struct RunFailure {
    /// Incident id, if the record had already been allocated
    pub incident_id: Option<Uuid>,
    /// Stage that raised the error
    pub stage: Stage,
    /// Originating error
    #[source]
    pub cause: Error,
    /// Stages visited, ending with the failed one
    pub trace: RunTrace,
}

impl RunFailure {
    pub fn new(incident_id: Option<Uuid>, stage: Stage, cause: Error, trace: RunTrace) -> Self {
        Self {
            incident_id,
            stage,
            cause,
            trace,
        }
    }
}
