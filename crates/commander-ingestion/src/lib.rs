//! # Incident Commander Ingestion
//!
//! Everything that brings outside data into an investigation:
//! - Alert normalization from webhook payloads ([`normalizer`])
//! - Telemetry source traits and record types ([`telemetry`])
//! - Source adapters ([`adapters`])

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod adapters;
pub mod normalizer;
pub mod telemetry;

pub use normalizer::normalize;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::adapters::FixtureTelemetry;
    pub use crate::normalizer::{normalize, UNKNOWN_SERVICE};
    pub use crate::telemetry::{
        ConfigChange, DeployRecord, DeploySource, LogRecord, LogSource, MetricsSnapshot,
        MetricsSource,
    };
}
