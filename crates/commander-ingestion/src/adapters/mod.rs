//! # Telemetry Adapters
//!
//! Implementations of the telemetry source traits in [`crate::telemetry`].
//!
//! ```text
//! ┌──────────────┐  ┌──────────────┐  ┌──────────────┐
//! │  LogSource   │  │MetricsSource │  │ DeploySource │
//! └──────┬───────┘  └──────┬───────┘  └──────┬───────┘
//!        │                 │                 │
//!        ▼                 ▼                 ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                 ADAPTER LAYER                       │
//! │   fixture (built-in incident data)                  │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! Adapters only convert. They never write to an incident record and never
//! call the reasoning service.

pub mod fixture;

pub use fixture::FixtureTelemetry;
