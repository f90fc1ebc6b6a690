//! # Incident Commander API
//!
//! HTTP front door for the investigation pipeline:
//! - `POST /webhook/alert` runs one investigation per alert
//! - `GET /health` liveness
//! - `GET /api/v1/commander/config` and `/stats` for operators

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod handlers;
pub mod middleware;
pub mod routes;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Server settings for the HTTP layer.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
    /// Whole-request timeout. Must cover a full investigation run.
    pub timeout_secs: u64,
    pub enable_logging: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            timeout_secs: 480,
            enable_logging: true,
        }
    }
}

/// Envelope for successful operator responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
}

impl<T> SuccessResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Body returned for rejected requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error code
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Re-export commonly used types
pub mod prelude {
    pub use crate::handlers::{CommanderState, HealthState};
    pub use crate::routes::create_router;
    pub use crate::{ApiConfig, ErrorResponse, SuccessResponse};
}
