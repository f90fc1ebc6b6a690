//! API request handlers.
//!
//! - Alert webhook ([`alerts`])
//! - Health ([`health`])
//! - Commander config and statistics ([`commander`])

pub mod alerts;
pub mod commander;
pub mod health;

pub use alerts::*;
pub use commander::*;
pub use health::*;
