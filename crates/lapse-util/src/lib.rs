//! Shared utilities for lapse
//!
//! This crate provides:
//! - ID types (InstanceId, RunId)
//! - Time utilities (injectable "now", stop-after date parsing, day arithmetic)
//! - Error types
//! - Rate limiting helpers
//! - Default paths for config, data, and journal files

mod error;
mod ids;
mod paths;
mod rate_limit;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use rate_limit::*;
pub use time::*;
