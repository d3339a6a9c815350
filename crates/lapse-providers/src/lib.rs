//! Concrete collaborators for lapse
//!
//! Provides:
//! - An inventory provider reading a JSON snapshot of instances
//! - A dry-run executor that only logs
//! - A journal executor appending instructions as NDJSON for a downstream actuator
//! - A webhook notifier posting notifications to a chat channel

mod dry_run;
mod inventory;
mod journal;
mod webhook;

pub use dry_run::*;
pub use inventory::*;
pub use journal::*;
pub use webhook::*;
