//! Core lifecycle policy engine for lapse
//!
//! This crate is the heart of lapse, containing:
//! - Stop-after tag interpretation (missing / malformed / dated / weekends)
//! - Policy evaluation: one NONE / WARN / STOP decision per instance
//! - Decision-to-instruction planning, including warning annotations
//! - The run orchestrator tying provider, engine, executor and sinks together
//!
//! Evaluation and planning are pure: time is always passed in, nothing is
//! cached between calls, and instances are only ever borrowed.

mod engine;
mod planner;
mod runner;
mod tag;

pub use engine::*;
pub use planner::*;
pub use runner::*;
pub use tag::*;
