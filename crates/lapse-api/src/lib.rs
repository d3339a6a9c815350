//! Domain types shared by every lapse crate
//!
//! - Instances as observed in one inventory snapshot
//! - Lifecycle decisions produced by the policy engine
//! - Instructions handed to the action executor
//! - Run reports handed to reporting sinks

mod decision;
mod instructions;
mod report;
mod types;

pub use decision::*;
pub use instructions::*;
pub use report::*;
pub use types::*;

/// Tag key operators set to schedule a stop
pub const DEFAULT_STOP_AFTER_TAG: &str = "Stop after";

/// Tag key recording the last day an instance was warned
pub const DEFAULT_ANNOTATION_TAG: &str = "Stop after warned";

/// Tag key recording what lapse last did to an instance
pub const DEFAULT_STATE_TAG: &str = "Lapse state";

/// Tag key holding the owner's contact address
pub const CONTACT_TAG: &str = "Contact";
