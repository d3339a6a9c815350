//! Collaborator traits

use async_trait::async_trait;
use lapse_api::{Instance, Instruction, RunReport};
use lapse_util::InstanceId;
use thiserror::Error;

/// Errors from collaborator operations
#[derive(Debug, Error)]
pub enum CloudError {
    /// The inventory or service could not be reached
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// A record in the inventory is structurally broken
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceId),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CloudResult<T> = Result<T, CloudError>;

/// Supplies the current set of instances
#[async_trait]
pub trait SnapshotProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// List every instance with its tags, as of now
    async fn list_instances(&self) -> CloudResult<Vec<Instance>>;
}

/// Carries out instructions produced from decisions
///
/// Outcomes are reported back per instruction but never influence the
/// decisions of the same run.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Perform one instruction. Stopping an instance that is already stopped
    /// must succeed without doing anything.
    async fn execute(&self, instruction: &Instruction) -> CloudResult<()>;

    /// Post a message that concerns the run as a whole rather than one
    /// instance, such as a run that failed before anything was executed
    async fn announce(&self, channel: &str, message: &str) -> CloudResult<()>;

    /// Whether this executor only logs
    fn is_dry_run(&self) -> bool {
        false
    }
}

/// Receives the full instance/decision pairing of a run for audit or display
#[async_trait]
pub trait ReportingSink: Send + Sync {
    async fn publish(&self, report: &RunReport) -> CloudResult<()>;
}
