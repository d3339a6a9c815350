//! Instructions for the action executor

use lapse_util::InstanceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which instructions a run may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Report what is due and record warnings, but stop nothing
    Notify,
    /// Also stop instances whose stop-after date has passed
    Execute,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Notify => "notify",
            RunMode::Execute => "execute",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "notify" => Ok(RunMode::Notify),
            "execute" => Ok(RunMode::Execute),
            other => Err(format!(
                "unexpected mode '{}', should be \"notify\" or \"execute\"",
                other
            )),
        }
    }
}

/// One imperative step for the action executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    /// Stop the instance. Stopping an already stopped instance is a no-op.
    Stop { instance_id: InstanceId },

    /// Post a message about the instance
    Notify {
        instance_id: InstanceId,
        channel: String,
        message: String,
    },

    /// Write a tag on the instance
    Annotate {
        instance_id: InstanceId,
        tag_key: String,
        tag_value: String,
    },
}

impl Instruction {
    pub fn instance_id(&self) -> &InstanceId {
        match self {
            Instruction::Stop { instance_id }
            | Instruction::Notify { instance_id, .. }
            | Instruction::Annotate { instance_id, .. } => instance_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Stop { .. } => "stop",
            Instruction::Notify { .. } => "notify",
            Instruction::Annotate { .. } => "annotate",
        }
    }
}

/// How the executor handled one instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed { error: String },
    /// Logged only, nothing was changed
    DryRun,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionOutcome {
    pub instruction: Instruction,
    pub status: OutcomeStatus,
}

impl InstructionOutcome {
    pub fn succeeded(instruction: Instruction) -> Self {
        Self {
            instruction,
            status: OutcomeStatus::Succeeded,
        }
    }

    pub fn failed(instruction: Instruction, error: impl Into<String>) -> Self {
        Self {
            instruction,
            status: OutcomeStatus::Failed {
                error: error.into(),
            },
        }
    }

    pub fn dry_run(instruction: Instruction) -> Self {
        Self {
            instruction,
            status: OutcomeStatus::DryRun,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, OutcomeStatus::Failed { .. })
    }
}
