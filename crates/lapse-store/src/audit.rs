//! Audit event types

use chrono::{DateTime, Local};
use lapse_api::RunMode;
use lapse_util::{InstanceId, RunId};
use serde::{Deserialize, Serialize};

/// Types of audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventType {
    /// A notify or execute run began
    RunStarted {
        run_id: RunId,
        mode: RunMode,
        dry_run: bool,
    },

    /// Inventory snapshot fetched
    SnapshotLoaded {
        run_id: RunId,
        provider: String,
        instance_count: usize,
    },

    /// Policy applied to the snapshot
    DecisionsEvaluated {
        run_id: RunId,
        none: usize,
        warn: usize,
        stop: usize,
    },

    /// One instruction handed to the executor
    InstructionExecuted {
        run_id: RunId,
        instance_id: InstanceId,
        kind: String,
        success: bool,
        error: Option<String>,
    },

    /// Run aborted before any instruction was executed
    RunFailed { run_id: RunId, reason: String },

    RunCompleted {
        run_id: RunId,
        instructions: usize,
        failures: usize,
    },
}

/// Full audit event with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event ID
    pub id: i64,

    /// Event timestamp
    pub timestamp: DateTime<Local>,

    /// Event type and details
    pub event: AuditEventType,
}

impl AuditEvent {
    pub fn new(event: AuditEventType) -> Self {
        Self::at(lapse_util::now(), event)
    }

    /// Event stamped with an explicit time, e.g. the run's evaluation time
    pub fn at(timestamp: DateTime<Local>, event: AuditEventType) -> Self {
        Self {
            id: 0, // Will be set by store
            timestamp,
            event,
        }
    }
}
