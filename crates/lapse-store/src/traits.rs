//! Store trait definitions

use chrono::{DateTime, Local};
use lapse_api::{Decision, DecisionCounts, RunMode, RunReport};
use lapse_util::{InstanceId, RunId};
use serde::{Deserialize, Serialize};

use crate::{AuditEvent, StoreResult};

/// Main store trait
pub trait Store: Send + Sync {
    // Audit log

    /// Append an audit event
    fn append_audit(&self, event: AuditEvent) -> StoreResult<()>;

    /// Get recent audit events, newest first
    fn get_recent_audits(&self, limit: usize) -> StoreResult<Vec<AuditEvent>>;

    // Run history

    /// Record a finished run and every decision it made. Recording the same
    /// run twice replaces the earlier copy.
    fn record_run(&self, report: &RunReport) -> StoreResult<()>;

    /// Most recent runs, newest first
    fn recent_runs(&self, limit: usize) -> StoreResult<Vec<RunSummary>>;

    /// Decisions of one run, in snapshot order
    fn get_run_decisions(&self, run_id: &RunId) -> StoreResult<Vec<Decision>>;

    /// The last recorded decision for an instance, across all runs
    fn latest_decision(&self, instance_id: &InstanceId) -> StoreResult<Option<DecisionRecord>>;

    // Health

    /// Check if store is healthy
    fn is_healthy(&self) -> bool;
}

/// Headline numbers of a recorded run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub mode: RunMode,
    pub dry_run: bool,
    pub evaluated_at: DateTime<Local>,
    pub counts: DecisionCounts,
    pub instructions: usize,
    pub failures: usize,
}

impl RunSummary {
    pub fn from_report(report: &RunReport) -> Self {
        Self {
            run_id: report.run_id.clone(),
            mode: report.mode,
            dry_run: report.dry_run,
            evaluated_at: report.evaluated_at,
            counts: report.counts(),
            instructions: report.instructions.len(),
            failures: report.failed_outcomes().count(),
        }
    }
}

/// A stored decision together with the run that made it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRecord {
    pub run_id: RunId,
    pub mode: RunMode,
    pub decision: Decision,
}
