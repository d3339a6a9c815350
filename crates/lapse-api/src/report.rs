//! Run reports for reporting sinks

use chrono::{DateTime, Local};
use lapse_util::RunId;
use serde::{Deserialize, Serialize};

use crate::{Decision, Instance, Instruction, InstructionOutcome, LifecycleAction, RunMode};

/// An instance paired with the decision made for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub instance: Instance,
    pub decision: Decision,
}

/// Everything one run observed, decided and did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub mode: RunMode,
    pub dry_run: bool,
    pub evaluated_at: DateTime<Local>,
    /// In snapshot order
    pub entries: Vec<ReportEntry>,
    pub instructions: Vec<Instruction>,
    pub outcomes: Vec<InstructionOutcome>,
}

/// Counts for a run summary line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionCounts {
    pub total: usize,
    pub running: usize,
    pub none: usize,
    pub warn: usize,
    pub stop: usize,
}

impl RunReport {
    pub fn counts(&self) -> DecisionCounts {
        let mut counts = DecisionCounts {
            total: self.entries.len(),
            ..Default::default()
        };

        for entry in &self.entries {
            if entry.instance.state.is_running() {
                counts.running += 1;
            }
            match entry.decision.action {
                LifecycleAction::None => counts.none += 1,
                LifecycleAction::Warn => counts.warn += 1,
                LifecycleAction::Stop => counts.stop += 1,
            }
        }

        counts
    }

    pub fn failed_outcomes(&self) -> impl Iterator<Item = &InstructionOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Entries whose decision is `action`, in snapshot order
    pub fn entries_with(&self, action: LifecycleAction) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |e| e.decision.action == action)
    }
}
