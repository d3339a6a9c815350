//! Run orchestration: snapshot, evaluate, plan, execute, report

use chrono::{DateTime, Local};
use lapse_api::{
    Instance, Instruction, InstructionOutcome, LifecycleAction, OutcomeStatus, ReportEntry, RunMode,
    RunReport,
};
use lapse_cloud_api::{ActionExecutor, CloudError, ReportingSink, SnapshotProvider};
use lapse_config::Policy;
use lapse_store::{AuditEvent, AuditEventType, Store};
use lapse_util::{InstanceId, LapseError, Result, RunId};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::evaluate;
use crate::planner::plan_instructions;
use crate::tag::PriorAnnotations;

/// Drives one notify or execute run against its collaborators.
///
/// The runner keeps no state between runs. Everything a run knows comes
/// from the snapshot it fetches and the time it is given.
pub struct Runner {
    policy: Policy,
    provider: Arc<dyn SnapshotProvider>,
    executor: Arc<dyn ActionExecutor>,
    store: Arc<dyn Store>,
    sinks: Vec<Arc<dyn ReportingSink>>,
}

impl Runner {
    pub fn new(
        policy: Policy,
        provider: Arc<dyn SnapshotProvider>,
        executor: Arc<dyn ActionExecutor>,
        store: Arc<dyn Store>,
    ) -> Self {
        Self {
            policy,
            provider,
            executor,
            store,
            sinks: Vec::new(),
        }
    }

    /// Add a sink that receives the report of every successful run
    pub fn with_sink(mut self, sink: Arc<dyn ReportingSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Perform one run.
    ///
    /// Fails with `ProviderUnavailable` if no snapshot could be fetched and
    /// with `InvalidInput` if the snapshot is unusable; in both cases nothing
    /// is executed. Executor and sink failures do not fail the run: executor
    /// failures are recorded in the report, sink failures are logged.
    pub async fn run(&self, mode: RunMode, now: DateTime<Local>) -> Result<RunReport> {
        let run_id = RunId::new();
        let dry_run = self.executor.is_dry_run();

        info!(run_id = %run_id, mode = %mode, dry_run, now = %now, "Run started");
        self.audit(
            now,
            AuditEventType::RunStarted {
                run_id: run_id.clone(),
                mode,
                dry_run,
            },
        );

        let instances = match self.fetch_snapshot(&run_id, now).await {
            Ok(instances) => instances,
            Err(e) => return Err(self.fail(&run_id, mode, now, e).await),
        };

        let decisions = match evaluate(&instances, now, &self.policy.lifecycle) {
            Ok(decisions) => decisions,
            Err(e) => return Err(self.fail(&run_id, mode, now, e).await),
        };

        let prior = PriorAnnotations::from_instances(&instances, &self.policy.lifecycle);
        let instructions = plan_instructions(&decisions, &prior, &self.policy, mode);

        let entries: Vec<ReportEntry> = instances
            .into_iter()
            .zip(decisions)
            .map(|(instance, decision)| ReportEntry { instance, decision })
            .collect();

        let count = |action: LifecycleAction| {
            entries.iter().filter(|e| e.decision.action == action).count()
        };
        self.audit(
            now,
            AuditEventType::DecisionsEvaluated {
                run_id: run_id.clone(),
                none: count(LifecycleAction::None),
                warn: count(LifecycleAction::Warn),
                stop: count(LifecycleAction::Stop),
            },
        );

        let mut outcomes = Vec::with_capacity(instructions.len());
        let mut failed_stops = HashSet::new();
        for instruction in &instructions {
            if self.records_failed_stop(instruction, &failed_stops) {
                debug!(instance_id = %instruction.instance_id(), "Stop failed, state tag not written");
                outcomes.push(InstructionOutcome::failed(
                    instruction.clone(),
                    "not attempted: the stop failed",
                ));
                continue;
            }

            let outcome = match self.executor.execute(instruction).await {
                Ok(()) if dry_run => InstructionOutcome::dry_run(instruction.clone()),
                Ok(()) => InstructionOutcome::succeeded(instruction.clone()),
                Err(e) => {
                    warn!(
                        instance_id = %instruction.instance_id(),
                        kind = instruction.kind(),
                        error = %e,
                        "Instruction failed"
                    );
                    if let Instruction::Stop { instance_id } = instruction {
                        failed_stops.insert(instance_id.clone());
                    }
                    InstructionOutcome::failed(instruction.clone(), e.to_string())
                }
            };

            self.audit(
                now,
                AuditEventType::InstructionExecuted {
                    run_id: run_id.clone(),
                    instance_id: instruction.instance_id().clone(),
                    kind: instruction.kind().to_string(),
                    success: !outcome.is_failure(),
                    error: match &outcome.status {
                        OutcomeStatus::Failed { error } => Some(error.clone()),
                        _ => None,
                    },
                },
            );
            outcomes.push(outcome);
        }

        let report = RunReport {
            run_id: run_id.clone(),
            mode,
            dry_run,
            evaluated_at: now,
            entries,
            instructions,
            outcomes,
        };

        for sink in &self.sinks {
            if let Err(e) = sink.publish(&report).await {
                warn!(run_id = %run_id, error = %e, "Failed to publish run report");
            }
        }

        let counts = report.counts();
        let failures = report.failed_outcomes().count();
        self.audit(
            now,
            AuditEventType::RunCompleted {
                run_id: run_id.clone(),
                instructions: report.instructions.len(),
                failures,
            },
        );

        info!(
            run_id = %run_id,
            total = counts.total,
            running = counts.running,
            warn = counts.warn,
            stop = counts.stop,
            instructions = report.instructions.len(),
            failures,
            "Run completed"
        );

        Ok(report)
    }

    async fn fetch_snapshot(&self, run_id: &RunId, now: DateTime<Local>) -> Result<Vec<Instance>> {
        let instances = self
            .provider
            .list_instances()
            .await
            .map_err(|e| match e {
                CloudError::InvalidRecord(msg) => LapseError::invalid_input(msg),
                other => LapseError::provider_unavailable(other.to_string()),
            })?;

        debug!(
            provider = self.provider.name(),
            instances = instances.len(),
            "Snapshot loaded"
        );
        self.audit(
            now,
            AuditEventType::SnapshotLoaded {
                run_id: run_id.clone(),
                provider: self.provider.name().to_string(),
                instance_count: instances.len(),
            },
        );

        Ok(instances)
    }

    /// Whether `instruction` would record a stop that failed earlier in this run
    fn records_failed_stop(
        &self,
        instruction: &Instruction,
        failed_stops: &HashSet<InstanceId>,
    ) -> bool {
        match instruction {
            Instruction::Annotate {
                instance_id,
                tag_key,
                ..
            } => *tag_key == self.policy.lifecycle.state_tag_key && failed_stops.contains(instance_id),
            _ => false,
        }
    }

    async fn fail(
        &self,
        run_id: &RunId,
        mode: RunMode,
        now: DateTime<Local>,
        error: LapseError,
    ) -> LapseError {
        warn!(run_id = %run_id, error = %error, "Run failed, nothing executed");
        self.audit(
            now,
            AuditEventType::RunFailed {
                run_id: run_id.clone(),
                reason: error.to_string(),
            },
        );

        let channel = &self.policy.notifications.channel;
        let message = format!("lapse failed to run the '{}' command: {}", mode, error);
        if let Err(e) = self.executor.announce(channel, &message).await {
            warn!(run_id = %run_id, channel = %channel, error = %e, "Failed to announce run failure");
        }

        error
    }

    fn audit(&self, now: DateTime<Local>, event: AuditEventType) {
        if let Err(e) = self.store.append_audit(AuditEvent::at(now, event)) {
            warn!(error = %e, "Failed to append audit event");
        }
    }
}
