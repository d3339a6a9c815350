//! In-memory collaborators for unit and integration testing

use async_trait::async_trait;
use lapse_api::{Instance, InstanceState, Instruction, RunReport};
use lapse_util::InstanceId;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{ActionExecutor, CloudError, CloudResult, ReportingSink, SnapshotProvider};

/// Mock inventory
pub struct MockProvider {
    instances: Mutex<Vec<Instance>>,
    calls: AtomicUsize,

    /// Configure list_instances to fail
    pub fail_list: Mutex<bool>,
}

impl MockProvider {
    pub fn new(instances: Vec<Instance>) -> Self {
        Self {
            instances: Mutex::new(instances),
            calls: AtomicUsize::new(0),
            fail_list: Mutex::new(false),
        }
    }

    /// A provider whose inventory cannot be reached
    pub fn unavailable() -> Self {
        let provider = Self::new(Vec::new());
        *provider.fail_list.lock().unwrap() = true;
        provider
    }

    pub fn set_instances(&self, instances: Vec<Instance>) {
        *self.instances.lock().unwrap() = instances;
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SnapshotProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_instances(&self) -> CloudResult<Vec<Instance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if *self.fail_list.lock().unwrap() {
            return Err(CloudError::Unavailable("Mock provider failure".into()));
        }

        Ok(self.instances.lock().unwrap().clone())
    }
}

/// Mock executor that records instructions and simulates their effect
pub struct MockExecutor {
    executed: Mutex<Vec<Instruction>>,
    announcements: Mutex<Vec<(String, String)>>,
    states: Mutex<HashMap<InstanceId, InstanceState>>,
    tags: Mutex<HashMap<InstanceId, BTreeMap<String, String>>>,
    stop_calls: AtomicUsize,
    dry_run: bool,

    /// Configure stop to fail
    pub fail_stop: Mutex<bool>,

    /// Configure notify to fail
    pub fail_notify: Mutex<bool>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            announcements: Mutex::new(Vec::new()),
            states: Mutex::new(HashMap::new()),
            tags: Mutex::new(HashMap::new()),
            stop_calls: AtomicUsize::new(0),
            dry_run: false,
            fail_stop: Mutex::new(false),
            fail_notify: Mutex::new(false),
        }
    }

    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::new()
        }
    }

    /// Seed the simulated state of instances
    pub fn with_instances(self, instances: &[Instance]) -> Self {
        {
            let mut states = self.states.lock().unwrap();
            let mut tags = self.tags.lock().unwrap();
            for instance in instances {
                states.insert(instance.id.clone(), instance.state);
                tags.insert(instance.id.clone(), instance.tags.clone());
            }
        }
        self
    }

    /// Every instruction received, in order
    pub fn executed(&self) -> Vec<Instruction> {
        self.executed.lock().unwrap().clone()
    }

    /// Every run-level message as (channel, message), in order
    pub fn announcements(&self) -> Vec<(String, String)> {
        self.announcements.lock().unwrap().clone()
    }

    /// Number of stops that actually changed an instance
    pub fn effective_stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn state_of(&self, id: &InstanceId) -> Option<InstanceState> {
        self.states.lock().unwrap().get(id).copied()
    }

    pub fn tag_of(&self, id: &InstanceId, key: &str) -> Option<String> {
        self.tags
            .lock()
            .unwrap()
            .get(id)
            .and_then(|t| t.get(key).cloned())
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActionExecutor for MockExecutor {
    async fn execute(&self, instruction: &Instruction) -> CloudResult<()> {
        self.executed.lock().unwrap().push(instruction.clone());

        match instruction {
            Instruction::Stop { instance_id } => {
                if *self.fail_stop.lock().unwrap() {
                    return Err(CloudError::ActionFailed("Mock stop failure".into()));
                }
                let mut states = self.states.lock().unwrap();
                let state = states.entry(instance_id.clone()).or_insert(InstanceState::Running);
                if *state != InstanceState::Stopped {
                    *state = InstanceState::Stopped;
                    self.stop_calls.fetch_add(1, Ordering::SeqCst);
                }
                Ok(())
            }
            Instruction::Notify { .. } => {
                if *self.fail_notify.lock().unwrap() {
                    return Err(CloudError::ActionFailed("Mock notify failure".into()));
                }
                Ok(())
            }
            Instruction::Annotate {
                instance_id,
                tag_key,
                tag_value,
            } => {
                self.tags
                    .lock()
                    .unwrap()
                    .entry(instance_id.clone())
                    .or_default()
                    .insert(tag_key.clone(), tag_value.clone());
                Ok(())
            }
        }
    }

    async fn announce(&self, channel: &str, message: &str) -> CloudResult<()> {
        if *self.fail_notify.lock().unwrap() {
            return Err(CloudError::ActionFailed("Mock notify failure".into()));
        }
        self.announcements
            .lock()
            .unwrap()
            .push((channel.to_string(), message.to_string()));
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Mock reporting sink that keeps every published report
pub struct MockSink {
    reports: Mutex<Vec<RunReport>>,

    /// Configure publish to fail
    pub fail_publish: Mutex<bool>,
}

impl MockSink {
    pub fn new() -> Self {
        Self {
            reports: Mutex::new(Vec::new()),
            fail_publish: Mutex::new(false),
        }
    }

    pub fn reports(&self) -> Vec<RunReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl Default for MockSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportingSink for MockSink {
    async fn publish(&self, report: &RunReport) -> CloudResult<()> {
        if *self.fail_publish.lock().unwrap() {
            return Err(CloudError::Unavailable("Mock sink failure".into()));
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_provider_returns_instances() {
        let provider = MockProvider::new(vec![Instance::new("i-1", InstanceState::Running)]);

        let instances = provider.list_instances().await.unwrap();
        assert_eq!(instances.len(), 1);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn mock_provider_failure() {
        let provider = MockProvider::unavailable();
        let result = provider.list_instances().await;
        assert!(matches!(result, Err(CloudError::Unavailable(_))));
    }

    #[tokio::test]
    async fn stopping_twice_is_a_no_op() {
        let instance = Instance::new("i-1", InstanceState::Running);
        let executor = MockExecutor::new().with_instances(std::slice::from_ref(&instance));
        let stop = Instruction::Stop {
            instance_id: instance.id.clone(),
        };

        executor.execute(&stop).await.unwrap();
        executor.execute(&stop).await.unwrap();

        assert_eq!(executor.effective_stops(), 1);
        assert_eq!(executor.executed().len(), 2);
        assert_eq!(executor.state_of(&instance.id), Some(InstanceState::Stopped));
    }

    #[tokio::test]
    async fn annotate_writes_tag() {
        let executor = MockExecutor::new();
        let id = InstanceId::new("i-1");

        executor
            .execute(&Instruction::Annotate {
                instance_id: id.clone(),
                tag_key: "Stop after warned".into(),
                tag_value: "2024-01-01".into(),
            })
            .await
            .unwrap();

        assert_eq!(executor.tag_of(&id, "Stop after warned").as_deref(), Some("2024-01-01"));
    }

    #[tokio::test]
    async fn stop_failure_is_reported() {
        let executor = MockExecutor::new();
        *executor.fail_stop.lock().unwrap() = true;

        let result = executor
            .execute(&Instruction::Stop {
                instance_id: InstanceId::new("i-1"),
            })
            .await;
        assert!(matches!(result, Err(CloudError::ActionFailed(_))));
    }
}
