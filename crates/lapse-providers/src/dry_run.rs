//! Executor that only logs

use async_trait::async_trait;
use lapse_api::Instruction;
use lapse_cloud_api::{ActionExecutor, CloudResult};
use tracing::info;

/// Logs every instruction and changes nothing
#[derive(Debug, Default)]
pub struct DryRunExecutor;

impl DryRunExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ActionExecutor for DryRunExecutor {
    async fn execute(&self, instruction: &Instruction) -> CloudResult<()> {
        match instruction {
            Instruction::Stop { instance_id } => {
                info!(instance_id = %instance_id, "[dry run] would stop instance");
            }
            Instruction::Notify {
                instance_id,
                channel,
                message,
            } => {
                info!(instance_id = %instance_id, channel = %channel, message = %message, "[dry run] would notify");
            }
            Instruction::Annotate {
                instance_id,
                tag_key,
                tag_value,
            } => {
                info!(
                    instance_id = %instance_id,
                    tag_key = %tag_key,
                    tag_value = %tag_value,
                    "[dry run] would tag instance"
                );
            }
        }
        Ok(())
    }

    async fn announce(&self, channel: &str, message: &str) -> CloudResult<()> {
        info!(channel = %channel, message = %message, "[dry run] would announce");
        Ok(())
    }

    fn is_dry_run(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_util::InstanceId;

    #[tokio::test]
    async fn always_succeeds() {
        let executor = DryRunExecutor::new();
        assert!(executor.is_dry_run());

        let stop = Instruction::Stop {
            instance_id: InstanceId::new("i-1"),
        };
        assert!(executor.execute(&stop).await.is_ok());
    }
}
