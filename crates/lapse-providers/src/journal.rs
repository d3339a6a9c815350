//! Instruction journal consumed by the cloud-side worker

use async_trait::async_trait;
use chrono::{DateTime, Local};
use lapse_api::Instruction;
use lapse_cloud_api::{ActionExecutor, CloudError, CloudResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

/// A run-level message for the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub channel: String,
    pub message: String,
}

/// One journal line. Exactly one of `instruction` and `announcement` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub recorded_at: DateTime<Local>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<Instruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub announcement: Option<Announcement>,
}

/// Appends every instruction as one line of JSON to a journal file.
///
/// Appends are serialized so that lines from concurrent calls never
/// interleave. Parent directories are created on first write.
pub struct JournalExecutor {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JournalExecutor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &str) -> std::io::Result<()> {
        let _guard = self.write_lock.lock().await;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }

    async fn write_entry(&self, entry: &JournalEntry) -> CloudResult<()> {
        let line = serde_json::to_string(entry).map_err(|e| CloudError::Internal(e.to_string()))?;

        self.append(&line)
            .await
            .map_err(|e| CloudError::ActionFailed(format!("{}: {}", self.path.display(), e)))
    }
}

/// Parse journal content. Blank lines are ignored, any other bad line is an error.
pub fn read_journal(content: &str) -> CloudResult<Vec<JournalEntry>> {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let entry: JournalEntry =
                serde_json::from_str(line).map_err(|e| CloudError::InvalidRecord(e.to_string()))?;
            if entry.instruction.is_some() == entry.announcement.is_some() {
                return Err(CloudError::InvalidRecord(
                    "entry must hold an instruction or an announcement".into(),
                ));
            }
            Ok(entry)
        })
        .collect()
}

#[async_trait]
impl ActionExecutor for JournalExecutor {
    async fn execute(&self, instruction: &Instruction) -> CloudResult<()> {
        self.write_entry(&JournalEntry {
            recorded_at: lapse_util::now(),
            instruction: Some(instruction.clone()),
            announcement: None,
        })
        .await?;

        debug!(
            instance_id = %instruction.instance_id(),
            kind = instruction.kind(),
            path = %self.path.display(),
            "Instruction journaled"
        );
        Ok(())
    }

    async fn announce(&self, channel: &str, message: &str) -> CloudResult<()> {
        self.write_entry(&JournalEntry {
            recorded_at: lapse_util::now(),
            instruction: None,
            announcement: Some(Announcement {
                channel: channel.to_string(),
                message: message.to_string(),
            }),
        })
        .await?;

        debug!(channel, path = %self.path.display(), "Announcement journaled");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_util::InstanceId;

    #[tokio::test]
    async fn appends_one_line_per_instruction() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("instructions.ndjson");
        let executor = JournalExecutor::new(&path);

        let stop = Instruction::Stop {
            instance_id: InstanceId::new("i-1"),
        };
        let annotate = Instruction::Annotate {
            instance_id: InstanceId::new("i-2"),
            tag_key: "Stop after warned".into(),
            tag_value: "2024-01-01".into(),
        };

        executor.execute(&stop).await.unwrap();
        executor.execute(&annotate).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().next().unwrap().contains(r#""type":"stop""#));

        let entries = read_journal(&content).unwrap();
        assert_eq!(entries[0].instruction, Some(stop));
        assert_eq!(entries[1].instruction, Some(annotate));
    }

    #[tokio::test]
    async fn announcements_get_their_own_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instructions.ndjson");
        let executor = JournalExecutor::new(&path);

        executor.announce("#ops", "run failed").await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("\"instruction\""));
        let entries = read_journal(&content).unwrap();
        assert_eq!(
            entries[0].announcement,
            Some(Announcement {
                channel: "#ops".into(),
                message: "run failed".into(),
            })
        );
        assert!(entries[0].instruction.is_none());
    }

    #[test]
    fn empty_entry_is_rejected() {
        assert!(matches!(
            read_journal("{\"recorded_at\":\"2024-01-01T12:00:00+00:00\"}\n"),
            Err(CloudError::InvalidRecord(_))
        ));
    }

    #[test]
    fn bad_line_is_rejected() {
        assert!(matches!(
            read_journal("{\"recorded_at\":\"2024-01-01T12:00:00+00:00\",\"instruction\":{\"type\":\"explode\"}}\n"),
            Err(CloudError::InvalidRecord(_))
        ));
    }
}
