//! File-backed inventory snapshots

use async_trait::async_trait;
use lapse_api::Instance;
use lapse_cloud_api::{CloudError, CloudResult, SnapshotProvider};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads instances from a JSON array, as exported by the inventory job.
///
/// Each element looks like:
///
/// ```json
/// {"id": "i-0abc", "name": "build-box", "state": "running",
///  "tags": {"Stop after": "2024-01-03"}, "region": "us-west-2"}
/// ```
///
/// The file is re-read on every call.
pub struct JsonInventoryProvider {
    path: PathBuf,
}

impl JsonInventoryProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse an inventory document.
///
/// A state outside the recognized set, a missing id or any other structural
/// problem is reported as `InvalidRecord`.
pub fn parse_inventory(content: &str) -> CloudResult<Vec<Instance>> {
    serde_json::from_str(content).map_err(|e| CloudError::InvalidRecord(e.to_string()))
}

#[async_trait]
impl SnapshotProvider for JsonInventoryProvider {
    fn name(&self) -> &str {
        "json-inventory"
    }

    async fn list_instances(&self) -> CloudResult<Vec<Instance>> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            CloudError::Unavailable(format!("{}: {}", self.path.display(), e))
        })?;

        let instances = parse_inventory(&content)?;
        debug!(
            path = %self.path.display(),
            count = instances.len(),
            "Inventory read"
        );

        Ok(instances)
    }
}
