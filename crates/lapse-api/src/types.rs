//! Instance snapshot types

use chrono::{DateTime, Utc};
use lapse_util::InstanceId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::CONTACT_TAG;

/// Provider states other than running/stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OtherState {
    Pending,
    Stopping,
    ShuttingDown,
    Terminated,
}

/// Lifecycle state of an instance at snapshot time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InstanceState {
    Running,
    Stopped,
    Other(OtherState),
}

/// A provider state string outside the recognized set
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized instance state '{0}'")]
pub struct UnknownStateError(pub String);

impl InstanceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceState::Running => "running",
            InstanceState::Stopped => "stopped",
            InstanceState::Other(OtherState::Pending) => "pending",
            InstanceState::Other(OtherState::Stopping) => "stopping",
            InstanceState::Other(OtherState::ShuttingDown) => "shutting-down",
            InstanceState::Other(OtherState::Terminated) => "terminated",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, InstanceState::Running)
    }
}

impl FromStr for InstanceState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "running" => Ok(InstanceState::Running),
            "stopped" => Ok(InstanceState::Stopped),
            "pending" => Ok(InstanceState::Other(OtherState::Pending)),
            "stopping" => Ok(InstanceState::Other(OtherState::Stopping)),
            "shutting-down" => Ok(InstanceState::Other(OtherState::ShuttingDown)),
            "terminated" => Ok(InstanceState::Other(OtherState::Terminated)),
            _ => Err(UnknownStateError(s.to_string())),
        }
    }
}

impl TryFrom<String> for InstanceState {
    type Error = UnknownStateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InstanceState> for String {
    fn from(state: InstanceState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One compute instance as observed in a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub id: InstanceId,

    #[serde(default)]
    pub name: Option<String>,

    pub state: InstanceState,

    #[serde(default)]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub launch_time: Option<DateTime<Utc>>,

    #[serde(default)]
    pub region: Option<String>,
}

impl Instance {
    pub fn new(id: impl Into<InstanceId>, state: InstanceState) -> Self {
        Self {
            id: id.into(),
            name: None,
            state,
            tags: BTreeMap::new(),
            launch_time: None,
            region: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Name if set, otherwise the id
    pub fn display_name(&self) -> &str {
        match &self.name {
            Some(name) if !name.is_empty() => name,
            _ => self.id.as_str(),
        }
    }

    pub fn contact(&self) -> Option<&str> {
        self.tag(CONTACT_TAG).filter(|c| !c.is_empty())
    }
}
