//! Lifecycle decisions

use chrono::{DateTime, Local, NaiveDate};
use lapse_util::InstanceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What is due for an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    None,
    Warn,
    Stop,
}

impl LifecycleAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::None => "none",
            LifecycleAction::Warn => "warn",
            LifecycleAction::Stop => "stop",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(LifecycleAction::None),
            "warn" => Ok(LifecycleAction::Warn),
            "stop" => Ok(LifecycleAction::Stop),
            other => Err(format!("unknown lifecycle action '{}'", other)),
        }
    }
}

/// Action taken for a running instance that has no stop-after tag.
///
/// STOP is not offered: an untagged instance is never stopped outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingTagAction {
    #[default]
    None,
    Warn,
}

impl From<MissingTagAction> for LifecycleAction {
    fn from(action: MissingTagAction) -> Self {
        match action {
            MissingTagAction::None => LifecycleAction::None,
            MissingTagAction::Warn => LifecycleAction::Warn,
        }
    }
}

impl FromStr for MissingTagAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(MissingTagAction::None),
            "warn" => Ok(MissingTagAction::Warn),
            other => Err(format!(
                "unknown missing-tag action '{}' (expected \"none\" or \"warn\")",
                other
            )),
        }
    }
}

/// The engine's verdict for one instance at one evaluation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub instance_id: InstanceId,
    pub action: LifecycleAction,
    /// Human-readable justification, deterministic for identical inputs
    pub reason: String,
    pub evaluated_at: DateTime<Local>,
    /// Parsed stop-after date, when the tag held one
    #[serde(default)]
    pub stop_date: Option<NaiveDate>,
    /// Signed days from the evaluation date until `stop_date`
    #[serde(default)]
    pub days_until: Option<i64>,
    /// Owner to name in notifications, from the instance's contact tag
    #[serde(default)]
    pub contact: Option<String>,
}

impl Decision {
    pub fn new(
        instance_id: InstanceId,
        action: LifecycleAction,
        reason: impl Into<String>,
        evaluated_at: DateTime<Local>,
    ) -> Self {
        Self {
            instance_id,
            action,
            reason: reason.into(),
            evaluated_at,
            stop_date: None,
            days_until: None,
            contact: None,
        }
    }

    pub fn with_schedule(mut self, stop_date: NaiveDate, days_until: i64) -> Self {
        self.stop_date = Some(stop_date);
        self.days_until = Some(days_until);
        self
    }

    pub fn with_contact(mut self, contact: Option<&str>) -> Self {
        self.contact = contact.map(str::to_string);
        self
    }

    /// Days past the stop date, or zero when not overdue
    pub fn days_overdue(&self) -> i64 {
        self.days_until.map(|d| (-d).max(0)).unwrap_or(0)
    }
}
