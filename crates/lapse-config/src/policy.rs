//! Validated policy structures

use crate::schema::{RawConfig, RawLifecycle, RawNotifications, RawServiceConfig};
use crate::validation::parse_missing_tag_action;
use lapse_api::{DEFAULT_ANNOTATION_TAG, DEFAULT_STATE_TAG, DEFAULT_STOP_AFTER_TAG, MissingTagAction};
use lapse_util::{data_dir_without_env, inventory_path_in, journal_path_in};
use std::path::PathBuf;

/// Days before the stop-after date during which instances are warned
pub const DEFAULT_WARNING_PERIOD_DAYS: u32 = 3;

/// Upper bound accepted for `warning_period_days`
pub const MAX_WARNING_PERIOD_DAYS: u32 = 365;

/// Channel used when the config names none
pub const DEFAULT_CHANNEL: &str = "#bot-testing";

/// Tags marking instances owned by a node group or autoscaler
pub const DEFAULT_EXEMPT_TAG_KEYS: &[&str] = &["eks:nodegroup-name"];

/// Default webhook throttle
pub const DEFAULT_MAX_MESSAGES_PER_SECOND: u32 = 1;

/// Validated policy ready for use by the runner
#[derive(Debug, Clone, Default)]
pub struct Policy {
    pub service: ServiceConfig,
    pub lifecycle: LifecyclePolicy,
    pub notifications: NotificationPolicy,
}

impl Policy {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            service: ServiceConfig::from_raw(raw.service),
            lifecycle: LifecyclePolicy::from_raw(raw.lifecycle),
            notifications: NotificationPolicy::from_raw(raw.notifications),
        }
    }
}

/// Service configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub data_dir: PathBuf,
    pub inventory_path: PathBuf,
    pub journal_path: PathBuf,
}

impl ServiceConfig {
    fn from_raw(raw: RawServiceConfig) -> Self {
        let data_dir = raw.data_dir.unwrap_or_else(data_dir_without_env);
        Self {
            inventory_path: raw
                .inventory_path
                .unwrap_or_else(|| inventory_path_in(&data_dir)),
            journal_path: raw
                .journal_path
                .unwrap_or_else(|| journal_path_in(&data_dir)),
            data_dir,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from_raw(RawServiceConfig::default())
    }
}

/// The rules the policy engine applies to every instance.
///
/// Evaluation is a pure function of an instance, the evaluation time and
/// this value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecyclePolicy {
    pub warning_period_days: u32,
    pub tag_key: String,
    pub default_action_on_missing_tag: MissingTagAction,
    pub annotation_tag_key: String,
    /// Tag recording that an instance was stopped, e.g. "Stopped on 2024-01-01"
    pub state_tag_key: String,
    /// Fall back to keys like "StopAfter" when `tag_key` is absent
    pub lenient_tag_key: bool,
    /// Recognize "On Weekends" as a stop-after value
    pub weekend_schedule: bool,
    /// Only stop instances warned on or before the evaluation date
    pub require_prior_warning: bool,
    pub exempt_tag_keys: Vec<String>,
}

impl LifecyclePolicy {
    fn from_raw(raw: RawLifecycle) -> Self {
        let defaults = Self::default();
        Self {
            warning_period_days: raw
                .warning_period_days
                .unwrap_or(defaults.warning_period_days),
            tag_key: raw.tag_key.unwrap_or(defaults.tag_key),
            default_action_on_missing_tag: raw
                .default_action_on_missing_tag
                .and_then(|a| parse_missing_tag_action(&a).ok())
                .unwrap_or(defaults.default_action_on_missing_tag),
            annotation_tag_key: raw
                .annotation_tag_key
                .unwrap_or(defaults.annotation_tag_key),
            state_tag_key: raw.state_tag_key.unwrap_or(defaults.state_tag_key),
            lenient_tag_key: raw.lenient_tag_key.unwrap_or(defaults.lenient_tag_key),
            weekend_schedule: raw.weekend_schedule.unwrap_or(defaults.weekend_schedule),
            require_prior_warning: raw
                .require_prior_warning
                .unwrap_or(defaults.require_prior_warning),
            exempt_tag_keys: raw.exempt_tag_keys.unwrap_or(defaults.exempt_tag_keys),
        }
    }
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            warning_period_days: DEFAULT_WARNING_PERIOD_DAYS,
            tag_key: DEFAULT_STOP_AFTER_TAG.to_string(),
            default_action_on_missing_tag: MissingTagAction::None,
            annotation_tag_key: DEFAULT_ANNOTATION_TAG.to_string(),
            state_tag_key: DEFAULT_STATE_TAG.to_string(),
            lenient_tag_key: false,
            weekend_schedule: false,
            require_prior_warning: false,
            exempt_tag_keys: DEFAULT_EXEMPT_TAG_KEYS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// How warnings and stops are announced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationPolicy {
    pub channel: String,
    pub webhook_url: Option<String>,
    pub annotate_warnings: bool,
    pub suppress_repeat_warnings: bool,
    pub max_messages_per_second: u32,
}

impl NotificationPolicy {
    fn from_raw(raw: RawNotifications) -> Self {
        let defaults = Self::default();
        Self {
            channel: raw.channel.unwrap_or(defaults.channel),
            webhook_url: raw.webhook_url,
            annotate_warnings: raw.annotate_warnings.unwrap_or(defaults.annotate_warnings),
            suppress_repeat_warnings: raw
                .suppress_repeat_warnings
                .unwrap_or(defaults.suppress_repeat_warnings),
            max_messages_per_second: raw
                .max_messages_per_second
                .unwrap_or(defaults.max_messages_per_second),
        }
    }
}

impl Default for NotificationPolicy {
    fn default() -> Self {
        Self {
            channel: DEFAULT_CHANNEL.to_string(),
            webhook_url: None,
            annotate_warnings: true,
            suppress_repeat_warnings: true,
            max_messages_per_second: DEFAULT_MAX_MESSAGES_PER_SECOND,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_defaults() {
        let policy = LifecyclePolicy::default();
        assert_eq!(policy.warning_period_days, 3);
        assert_eq!(policy.tag_key, "Stop after");
        assert_eq!(policy.default_action_on_missing_tag, MissingTagAction::None);
        assert!(!policy.weekend_schedule);
        assert_eq!(policy.exempt_tag_keys, vec!["eks:nodegroup-name".to_string()]);
        assert_eq!(policy.state_tag_key, "Lapse state");
    }

    #[test]
    fn test_overrides_apply() {
        let raw = RawLifecycle {
            warning_period_days: Some(7),
            default_action_on_missing_tag: Some("warn".into()),
            exempt_tag_keys: Some(vec![]),
            ..Default::default()
        };

        let policy = LifecyclePolicy::from_raw(raw);
        assert_eq!(policy.warning_period_days, 7);
        assert_eq!(policy.default_action_on_missing_tag, MissingTagAction::Warn);
        assert!(policy.exempt_tag_keys.is_empty());
        assert_eq!(policy.tag_key, "Stop after");
    }

    #[test]
    fn test_service_paths_follow_data_dir() {
        let raw = RawServiceConfig {
            data_dir: Some(PathBuf::from("/srv/lapse")),
            inventory_path: None,
            journal_path: Some(PathBuf::from("/tmp/journal.ndjson")),
        };

        let service = ServiceConfig::from_raw(raw);
        assert_eq!(service.inventory_path, PathBuf::from("/srv/lapse/instances.json"));
        assert_eq!(service.journal_path, PathBuf::from("/tmp/journal.ndjson"));
    }
}
