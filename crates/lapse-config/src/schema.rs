//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Where inventory, journal and history live
    #[serde(default)]
    pub service: RawServiceConfig,

    /// Stop-after policy
    #[serde(default)]
    pub lifecycle: RawLifecycle,

    /// Where and how warnings are delivered
    #[serde(default)]
    pub notifications: RawNotifications,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Data directory (default: ~/.local/share/lapse)
    pub data_dir: Option<PathBuf>,

    /// Inventory snapshot exported by the collection job
    pub inventory_path: Option<PathBuf>,

    /// NDJSON journal the executor appends instructions to
    pub journal_path: Option<PathBuf>,
}

/// Lifecycle policy settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawLifecycle {
    /// Days before the stop-after date during which instances are warned
    pub warning_period_days: Option<u32>,

    /// Tag holding the stop-after date
    pub tag_key: Option<String>,

    /// "none" or "warn"
    pub default_action_on_missing_tag: Option<String>,

    /// Tag recording the last warning date
    pub annotation_tag_key: Option<String>,

    /// Tag recording that an instance was stopped
    pub state_tag_key: Option<String>,

    /// Also accept keys like "StopAfter" or "stop_after"
    pub lenient_tag_key: Option<bool>,

    /// Recognize "On Weekends" as a stop-after value
    pub weekend_schedule: Option<bool>,

    /// Only stop instances warned on or before the evaluation date
    pub require_prior_warning: Option<bool>,

    /// Instances carrying any of these tags are never warned or stopped
    pub exempt_tag_keys: Option<Vec<String>>,
}

/// Notification settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawNotifications {
    /// Channel name, e.g. "#ops"
    pub channel: Option<String>,

    /// Incoming-webhook URL. Without it notifications are only journaled.
    pub webhook_url: Option<String>,

    /// Record the warning date on warned instances
    pub annotate_warnings: Option<bool>,

    /// Skip warnings already recorded today
    pub suppress_repeat_warnings: Option<bool>,

    /// Webhook throttle per channel
    pub max_messages_per_second: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let toml_str = r##"
            config_version = 1

            [service]
            data_dir = "/var/lib/lapse"
            inventory_path = "/var/lib/lapse/instances.json"

            [lifecycle]
            warning_period_days = 5
            tag_key = "StopAfter"
            default_action_on_missing_tag = "warn"
            exempt_tag_keys = ["eks:nodegroup-name", "aws:autoscaling:groupName"]

            [notifications]
            channel = "#ops"
            webhook_url = "https://hooks.example.com/T000/B000"
            max_messages_per_second = 2
        "##;

        let config: RawConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.lifecycle.warning_period_days, Some(5));
        assert_eq!(config.lifecycle.tag_key.as_deref(), Some("StopAfter"));
        assert_eq!(config.lifecycle.exempt_tag_keys.as_ref().unwrap().len(), 2);
        assert_eq!(config.notifications.channel.as_deref(), Some("#ops"));
        assert_eq!(
            config.service.data_dir.as_deref(),
            Some(std::path::Path::new("/var/lib/lapse"))
        );
    }

    #[test]
    fn sections_are_optional() {
        let config: RawConfig = toml::from_str("config_version = 1").unwrap();
        assert!(config.lifecycle.tag_key.is_none());
        assert!(config.notifications.webhook_url.is_none());
        assert!(config.service.data_dir.is_none());
    }
}
