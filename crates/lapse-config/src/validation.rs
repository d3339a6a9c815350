//! Configuration validation

use crate::schema::{RawConfig, RawLifecycle, RawNotifications, RawServiceConfig};
use crate::MAX_WARNING_PERIOD_DAYS;
use lapse_api::{DEFAULT_ANNOTATION_TAG, DEFAULT_STATE_TAG, DEFAULT_STOP_AFTER_TAG, MissingTagAction};
use std::collections::HashSet;
use thiserror::Error;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[service] {field}: {message}")]
    Service { field: String, message: String },

    #[error("[lifecycle] {field}: {message}")]
    Lifecycle { field: String, message: String },

    #[error("[notifications] {field}: {message}")]
    Notifications { field: String, message: String },

    #[error("Invalid channel '{0}': should look like #random or #testing")]
    InvalidChannel(String),

    #[error("Duplicate exempt tag key: {0}")]
    DuplicateExemptTag(String),
}

/// Validate a raw configuration, reporting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    errors.extend(validate_service(&config.service));
    errors.extend(validate_lifecycle(&config.lifecycle));
    errors.extend(validate_notifications(&config.notifications));
    errors
}

fn validate_service(service: &RawServiceConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let paths = [
        ("data_dir", &service.data_dir),
        ("inventory_path", &service.inventory_path),
        ("journal_path", &service.journal_path),
    ];
    for (field, path) in paths {
        if let Some(path) = path
            && path.as_os_str().is_empty()
        {
            errors.push(ValidationError::Service {
                field: field.into(),
                message: "path cannot be empty".into(),
            });
        }
    }

    errors
}

fn validate_lifecycle(lifecycle: &RawLifecycle) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(days) = lifecycle.warning_period_days
        && days > MAX_WARNING_PERIOD_DAYS
    {
        errors.push(ValidationError::Lifecycle {
            field: "warning_period_days".into(),
            message: format!("must be at most {} days, got {}", MAX_WARNING_PERIOD_DAYS, days),
        });
    }

    let tag_key = lifecycle.tag_key.as_deref().unwrap_or(DEFAULT_STOP_AFTER_TAG);
    let annotation_key = lifecycle
        .annotation_tag_key
        .as_deref()
        .unwrap_or(DEFAULT_ANNOTATION_TAG);

    if tag_key.trim().is_empty() {
        errors.push(ValidationError::Lifecycle {
            field: "tag_key".into(),
            message: "cannot be empty".into(),
        });
    }
    if annotation_key.trim().is_empty() {
        errors.push(ValidationError::Lifecycle {
            field: "annotation_tag_key".into(),
            message: "cannot be empty".into(),
        });
    }
    if tag_key == annotation_key {
        errors.push(ValidationError::Lifecycle {
            field: "annotation_tag_key".into(),
            message: format!("must differ from tag_key '{}'", tag_key),
        });
    }

    let state_key = lifecycle.state_tag_key.as_deref().unwrap_or(DEFAULT_STATE_TAG);
    if state_key.trim().is_empty() {
        errors.push(ValidationError::Lifecycle {
            field: "state_tag_key".into(),
            message: "cannot be empty".into(),
        });
    } else if state_key == tag_key || state_key == annotation_key {
        errors.push(ValidationError::Lifecycle {
            field: "state_tag_key".into(),
            message: format!("'{}' is already used for stop-after dates or warnings", state_key),
        });
    }

    if let Some(action) = &lifecycle.default_action_on_missing_tag
        && let Err(e) = parse_missing_tag_action(action)
    {
        errors.push(ValidationError::Lifecycle {
            field: "default_action_on_missing_tag".into(),
            message: e,
        });
    }

    if let Some(exempt) = &lifecycle.exempt_tag_keys {
        let mut seen = HashSet::new();
        for key in exempt {
            if key.trim().is_empty() {
                errors.push(ValidationError::Lifecycle {
                    field: "exempt_tag_keys".into(),
                    message: "tag keys cannot be empty".into(),
                });
            } else if key == tag_key {
                errors.push(ValidationError::Lifecycle {
                    field: "exempt_tag_keys".into(),
                    message: format!("'{}' is the stop-after tag itself", key),
                });
            }
            if !seen.insert(key) {
                errors.push(ValidationError::DuplicateExemptTag(key.clone()));
            }
        }
    }

    errors
}

fn validate_notifications(notifications: &RawNotifications) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(channel) = &notifications.channel
        && !is_valid_channel(channel)
    {
        errors.push(ValidationError::InvalidChannel(channel.clone()));
    }

    if let Some(url) = &notifications.webhook_url
        && !(url.starts_with("https://") || url.starts_with("http://"))
    {
        errors.push(ValidationError::Notifications {
            field: "webhook_url".into(),
            message: format!("'{}' is not an http(s) URL", url),
        });
    }

    if notifications.max_messages_per_second == Some(0) {
        errors.push(ValidationError::Notifications {
            field: "max_messages_per_second".into(),
            message: "must be at least 1".into(),
        });
    }

    errors
}

/// Parse the missing-tag action ("none" or "warn")
pub fn parse_missing_tag_action(s: &str) -> Result<MissingTagAction, String> {
    s.parse()
}

/// A channel name is `#` followed by letters, digits and hyphens
pub fn is_valid_channel(channel: &str) -> bool {
    match channel.strip_prefix('#') {
        Some(name) => {
            !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(lifecycle: RawLifecycle, notifications: RawNotifications) -> RawConfig {
        RawConfig {
            config_version: 1,
            service: Default::default(),
            lifecycle,
            notifications,
        }
    }

    #[test]
    fn test_is_valid_channel() {
        assert!(is_valid_channel("#random"));
        assert!(is_valid_channel("#bot-testing"));
        assert!(is_valid_channel("#ops2"));

        assert!(!is_valid_channel("random"));
        assert!(!is_valid_channel("#"));
        assert!(!is_valid_channel("#bot testing"));
        assert!(!is_valid_channel("#bot_testing"));
    }

    #[test]
    fn test_parse_missing_tag_action() {
        assert_eq!(parse_missing_tag_action("none").unwrap(), MissingTagAction::None);
        assert_eq!(parse_missing_tag_action("Warn").unwrap(), MissingTagAction::Warn);
        assert!(parse_missing_tag_action("stop").is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        let errors = validate_config(&config_with(Default::default(), Default::default()));
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
    }

    #[test]
    fn test_annotation_key_must_differ() {
        let lifecycle = RawLifecycle {
            tag_key: Some("Stop after".into()),
            annotation_tag_key: Some("Stop after".into()),
            ..Default::default()
        };

        let errors = validate_config(&config_with(lifecycle, Default::default()));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::Lifecycle { field, .. } if field == "annotation_tag_key"
        )));
    }

    #[test]
    fn test_state_key_must_be_distinct() {
        let lifecycle = RawLifecycle {
            state_tag_key: Some("Stop after warned".into()),
            ..Default::default()
        };

        let errors = validate_config(&config_with(lifecycle, Default::default()));
        assert!(errors.iter().any(|e| matches!(
            e,
            ValidationError::Lifecycle { field, .. } if field == "state_tag_key"
        )));
    }

    #[test]
    fn test_collects_every_error() {
        let lifecycle = RawLifecycle {
            warning_period_days: Some(1000),
            default_action_on_missing_tag: Some("stop".into()),
            exempt_tag_keys: Some(vec!["eks:nodegroup-name".into(), "eks:nodegroup-name".into()]),
            ..Default::default()
        };
        let notifications = RawNotifications {
            channel: Some("ops".into()),
            webhook_url: Some("ftp://example.com".into()),
            max_messages_per_second: Some(0),
            ..Default::default()
        };

        let errors = validate_config(&config_with(lifecycle, notifications));
        assert_eq!(errors.len(), 6, "errors: {:?}", errors);
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidChannel(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateExemptTag(_))));
    }

    #[test]
    fn test_exempt_key_cannot_be_stop_tag() {
        let lifecycle = RawLifecycle {
            exempt_tag_keys: Some(vec!["Stop after".into()]),
            ..Default::default()
        };

        let errors = validate_config(&config_with(lifecycle, Default::default()));
        assert_eq!(errors.len(), 1);
    }
}
