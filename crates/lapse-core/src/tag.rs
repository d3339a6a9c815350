//! Stop-after tag interpretation

use chrono::NaiveDate;
use lapse_api::Instance;
use lapse_config::LifecyclePolicy;
use lapse_util::{InstanceId, parse_tag_date};
use std::collections::BTreeMap;

/// Value recognized by the weekend schedule, compared case-insensitively
pub const ON_WEEKENDS: &str = "On Weekends";

/// What an instance's stop-after tag says
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopAfterTag {
    /// No tag under the configured key
    Missing,
    /// Present but not a `YYYY-MM-DD` date (raw value kept for the report)
    Malformed(String),
    Date(NaiveDate),
    /// Stop whenever a run happens on a weekend
    OnWeekends,
}

impl StopAfterTag {
    /// Classify a raw tag value
    pub fn parse(value: Option<&str>, weekend_schedule: bool) -> Self {
        let Some(value) = value else {
            return StopAfterTag::Missing;
        };

        if let Some(date) = parse_tag_date(value) {
            return StopAfterTag::Date(date);
        }

        if weekend_schedule && value.eq_ignore_ascii_case(ON_WEEKENDS) {
            return StopAfterTag::OnWeekends;
        }

        StopAfterTag::Malformed(value.to_string())
    }

    /// Read and classify the stop-after tag of an instance
    pub fn of(instance: &Instance, policy: &LifecyclePolicy) -> Self {
        Self::parse(stop_after_value(instance, policy), policy.weekend_schedule)
    }
}

/// Raw stop-after value of an instance.
///
/// The configured key wins. With `lenient_tag_key`, a key that starts with
/// "stop" and contains "after" (case-insensitive) is accepted instead;
/// tags are ordered, so the smallest matching key is picked.
pub fn stop_after_value<'a>(instance: &'a Instance, policy: &LifecyclePolicy) -> Option<&'a str> {
    if let Some(value) = instance.tag(&policy.tag_key) {
        return Some(value);
    }

    if !policy.lenient_tag_key {
        return None;
    }

    instance
        .tags
        .iter()
        .find(|(key, _)| {
            *key != &policy.annotation_tag_key
                && *key != &policy.state_tag_key
                && is_stop_after_like(key)
        })
        .map(|(_, value)| value.as_str())
}

fn is_stop_after_like(key: &str) -> bool {
    let key = key.to_lowercase();
    key.starts_with("stop") && key.contains("after")
}

/// Date of the last recorded warning on an instance, if the annotation tag
/// holds a valid date
pub fn warned_on(instance: &Instance, policy: &LifecyclePolicy) -> Option<NaiveDate> {
    instance
        .tag(&policy.annotation_tag_key)
        .and_then(parse_tag_date)
}

/// Warning history recovered from the snapshot's annotation tags.
///
/// This is the "state in" half of warning memory; `Annotate` instructions
/// are the "state out" half. Nothing is remembered between runs except
/// through these tags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorAnnotations {
    warned_on: BTreeMap<InstanceId, NaiveDate>,
}

impl PriorAnnotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_instances(instances: &[Instance], policy: &LifecyclePolicy) -> Self {
        let warned_on = instances
            .iter()
            .filter_map(|i| warned_on(i, policy).map(|d| (i.id.clone(), d)))
            .collect();
        Self { warned_on }
    }

    pub fn with_warning(mut self, instance_id: InstanceId, date: NaiveDate) -> Self {
        self.warned_on.insert(instance_id, date);
        self
    }

    pub fn last_warned(&self, instance_id: &InstanceId) -> Option<NaiveDate> {
        self.warned_on.get(instance_id).copied()
    }

    pub fn len(&self) -> usize {
        self.warned_on.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warned_on.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lapse_api::InstanceState;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parse_classifies_values() {
        assert_eq!(StopAfterTag::parse(None, false), StopAfterTag::Missing);
        assert_eq!(
            StopAfterTag::parse(Some("2024-01-03"), false),
            StopAfterTag::Date(date(2024, 1, 3))
        );
        assert_eq!(
            StopAfterTag::parse(Some(""), false),
            StopAfterTag::Malformed(String::new())
        );
        assert_eq!(
            StopAfterTag::parse(Some("2024-13-40"), false),
            StopAfterTag::Malformed("2024-13-40".into())
        );
    }

    #[test]
    fn on_weekends_needs_weekend_schedule() {
        assert_eq!(
            StopAfterTag::parse(Some("On Weekends"), false),
            StopAfterTag::Malformed("On Weekends".into())
        );
        assert_eq!(StopAfterTag::parse(Some("oN wEeKeNdS"), true), StopAfterTag::OnWeekends);
    }

    #[test]
    fn exact_key_is_required_by_default() {
        let policy = LifecyclePolicy::default();
        let instance = Instance::new("i-1", InstanceState::Running).with_tag("StopAfter", "2024-01-01");

        assert_eq!(StopAfterTag::of(&instance, &policy), StopAfterTag::Missing);
    }

    #[test]
    fn lenient_key_matching() {
        let policy = LifecyclePolicy {
            lenient_tag_key: true,
            ..Default::default()
        };

        let instance = Instance::new("i-1", InstanceState::Running).with_tag("stop_after", "2024-01-01");
        assert_eq!(StopAfterTag::of(&instance, &policy), StopAfterTag::Date(date(2024, 1, 1)));

        // The warning annotation looks like a stop-after key but is not one
        let annotated_only = Instance::new("i-2", InstanceState::Running)
            .with_tag("Stop after warned", "2024-01-01");
        assert_eq!(StopAfterTag::of(&annotated_only, &policy), StopAfterTag::Missing);
    }

    #[test]
    fn configured_key_wins_over_lenient_match() {
        let policy = LifecyclePolicy {
            lenient_tag_key: true,
            ..Default::default()
        };
        let instance = Instance::new("i-1", InstanceState::Running)
            .with_tag("Stop after", "2024-02-02")
            .with_tag("StopAfter", "2024-01-01");

        assert_eq!(StopAfterTag::of(&instance, &policy), StopAfterTag::Date(date(2024, 2, 2)));
    }

    #[test]
    fn prior_annotations_skip_invalid_dates() {
        let policy = LifecyclePolicy::default();
        let instances = vec![
            Instance::new("i-1", InstanceState::Running).with_tag("Stop after warned", "2024-01-01"),
            Instance::new("i-2", InstanceState::Running).with_tag("Stop after warned", "yesterday"),
            Instance::new("i-3", InstanceState::Running),
        ];

        let prior = PriorAnnotations::from_instances(&instances, &policy);
        assert_eq!(prior.len(), 1);
        assert_eq!(prior.last_warned(&InstanceId::new("i-1")), Some(date(2024, 1, 1)));
        assert_eq!(prior.last_warned(&InstanceId::new("i-2")), None);
    }
}
