//! Policy evaluation: one decision per instance

use chrono::{DateTime, Local, NaiveDate};
use lapse_api::{Decision, Instance, LifecycleAction};
use lapse_config::LifecyclePolicy;
use lapse_util::{LapseError, Result, days_until, format_tag_date, is_weekend};
use std::collections::HashSet;
use tracing::debug;

use crate::tag::{StopAfterTag, warned_on};

/// Evaluate every instance in the snapshot.
///
/// Returns exactly one decision per instance, in input order. The result
/// depends only on the arguments: the same snapshot, time and policy always
/// produce the same decisions, reasons included.
///
/// Fails with `InvalidInput` if an instance has an empty id or two
/// instances share an id; no decisions are produced in that case.
pub fn evaluate(
    instances: &[Instance],
    now: DateTime<Local>,
    policy: &LifecyclePolicy,
) -> Result<Vec<Decision>> {
    validate_snapshot(instances)?;

    let decisions: Vec<Decision> = instances
        .iter()
        .map(|instance| evaluate_instance(instance, now, policy))
        .collect();

    debug!(
        instances = instances.len(),
        now = %now,
        "Evaluated snapshot"
    );

    Ok(decisions)
}

/// Evaluate a single instance. The caller is responsible for snapshot-level
/// checks (see [`evaluate`]).
pub fn evaluate_instance(
    instance: &Instance,
    now: DateTime<Local>,
    policy: &LifecyclePolicy,
) -> Decision {
    let decision = schedule_decision(instance, now, policy).with_contact(instance.contact());

    if decision.action == LifecycleAction::Stop && policy.require_prior_warning {
        return gate_on_prior_warning(decision, instance, now.date_naive(), policy);
    }

    decision
}

fn validate_snapshot(instances: &[Instance]) -> Result<()> {
    let mut seen = HashSet::with_capacity(instances.len());

    for (position, instance) in instances.iter().enumerate() {
        if instance.id.is_empty() {
            return Err(LapseError::invalid_input(format!(
                "instance at position {} has an empty id",
                position
            )));
        }
        if !seen.insert(&instance.id) {
            return Err(LapseError::invalid_input(format!(
                "duplicate instance id '{}' in snapshot",
                instance.id
            )));
        }
    }

    Ok(())
}

fn schedule_decision(
    instance: &Instance,
    now: DateTime<Local>,
    policy: &LifecyclePolicy,
) -> Decision {
    let id = instance.id.clone();

    if !instance.state.is_running() {
        return Decision::new(id, LifecycleAction::None, "not running", now);
    }

    if let Some(key) = policy
        .exempt_tag_keys
        .iter()
        .find(|key| instance.tag(key).is_some_and(|value| !value.is_empty()))
    {
        return Decision::new(
            id,
            LifecycleAction::None,
            format!("exempt: carries the '{}' tag", key),
            now,
        );
    }

    let today = now.date_naive();

    match StopAfterTag::of(instance, policy) {
        StopAfterTag::Missing => Decision::new(
            id,
            policy.default_action_on_missing_tag.into(),
            "no stop-after tag set",
            now,
        ),
        StopAfterTag::Malformed(value) => Decision::new(
            id,
            LifecycleAction::Warn,
            format!("stop-after tag unparsable: {}", value),
            now,
        ),
        StopAfterTag::OnWeekends => {
            if is_weekend(today) {
                Decision::new(id, LifecycleAction::Stop, "scheduled to stop on weekends", now)
            } else {
                Decision::new(
                    id,
                    LifecycleAction::None,
                    "scheduled to stop on weekends, today is a weekday",
                    now,
                )
            }
        }
        StopAfterTag::Date(date) => dated_decision(instance, date, today, now, policy),
    }
}

fn dated_decision(
    instance: &Instance,
    stop_date: NaiveDate,
    today: NaiveDate,
    now: DateTime<Local>,
    policy: &LifecyclePolicy,
) -> Decision {
    let id = instance.id.clone();
    let days = days_until(stop_date, today);
    let date = format_tag_date(stop_date);

    let decision = if days <= 0 {
        Decision::new(
            id,
            LifecycleAction::Stop,
            format!("stop-after date {} has passed ({} overdue)", date, plural_days(-days)),
            now,
        )
    } else if days <= i64::from(policy.warning_period_days) {
        Decision::new(
            id,
            LifecycleAction::Warn,
            format!("will be stopped after {} ({} remaining)", date, plural_days(days)),
            now,
        )
    } else {
        Decision::new(
            id,
            LifecycleAction::None,
            format!("stop-after date {} is {} away", date, plural_days(days)),
            now,
        )
    };

    decision.with_schedule(stop_date, days)
}

/// Downgrade a STOP to a WARN unless a warning was recorded on or before
/// `today`.
fn gate_on_prior_warning(
    decision: Decision,
    instance: &Instance,
    today: NaiveDate,
    policy: &LifecyclePolicy,
) -> Decision {
    match warned_on(instance, policy) {
        Some(warned) if warned <= today => decision,
        _ => Decision {
            action: LifecycleAction::Warn,
            reason: format!("{} but no prior warning recorded", decision.reason),
            ..decision
        },
    }
}

fn plural_days(n: i64) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{} days", n)
    }
}
