//! Turning decisions into instructions

use lapse_api::{Decision, Instruction, LifecycleAction, RunMode};
use lapse_config::Policy;
use chrono::NaiveDate;
use lapse_util::format_tag_date;

use crate::tag::PriorAnnotations;

/// Map decisions to the instructions an executor should carry out.
///
/// Instructions come out grouped by decision, in decision order. For a
/// single decision the order is stop, then notify, then annotate.
///
/// - NONE produces nothing.
/// - WARN produces a notification and, with `annotate_warnings`, an
///   annotation recording the warning date. A warning already recorded on
///   the evaluation date is skipped entirely when
///   `suppress_repeat_warnings` is on.
/// - STOP produces a stop, a notification and a state annotation reading
///   "Stopped on <date>" in execute mode. In notify mode the stop is left
///   out, the message says the instance is due to be stopped, and the
///   notice is annotated like a warning.
///
/// Messages name the instance's contact when it has one.
pub fn plan_instructions(
    decisions: &[Decision],
    prior: &PriorAnnotations,
    policy: &Policy,
    mode: RunMode,
) -> Vec<Instruction> {
    let mut instructions = Vec::new();

    for decision in decisions {
        match decision.action {
            LifecycleAction::None => {}
            LifecycleAction::Warn => plan_warning(&mut instructions, decision, prior, policy),
            LifecycleAction::Stop => plan_stop(&mut instructions, decision, policy, mode),
        }
    }

    instructions
}

fn plan_warning(
    out: &mut Vec<Instruction>,
    decision: &Decision,
    prior: &PriorAnnotations,
    policy: &Policy,
) {
    let today = decision.evaluated_at.date_naive();

    if policy.notifications.suppress_repeat_warnings
        && prior.last_warned(&decision.instance_id) == Some(today)
    {
        return;
    }

    out.push(notify(decision, policy, &decision.reason));

    if policy.notifications.annotate_warnings {
        out.push(annotate(decision, policy));
    }
}

fn plan_stop(out: &mut Vec<Instruction>, decision: &Decision, policy: &Policy, mode: RunMode) {
    match mode {
        RunMode::Execute => {
            out.push(Instruction::Stop {
                instance_id: decision.instance_id.clone(),
            });
            out.push(notify(
                decision,
                policy,
                &format!("stopping, {}", decision.reason),
            ));
            out.push(Instruction::Annotate {
                instance_id: decision.instance_id.clone(),
                tag_key: policy.lifecycle.state_tag_key.clone(),
                tag_value: stopped_on(decision.evaluated_at.date_naive()),
            });
        }
        RunMode::Notify => {
            out.push(notify(
                decision,
                policy,
                &format!("due to be stopped, {}", decision.reason),
            ));
            if policy.notifications.annotate_warnings {
                out.push(annotate(decision, policy));
            }
        }
    }
}

/// "<id>: <text>", with the contact appended when known
fn notify(decision: &Decision, policy: &Policy, text: &str) -> Instruction {
    let message = match &decision.contact {
        Some(contact) => format!("{}: {} (contact: {})", decision.instance_id, text, contact),
        None => format!("{}: {}", decision.instance_id, text),
    };

    Instruction::Notify {
        instance_id: decision.instance_id.clone(),
        channel: policy.notifications.channel.clone(),
        message,
    }
}

/// Value of the state tag after a stop
pub fn stopped_on(date: NaiveDate) -> String {
    format!("Stopped on {}", format_tag_date(date))
}

fn annotate(decision: &Decision, policy: &Policy) -> Instruction {
    Instruction::Annotate {
        instance_id: decision.instance_id.clone(),
        tag_key: policy.lifecycle.annotation_tag_key.clone(),
        tag_value: format_tag_date(decision.evaluated_at.date_naive()),
    }
}
