// crates/twain-direct-core/src/runtime/process.rs
// ============================================================================
// Module: TWAIN Direct Process Phase
// Description: Classification pass over a freshly built task.
// Purpose: Settle unrecognized content by policy before the device is touched.
// Dependencies: tracing, crate::core
// ============================================================================

//! ## Overview
//! The Process phase walks the task once and decides, for every node, whether
//! it is eligible for negotiation (`Run`) or already settled. Unrecognized
//! actions, selectors, attribute names and values are settled through their
//! exception policy here; a `fail` policy records an `invalidValue` failure
//! and the walk stops.
//!
//! No device contact happens in this phase, so a dry run of a task (the CLI
//! `check` command) is exactly this pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::error::TaskError;
use crate::core::error::TaskResult;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::AttributeId;
use crate::core::identifiers::PixelFormatId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::StreamId;
use crate::core::outcome::Outcome;
use crate::core::setting::AttributeKind;
use crate::core::setting::Setting;
use crate::core::task::ActionKind;
use crate::core::task::NodeMeta;
use crate::core::task::PixelFormatSelector;
use crate::core::task::SourceSelector;
use crate::core::task::Task;

// ============================================================================
// SECTION: Process Phase
// ============================================================================

/// Classifies every node of `task`, stopping at the first failure.
pub fn process_task(task: &mut Task, result: &mut TaskResult) {
    for action in task.action_ids() {
        if result.is_failed() {
            break;
        }
        process_action(task, action, result);
    }
}

/// Returns true for outcomes that abort the remaining siblings.
const fn escalates(outcome: Outcome) -> bool {
    matches!(outcome, Outcome::Fail | Outcome::NextStream | Outcome::NextAction)
}

/// Settles an unrecognized node through its stream-level policy.
///
/// A `fail` policy records [`TaskError::InvalidValue`] at `<node>.<field>`.
fn settle_unrecognized(
    meta: &mut NodeMeta,
    field: &str,
    text: &str,
    action: &str,
    result: &mut TaskResult,
) -> Outcome {
    let outcome = meta.policy().stream_outcome();
    tracing::debug!(
        json_key = %meta.json_key,
        field,
        value = text,
        outcome = %outcome,
        "unrecognized content"
    );
    if outcome == Outcome::Fail {
        result.record_failure(action, TaskError::InvalidValue {
            json_key: meta.field_key(field),
            value: text.to_string(),
        });
    }
    meta.settle(outcome);
    outcome
}

/// Classifies one action.
fn process_action(task: &mut Task, action: ActionId, result: &mut TaskResult) {
    let name = task[action].name.clone();
    match task[action].kind {
        ActionKind::Configure => {
            task[action].meta.mark_run();
            for stream in task[action].streams.clone() {
                let outcome = process_stream(task, stream, &name, result);
                if matches!(outcome, Outcome::NextAction | Outcome::Fail) {
                    task[action].meta.settle(outcome);
                    return;
                }
            }
        }
        ActionKind::EncryptionProfiles => process_profiles(task, action, &name, result),
        ActionKind::EncryptionReport => task[action].meta.mark_run(),
        ActionKind::VendorExtension | ActionKind::Unrecognized => {
            let meta = &mut task[action].meta;
            let outcome = meta.policy().outcome();
            if outcome == Outcome::Fail {
                result.record_failure(&name, TaskError::InvalidValue {
                    json_key: meta.field_key("action"),
                    value: name.clone(),
                });
            }
            tracing::info!(
                json_key = %meta.json_key,
                action = %name,
                outcome = %outcome,
                "action not negotiated"
            );
            meta.settle(outcome);
        }
    }
}

/// Classifies the profiles of an encryptionProfiles action.
fn process_profiles(task: &mut Task, action: ActionId, name: &str, result: &mut TaskResult) {
    task[action].meta.mark_run();
    for profile in task[action].profiles.clone() {
        let node = &mut task[profile];
        if node.name.is_some() {
            node.meta.mark_run();
            continue;
        }
        let outcome = node.meta.policy().profile_outcome();
        if outcome == Outcome::Fail {
            result.record_failure(name, TaskError::InvalidValue {
                json_key: node.meta.field_key("name"),
                value: String::new(),
            });
        }
        node.meta.settle(outcome);
        if matches!(outcome, Outcome::Fail | Outcome::NextAction) {
            task[action].meta.settle(outcome);
            return;
        }
    }
}

/// Classifies one stream and its sources.
fn process_stream(
    task: &mut Task,
    stream: StreamId,
    action: &str,
    result: &mut TaskResult,
) -> Outcome {
    task[stream].meta.mark_run();
    for source in task[stream].sources.clone() {
        let outcome = process_source(task, source, action, result);
        if escalates(outcome) {
            task[stream].meta.settle(outcome);
            return outcome;
        }
    }
    Outcome::Success
}

/// Classifies one source and its pixel formats.
fn process_source(
    task: &mut Task,
    source: SourceId,
    action: &str,
    result: &mut TaskResult,
) -> Outcome {
    let node = &mut task[source];
    if node.selector == SourceSelector::Unrecognized {
        let text = node.selector_text.clone();
        return settle_unrecognized(&mut node.meta, "source", &text, action, result);
    }
    node.meta.mark_run();
    for pixel_format in task[source].pixel_formats.clone() {
        let outcome = process_pixel_format(task, pixel_format, action, result);
        if escalates(outcome) {
            task[source].meta.settle(outcome);
            return outcome;
        }
    }
    Outcome::Success
}

/// Classifies one pixel format and its attributes.
fn process_pixel_format(
    task: &mut Task,
    pixel_format: PixelFormatId,
    action: &str,
    result: &mut TaskResult,
) -> Outcome {
    let node = &mut task[pixel_format];
    if node.selector == PixelFormatSelector::Unrecognized {
        let text = node.selector_text.clone();
        return settle_unrecognized(&mut node.meta, "pixelFormat", &text, action, result);
    }
    node.meta.mark_run();
    for attribute in task[pixel_format].attributes.clone() {
        let outcome = process_attribute(task, attribute, action, result);
        if escalates(outcome) {
            task[pixel_format].meta.settle(outcome);
            return outcome;
        }
    }
    Outcome::Success
}

/// Classifies one attribute and parses its values.
fn process_attribute(
    task: &mut Task,
    attribute: AttributeId,
    action: &str,
    result: &mut TaskResult,
) -> Outcome {
    let kind = task[attribute].kind;
    if kind == AttributeKind::Unrecognized {
        let node = &mut task[attribute];
        let text = node.name.clone();
        return settle_unrecognized(&mut node.meta, "attribute", &text, action, result);
    }
    task[attribute].meta.mark_run();
    for value in task[attribute].values.clone() {
        let node = &mut task[value];
        if let Some(setting) = Setting::parse(kind, &node.text) {
            node.setting = Some(setting);
            node.meta.mark_run();
            continue;
        }
        let text = node.text.clone();
        let outcome = settle_unrecognized(&mut node.meta, "value", &text, action, result);
        if escalates(outcome) {
            task[attribute].meta.settle(outcome);
            return outcome;
        }
    }
    Outcome::Success
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::process_task;
    use crate::core::error::TaskResult;
    use crate::core::identifiers::ActionId;
    use crate::core::identifiers::StreamId;
    use crate::core::identifiers::ValueId;
    use crate::core::outcome::NodeStatus;
    use crate::core::outcome::Outcome;
    use crate::core::task::Task;
    use crate::runtime::builder::TaskBuilder;
    use crate::runtime::document::TaskDocument;

    /// Builds and processes a task.
    fn processed(text: &str) -> (Task, TaskResult) {
        let document = TaskDocument::parse(text).unwrap();
        let mut task = TaskBuilder::new(None).build(&document).unwrap();
        let mut result = TaskResult::new();
        process_task(&mut task, &mut result);
        (task, result)
    }

    /// Tests that an unknown value under the default policy is ignored.
    #[test]
    fn test_unknown_value_defaults_to_ignore() {
        let (task, result) = processed(
            r#"{"actions":[{"action":"configure","streams":[{"sources":[{"pixelFormats":[
                {"attributes":[{"attribute":"resolution","values":[
                    {"value":"lots"},{"value":300}]}]}
            ]}]}]}]}"#,
        );
        assert!(!result.is_failed());
        assert_eq!(task[ValueId::new(0)].meta.status, NodeStatus::Settled(Outcome::SuccessIgnore));
        assert_eq!(task[ValueId::new(1)].meta.status, NodeStatus::Run);
    }

    /// Tests that a fail policy on an unknown value names the value field.
    #[test]
    fn test_unknown_value_with_fail_policy() {
        let (_, result) = processed(
            r#"{"actions":[{"action":"configure","streams":[{"sources":[{"pixelFormats":[
                {"attributes":[{"attribute":"compression","values":[
                    {"value":"zip","exception":"fail"}]}]}
            ]}]}]}]}"#,
        );
        let failure = result.failure().unwrap();
        assert_eq!(failure.action, "configure");
        assert_eq!(failure.error.code(), "invalidValue");
        assert_eq!(
            failure.error.json_key(),
            Some("actions[0].streams[0].sources[0].pixelFormats[0].attributes[0].values[0].value")
        );
    }

    /// Tests that a nextStream policy on an unknown source settles its stream.
    #[test]
    fn test_unknown_source_moves_to_next_stream() {
        let (task, result) = processed(
            r#"{"actions":[{"action":"configure","streams":[
                {"exception":"nextStream","sources":[{"source":"tray9"}]},
                {"sources":[{"source":"feeder"}]}
            ]}]}"#,
        );
        assert!(!result.is_failed());
        assert_eq!(task[StreamId::new(0)].meta.status, NodeStatus::Settled(Outcome::NextStream));
        assert_eq!(task[StreamId::new(1)].meta.status, NodeStatus::Run);
    }

    /// Tests that an unknown action with a fail policy fails at its action key.
    #[test]
    fn test_unknown_action_with_fail_policy() {
        let (task, result) =
            processed(r#"{"actions":[{"action":"teleport","exception":"fail"}]}"#);
        assert_eq!(task[ActionId::new(0)].meta.status, NodeStatus::Settled(Outcome::Fail));
        let failure = result.failure().unwrap();
        assert_eq!(failure.error.json_key(), Some("actions[0].action"));
    }
}
