// crates/twain-direct-core/src/runtime/synthesize.rs
// ============================================================================
// Module: TWAIN Direct Reply Synthesis
// Description: Builds task replies from a negotiated hierarchy.
// Purpose: Report what the device actually honored, and nothing else.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Only nodes that settled as `success` appear in a reply. Ignored content,
//! refused values, and skipped streams are omitted, so a client reading the
//! reply learns exactly which requests took effect. A task with no honored
//! action yields the trivial reply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::identifiers::ActionId;
use crate::core::identifiers::AttributeId;
use crate::core::identifiers::PixelFormatId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::StreamId;
use crate::core::outcome::NodeStatus;
use crate::core::reply::ActionReply;
use crate::core::reply::ActionResults;
use crate::core::reply::AttributeReply;
use crate::core::reply::EncryptionProfileReply;
use crate::core::reply::PixelFormatReply;
use crate::core::reply::SourceReply;
use crate::core::reply::StreamReply;
use crate::core::reply::TaskReply;
use crate::core::reply::ValueReply;
use crate::core::task::Task;

// ============================================================================
// SECTION: Reply Synthesis
// ============================================================================

/// Builds the reply for a task that finished without failure.
#[must_use]
pub fn synthesize(task: &Task) -> TaskReply {
    let actions: Vec<ActionReply> = task
        .action_ids()
        .filter(|action| task[*action].meta.status.is_success())
        .map(|action| action_reply(task, action))
        .collect();
    if actions.is_empty() {
        return TaskReply::trivial();
    }
    TaskReply {
        actions,
    }
}

/// Builds the reply for one honored action.
fn action_reply(task: &Task, action: ActionId) -> ActionReply {
    let node = &task[action];
    ActionReply {
        action: node.name.clone(),
        vendor: node.meta.reply_vendor(),
        streams: node
            .streams
            .iter()
            .filter(|stream| task[**stream].meta.status.is_success())
            .map(|stream| stream_reply(task, *stream))
            .collect(),
        encryption_profiles: node
            .profiles
            .iter()
            .map(|profile| &task[*profile])
            .filter(|profile| profile.meta.status.is_success())
            .map(|profile| EncryptionProfileReply {
                name: profile.name.clone().unwrap_or_default(),
                vendor: profile.meta.reply_vendor(),
                profile: profile.profile.clone(),
            })
            .collect(),
        report: node.report.clone(),
        results: ActionResults::success(),
    }
}

/// Builds the reply for one honored stream.
fn stream_reply(task: &Task, stream: StreamId) -> StreamReply {
    let node = &task[stream];
    StreamReply {
        name: node.name.clone(),
        vendor: node.meta.reply_vendor(),
        sources: node
            .sources
            .iter()
            .filter(|source| task[**source].meta.status.is_success())
            .map(|source| source_reply(task, *source))
            .collect(),
    }
}

/// Builds the reply for one honored source.
fn source_reply(task: &Task, source: SourceId) -> SourceReply {
    let node = &task[source];
    SourceReply {
        source: node.selector_text.clone(),
        name: node.name.clone(),
        vendor: node.meta.reply_vendor(),
        pixel_formats: node
            .pixel_formats
            .iter()
            .filter(|pixel_format| task[**pixel_format].meta.status.is_success())
            .map(|pixel_format| pixel_format_reply(task, *pixel_format))
            .collect(),
    }
}

/// Builds the reply for one honored pixel format.
fn pixel_format_reply(task: &Task, pixel_format: PixelFormatId) -> PixelFormatReply {
    let node = &task[pixel_format];
    PixelFormatReply {
        pixel_format: node.selector_text.clone(),
        name: node.name.clone(),
        vendor: node.meta.reply_vendor(),
        attributes: node
            .attributes
            .iter()
            .filter(|attribute| task[**attribute].meta.status.is_success())
            .map(|attribute| attribute_reply(task, *attribute))
            .collect(),
    }
}

/// Builds the reply for one honored attribute.
fn attribute_reply(task: &Task, attribute: AttributeId) -> AttributeReply {
    let node = &task[attribute];
    AttributeReply {
        attribute: node.name.clone(),
        vendor: node.meta.reply_vendor(),
        values: node
            .values
            .iter()
            .map(|value| &task[*value])
            .filter(|value| value.meta.status.is_success())
            .map(|value| ValueReply {
                value: value.reply_value.clone().unwrap_or_else(|| value.raw.clone()),
                vendor: value.meta.reply_vendor(),
            })
            .collect(),
    }
}

// ============================================================================
// SECTION: Status Listing
// ============================================================================

/// Status of one node, addressed by its document locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeStatusEntry {
    /// Document locator.
    pub json_key: String,
    /// Status after the last phase that ran.
    pub status: NodeStatus,
}

/// Lists every node of the task in document order.
#[must_use]
pub fn node_statuses(task: &Task) -> Vec<NodeStatusEntry> {
    let mut entries = Vec::new();
    let mut push = |json_key: &str, status: NodeStatus| {
        entries.push(NodeStatusEntry {
            json_key: json_key.to_string(),
            status,
        });
    };
    for action in task.action_ids() {
        let node = &task[action];
        push(&node.meta.json_key, node.meta.status);
        for stream in &node.streams {
            push(&task[*stream].meta.json_key, task[*stream].meta.status);
            for source in &task[*stream].sources {
                push(&task[*source].meta.json_key, task[*source].meta.status);
                for pixel_format in &task[*source].pixel_formats {
                    let pixel_format = &task[*pixel_format];
                    push(&pixel_format.meta.json_key, pixel_format.meta.status);
                    for attribute in &pixel_format.attributes {
                        push(&task[*attribute].meta.json_key, task[*attribute].meta.status);
                        for value in &task[*attribute].values {
                            push(&task[*value].meta.json_key, task[*value].meta.status);
                        }
                    }
                }
            }
        }
        for profile in &node.profiles {
            push(&task[*profile].meta.json_key, task[*profile].meta.status);
        }
    }
    entries
}
