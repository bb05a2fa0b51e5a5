// crates/twain-direct-core/src/runtime/topology.rs
// ============================================================================
// Module: TWAIN Direct Topology Validator
// Description: Nesting grammar for task document nodes.
// Purpose: Reject topology keys that appear below the wrong parent kind.
// Dependencies: serde_json, crate::core::error
// ============================================================================

//! ## Overview
//! A task nests strictly: actions hold streams or encryption profiles,
//! streams hold sources, sources hold pixel formats, pixel formats hold
//! attributes, and attributes hold values. Each node object may only carry
//! the topology keys of its own kind; any other topology key is a structural
//! error reported at `<node path>.<key>`.
//!
//! Keys outside the topology vocabulary (`name`, `vendor`, `exception`,
//! `profile`, vendor extensions, ...) are not checked here. Content owned by
//! an unknown vendor never reaches this module.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Map;
use serde_json::Value as JsonValue;

use crate::core::error::TaskError;

// ============================================================================
// SECTION: Node Kinds
// ============================================================================

/// Every key that participates in the nesting grammar.
const TOPOLOGY_KEYS: &[&str] = &[
    "actions",
    "action",
    "streams",
    "stream",
    "sources",
    "source",
    "pixelFormats",
    "pixelFormat",
    "attributes",
    "attribute",
    "values",
    "value",
    "encryptionProfiles",
    "encryptionProfile",
];

/// Kind of a node object in the task document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Document root.
    Task,
    /// Entry of `actions`.
    Action,
    /// Entry of `streams`.
    Stream,
    /// Entry of `sources`.
    Source,
    /// Entry of `pixelFormats`.
    PixelFormat,
    /// Entry of `attributes`.
    Attribute,
    /// Entry of `values`.
    Value,
    /// Entry of `encryptionProfiles`.
    EncryptionProfile,
}

impl NodeKind {
    /// Returns the topology keys this kind may carry.
    #[must_use]
    pub const fn allowed_keys(self) -> &'static [&'static str] {
        match self {
            Self::Task => &["actions"],
            Self::Action => &["action", "streams", "encryptionProfiles"],
            Self::Stream => &["stream", "sources"],
            Self::Source => &["source", "pixelFormats"],
            Self::PixelFormat => &["pixelFormat", "attributes"],
            Self::Attribute => &["attribute", "values"],
            Self::Value => &["value"],
            Self::EncryptionProfile => &["encryptionProfile"],
        }
    }

    /// Returns the lowercase label used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Action => "action",
            Self::Stream => "stream",
            Self::Source => "source",
            Self::PixelFormat => "pixelFormat",
            Self::Attribute => "attribute",
            Self::Value => "value",
            Self::EncryptionProfile => "encryptionProfile",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Validation
// ============================================================================

/// Joins a node locator and a field name.
fn join_key(json_key: &str, field: &str) -> String {
    if json_key.is_empty() { field.to_string() } else { format!("{json_key}.{field}") }
}

/// Confirms that `object` only carries topology keys allowed for `kind`.
///
/// # Errors
///
/// Returns [`TaskError::Structural`] naming the first out-of-place key in
/// key order.
pub fn check_node(
    kind: NodeKind,
    object: &Map<String, JsonValue>,
    json_key: &str,
) -> Result<(), TaskError> {
    let allowed = kind.allowed_keys();
    for key in object.keys() {
        if TOPOLOGY_KEYS.contains(&key.as_str()) && !allowed.contains(&key.as_str()) {
            let offending = join_key(json_key, key);
            tracing::debug!(kind = %kind, json_key = %offending, "topology key out of place");
            return Err(TaskError::Structural {
                json_key: offending,
            });
        }
    }
    Ok(())
}

/// Requires a document node to be an object.
///
/// # Errors
///
/// Returns [`TaskError::Structural`] at `json_key` for any other JSON type.
pub fn expect_object<'a>(
    value: &'a JsonValue,
    json_key: &str,
) -> Result<&'a Map<String, JsonValue>, TaskError> {
    value.as_object().ok_or_else(|| TaskError::Structural {
        json_key: json_key.to_string(),
    })
}

/// Returns the child list stored under `key`, if present.
///
/// A `null` list is treated as absent.
///
/// # Errors
///
/// Returns [`TaskError::Structural`] at `<json_key>.<key>` when the list is
/// not an array.
pub fn child_list<'a>(
    object: &'a Map<String, JsonValue>,
    key: &str,
    json_key: &str,
) -> Result<&'a [JsonValue], TaskError> {
    match object.get(key) {
        None | Some(JsonValue::Null) => Ok(&[]),
        Some(JsonValue::Array(items)) => Ok(items),
        Some(_) => Err(TaskError::Structural {
            json_key: join_key(json_key, key),
        }),
    }
}

/// Rejects a list key that the action kind may not carry.
///
/// # Errors
///
/// Returns [`TaskError::Structural`] at `<json_key>.<key>` when present.
pub fn forbid_list(
    object: &Map<String, JsonValue>,
    key: &str,
    json_key: &str,
) -> Result<(), TaskError> {
    if object.contains_key(key) {
        return Err(TaskError::Structural {
            json_key: join_key(json_key, key),
        });
    }
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
