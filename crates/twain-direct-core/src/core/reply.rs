// crates/twain-direct-core/src/core/reply.rs
// ============================================================================
// Module: TWAIN Direct Task Reply
// Description: Serializable task reply document.
// Purpose: Mirror the successful subset of a task, or carry a single error.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The reply mirrors the task's shape but only contains nodes that settled
//! successfully. Empty lists and absent optional fields are omitted so the
//! rendered text stays stable for digesting.
//!
//! A failed task replies with exactly one action entry carrying the error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::core::encryption::EncryptionReport;
use crate::core::error::TaskFailure;

// ============================================================================
// SECTION: Reply Types
// ============================================================================

/// Root of the reply document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskReply {
    /// Action replies in document order.
    pub actions: Vec<ActionReply>,
}

/// Per-action outcome block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResults {
    /// Whether the action (or the whole task, on failure) succeeded.
    pub success: bool,
    /// Failure code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Locator of the failing node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_key: Option<String>,
    /// Parse failure offset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_offset: Option<u64>,
    /// Native operation the device refused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_value: Option<String>,
}

impl ActionResults {
    /// Returns a bare success block.
    #[must_use]
    pub const fn success() -> Self {
        Self {
            success: true,
            code: None,
            json_key: None,
            character_offset: None,
            native_value: None,
        }
    }
}

/// Reply entry for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReply {
    /// Action name.
    pub action: String,
    /// Scanner vendor, when the action declared one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Successful streams.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub streams: Vec<StreamReply>,
    /// Matched encryption profiles.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encryption_profiles: Vec<EncryptionProfileReply>,
    /// Encryption report fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<EncryptionReport>,
    /// Outcome block.
    pub results: ActionResults,
}

/// Reply entry for one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamReply {
    /// Stream name.
    pub name: String,
    /// Scanner vendor, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Successful sources.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceReply>,
}

/// Reply entry for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReply {
    /// Source selector.
    pub source: String,
    /// Source name.
    pub name: String,
    /// Scanner vendor, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Successful pixel formats.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pixel_formats: Vec<PixelFormatReply>,
}

/// Reply entry for one pixel format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixelFormatReply {
    /// Pixel format selector.
    pub pixel_format: String,
    /// Pixel format name.
    pub name: String,
    /// Scanner vendor, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Successful attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<AttributeReply>,
}

/// Reply entry for one attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeReply {
    /// Attribute name.
    pub attribute: String,
    /// Scanner vendor, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Accepted values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ValueReply>,
}

/// Reply entry for one accepted value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueReply {
    /// Value actually configured.
    pub value: JsonValue,
    /// Scanner vendor, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
}

/// Reply entry for the matched encryption profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncryptionProfileReply {
    /// Profile name.
    pub name: String,
    /// Scanner vendor, when declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    /// Catalog description of the profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<JsonValue>,
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

impl TaskReply {
    /// Reply for a task with nothing to negotiate.
    #[must_use]
    pub fn trivial() -> Self {
        Self {
            actions: vec![ActionReply {
                action: String::new(),
                vendor: None,
                streams: Vec::new(),
                encryption_profiles: Vec::new(),
                report: None,
                results: ActionResults::success(),
            }],
        }
    }

    /// Single-error reply for a failed task.
    #[must_use]
    pub fn failure(failure: &TaskFailure) -> Self {
        let error = &failure.error;
        Self {
            actions: vec![ActionReply {
                action: failure.action.clone(),
                vendor: None,
                streams: Vec::new(),
                encryption_profiles: Vec::new(),
                report: None,
                results: ActionResults {
                    success: false,
                    code: Some(error.code().to_string()),
                    json_key: error.json_key().map(str::to_string),
                    character_offset: error.character_offset(),
                    native_value: error.native_value().map(str::to_string),
                },
            }],
        }
    }

    /// Returns true when every action reports success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.actions.iter().all(|action| action.results.success)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::TaskReply;
    use crate::core::error::TaskError;
    use crate::core::error::TaskFailure;

    /// Tests the exact text of the trivial reply.
    #[test]
    fn test_trivial_reply_text() {
        let text = serde_json::to_string(&TaskReply::trivial()).unwrap();
        assert_eq!(text, r#"{"actions":[{"action":"","results":{"success":true}}]}"#);
    }

    /// Tests that failure replies carry only the fields the error has.
    #[test]
    fn test_failure_reply_fields() {
        let reply = TaskReply::failure(&TaskFailure {
            action: "foo".to_string(),
            error: TaskError::InvalidValue {
                json_key: "actions[0].action".to_string(),
                value: "foo".to_string(),
            },
        });
        let text = serde_json::to_string(&reply).unwrap();
        assert_eq!(
            text,
            r#"{"actions":[{"action":"foo","results":{"success":false,"code":"invalidValue","jsonKey":"actions[0].action"}}]}"#
        );
        assert!(!reply.is_success());
    }
}
