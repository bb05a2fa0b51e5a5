// crates/twain-direct-core/src/runtime/builder.rs
// ============================================================================
// Module: TWAIN Direct Task Builder
// Description: Builds the node hierarchy from a parsed task document.
// Purpose: Apply vendor filtering, topology checks, and default policies.
// Dependencies: serde_json, tracing, crate::core, crate::runtime::topology
// ============================================================================

//! ## Overview
//! Construction walks the document in order. At every level the builder
//! first decides vendor ownership (content owned by an unknown vendor is
//! skipped with its whole subtree), then validates topology, then creates
//! the node and recurses into its children.
//!
//! Once the hierarchy is complete a single fix-up pass assigns positional
//! exception policies to nodes that did not declare one:
//! - actions default to `nextAction` when a later action exists,
//! - streams and everything inside them default to `nextStream` when a
//!   later stream exists in the same action,
//! - encryption profiles default to `nextEncryptionProfile` when a later
//!   profile exists,
//! - the last node of each kind defaults to `ignore`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Map;
use serde_json::Value as JsonValue;

use crate::core::error::TaskError;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::AttributeId;
use crate::core::identifiers::PixelFormatId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::StreamId;
use crate::core::identifiers::VendorId;
use crate::core::policy::ExceptionPolicy;
use crate::core::policy::GuidOwner;
use crate::core::policy::PolicySetting;
use crate::core::setting::AttributeKind;
use crate::core::task::Action;
use crate::core::task::ActionKind;
use crate::core::task::AddressingAttribute;
use crate::core::task::AddressingSetting;
use crate::core::task::Attribute;
use crate::core::task::EncryptionProfile;
use crate::core::task::NodeMeta;
use crate::core::task::PixelFormat;
use crate::core::task::PixelFormatSelector;
use crate::core::task::PixelType;
use crate::core::task::Source;
use crate::core::task::SourceSelector;
use crate::core::task::Stream;
use crate::core::task::Task;
use crate::core::task::Value;
use crate::runtime::document::TaskDocument;
use crate::runtime::topology::NodeKind;
use crate::runtime::topology::check_node;
use crate::runtime::topology::child_list;
use crate::runtime::topology::expect_object;
use crate::runtime::topology::forbid_list;

// ============================================================================
// SECTION: Vendor Scope
// ============================================================================

/// Effective vendor ownership inherited down the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scope {
    /// Owner class.
    owner: GuidOwner,
    /// Scanner vendor, when scanner-owned.
    vendor: Option<VendorId>,
}

impl Scope {
    /// Scope of the document root.
    const ROOT: Self = Self {
        owner: GuidOwner::TwainDirect,
        vendor: None,
    };
}

// ============================================================================
// SECTION: Builder
// ============================================================================

/// Builds a [`Task`] from a parsed document.
#[derive(Debug, Clone, Copy)]
pub struct TaskBuilder<'a> {
    /// Vendor id of the scanner in session.
    scanner: Option<&'a VendorId>,
}

impl<'a> TaskBuilder<'a> {
    /// Creates a builder for the given scanner vendor.
    #[must_use]
    pub const fn new(scanner: Option<&'a VendorId>) -> Self {
        Self {
            scanner,
        }
    }

    /// Builds the hierarchy and runs the default-policy fix-up pass.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Structural`] on the first topology violation.
    pub fn build(&self, document: &TaskDocument) -> Result<Task, TaskError> {
        let root = expect_object(document.root(), "")?;
        check_node(NodeKind::Task, root, "")?;
        let locale = root.get("locale").and_then(JsonValue::as_str).map(str::to_string);
        let mut task = Task::new(locale);
        for (index, entry) in child_list(root, "actions", "")?.iter().enumerate() {
            self.build_action(&mut task, entry, index)?;
        }
        apply_default_policies(&mut task);
        tracing::debug!(
            actions = task.action_count(),
            values = task.value_count(),
            "task hierarchy built"
        );
        Ok(task)
    }

    /// Resolves the scope of a node object; `None` means "skip the subtree".
    fn scope_of(&self, object: &Map<String, JsonValue>, parent: Scope) -> Option<(Scope, bool)> {
        let declared = match object.get("vendor") {
            None | Some(JsonValue::Null) => return Some((parent, false)),
            Some(JsonValue::String(text)) if text.trim().is_empty() => {
                return Some((parent, false));
            }
            Some(JsonValue::String(text)) => text.as_str(),
            Some(_) => return None,
        };
        match GuidOwner::classify(declared, self.scanner) {
            GuidOwner::TwainDirect => Some((Scope::ROOT, false)),
            GuidOwner::Scanner => {
                let vendor = self.scanner.copied();
                let scope = Scope {
                    owner: GuidOwner::Scanner,
                    vendor,
                };
                Some((scope, parent.vendor != vendor))
            }
            GuidOwner::Unknown => None,
        }
    }

    /// Builds one action and its children.
    fn build_action(
        &self,
        task: &mut Task,
        entry: &JsonValue,
        index: usize,
    ) -> Result<(), TaskError> {
        let json_key = format!("actions[{index}]");
        let object = expect_object(entry, &json_key)?;
        let Some((scope, declares)) = self.scope_of(object, Scope::ROOT) else {
            tracing::debug!(json_key = %json_key, "skipping action owned by another vendor");
            return Ok(());
        };
        check_node(NodeKind::Action, object, &json_key)?;
        let name = text_field(object, "action").unwrap_or_else(|| "configure".to_string());
        let kind = ActionKind::classify(&name, scope.owner);
        match kind {
            ActionKind::Configure => forbid_list(object, "encryptionProfiles", &json_key)?,
            ActionKind::EncryptionProfiles => forbid_list(object, "streams", &json_key)?,
            ActionKind::EncryptionReport => {
                forbid_list(object, "streams", &json_key)?;
                forbid_list(object, "encryptionProfiles", &json_key)?;
            }
            ActionKind::VendorExtension | ActionKind::Unrecognized => {}
        }
        let meta = node_meta(json_key.clone(), scope, declares, object);
        let action = task.push_action(Action {
            meta,
            name,
            kind,
            streams: Vec::new(),
            profiles: Vec::new(),
            report: None,
        });
        match kind {
            ActionKind::Configure => {
                for (position, entry) in
                    child_list(object, "streams", &json_key)?.iter().enumerate()
                {
                    self.build_stream(task, action, entry, position, scope)?;
                }
            }
            ActionKind::EncryptionProfiles => {
                for (position, entry) in
                    child_list(object, "encryptionProfiles", &json_key)?.iter().enumerate()
                {
                    self.build_profile(task, action, entry, position, scope)?;
                }
            }
            ActionKind::EncryptionReport
            | ActionKind::VendorExtension
            | ActionKind::Unrecognized => {}
        }
        Ok(())
    }

    /// Builds one stream and its sources.
    fn build_stream(
        &self,
        task: &mut Task,
        action: ActionId,
        entry: &JsonValue,
        index: usize,
        parent: Scope,
    ) -> Result<(), TaskError> {
        let json_key = task[action].meta.child_key("streams", index);
        let object = expect_object(entry, &json_key)?;
        let Some((scope, declares)) = self.scope_of(object, parent) else {
            tracing::debug!(json_key = %json_key, "skipping stream owned by another vendor");
            return Ok(());
        };
        check_node(NodeKind::Stream, object, &json_key)?;
        let name = text_field(object, "name").unwrap_or_else(|| format!("stream{index}"));
        let stream = task.push_stream(Stream {
            meta: node_meta(json_key.clone(), scope, declares, object),
            action,
            name,
            sources: Vec::new(),
        });
        for (position, entry) in child_list(object, "sources", &json_key)?.iter().enumerate() {
            self.build_source(task, stream, entry, position, scope)?;
        }
        Ok(())
    }

    /// Builds one source and its pixel formats.
    fn build_source(
        &self,
        task: &mut Task,
        stream: StreamId,
        entry: &JsonValue,
        index: usize,
        parent: Scope,
    ) -> Result<(), TaskError> {
        let json_key = task[stream].meta.child_key("sources", index);
        let object = expect_object(entry, &json_key)?;
        let Some((scope, declares)) = self.scope_of(object, parent) else {
            tracing::debug!(json_key = %json_key, "skipping source owned by another vendor");
            return Ok(());
        };
        check_node(NodeKind::Source, object, &json_key)?;
        let selector_text = text_field(object, "source").unwrap_or_else(|| "any".to_string());
        let selector = SourceSelector::classify(&selector_text, scope.owner);
        let source = task.push_source(Source {
            meta: node_meta(json_key.clone(), scope, declares, object),
            stream,
            name: text_field(object, "name").unwrap_or_else(|| format!("source{index}")),
            selector_text,
            selector,
            addressing: selector.addressing(),
            pixel_formats: Vec::new(),
        });
        for (position, entry) in child_list(object, "pixelFormats", &json_key)?.iter().enumerate() {
            self.build_pixel_format(task, source, entry, position, scope)?;
        }
        Ok(())
    }

    /// Builds one pixel format and its attributes.
    fn build_pixel_format(
        &self,
        task: &mut Task,
        source: SourceId,
        entry: &JsonValue,
        index: usize,
        parent: Scope,
    ) -> Result<(), TaskError> {
        let json_key = task[source].meta.child_key("pixelFormats", index);
        let object = expect_object(entry, &json_key)?;
        let Some((scope, declares)) = self.scope_of(object, parent) else {
            tracing::debug!(json_key = %json_key, "skipping pixel format owned by another vendor");
            return Ok(());
        };
        check_node(NodeKind::PixelFormat, object, &json_key)?;
        let selector_text =
            text_field(object, "pixelFormat").unwrap_or_else(|| "rgb24".to_string());
        let selector = PixelFormatSelector::classify(&selector_text, scope.owner);
        let mut addressing: Vec<AddressingAttribute> = task[source]
            .addressing
            .iter()
            .map(|attribute| AddressingAttribute::new(attribute.setting, attribute.desired))
            .collect();
        addressing.push(AddressingAttribute::new(
            AddressingSetting::PixelType,
            selector.pixel_type().map(PixelType::native),
        ));
        let pixel_format = task.push_pixel_format(PixelFormat {
            meta: node_meta(json_key.clone(), scope, declares, object),
            source,
            name: text_field(object, "name").unwrap_or_else(|| format!("pixelFormat{index}")),
            selector_text,
            selector,
            addressing,
            attributes: Vec::new(),
            resolved_pixel_type: None,
        });
        for (position, entry) in child_list(object, "attributes", &json_key)?.iter().enumerate() {
            self.build_attribute(task, pixel_format, entry, position, scope)?;
        }
        Ok(())
    }

    /// Builds one attribute and its values.
    fn build_attribute(
        &self,
        task: &mut Task,
        pixel_format: PixelFormatId,
        entry: &JsonValue,
        index: usize,
        parent: Scope,
    ) -> Result<(), TaskError> {
        let json_key = task[pixel_format].meta.child_key("attributes", index);
        let object = expect_object(entry, &json_key)?;
        let Some((scope, declares)) = self.scope_of(object, parent) else {
            tracing::debug!(json_key = %json_key, "skipping attribute owned by another vendor");
            return Ok(());
        };
        check_node(NodeKind::Attribute, object, &json_key)?;
        let name = text_field(object, "attribute").unwrap_or_default();
        let kind = AttributeKind::from_name(&name).unwrap_or(match scope.owner {
            GuidOwner::Scanner => AttributeKind::Vendor,
            GuidOwner::TwainDirect | GuidOwner::Unknown => AttributeKind::Unrecognized,
        });
        let attribute = task.push_attribute(Attribute {
            meta: node_meta(json_key.clone(), scope, declares, object),
            pixel_format,
            name,
            kind,
            values: Vec::new(),
        });
        for (position, entry) in child_list(object, "values", &json_key)?.iter().enumerate() {
            self.build_value(task, attribute, entry, position, scope)?;
        }
        Ok(())
    }

    /// Builds one value.
    fn build_value(
        &self,
        task: &mut Task,
        attribute: AttributeId,
        entry: &JsonValue,
        index: usize,
        parent: Scope,
    ) -> Result<(), TaskError> {
        let json_key = task[attribute].meta.child_key("values", index);
        let object = expect_object(entry, &json_key)?;
        let Some((scope, declares)) = self.scope_of(object, parent) else {
            tracing::debug!(json_key = %json_key, "skipping value owned by another vendor");
            return Ok(());
        };
        check_node(NodeKind::Value, object, &json_key)?;
        let raw = object.get("value").cloned().unwrap_or(JsonValue::Null);
        let text = match &raw {
            JsonValue::String(text) => text.clone(),
            JsonValue::Null => String::new(),
            other => other.to_string(),
        };
        task.push_value(Value {
            meta: node_meta(json_key, scope, declares, object),
            attribute,
            raw,
            text,
            setting: None,
            reply_value: None,
            accepted: Vec::new(),
        });
        Ok(())
    }

    /// Builds one encryption profile candidate.
    fn build_profile(
        &self,
        task: &mut Task,
        action: ActionId,
        entry: &JsonValue,
        index: usize,
        parent: Scope,
    ) -> Result<(), TaskError> {
        let json_key = task[action].meta.child_key("encryptionProfiles", index);
        let object = expect_object(entry, &json_key)?;
        let Some((scope, declares)) = self.scope_of(object, parent) else {
            tracing::debug!(json_key = %json_key, "skipping profile owned by another vendor");
            return Ok(());
        };
        check_node(NodeKind::EncryptionProfile, object, &json_key)?;
        task.push_profile(EncryptionProfile {
            meta: node_meta(json_key, scope, declares, object),
            action,
            name: text_field(object, "name").or_else(|| text_field(object, "encryptionProfile")),
            profile: object.get("profile").cloned(),
        });
        Ok(())
    }
}

// ============================================================================
// SECTION: Field Helpers
// ============================================================================

/// Reads a scalar field as text.
fn text_field(object: &Map<String, JsonValue>, key: &str) -> Option<String> {
    match object.get(key)? {
        JsonValue::String(text) => Some(text.clone()),
        JsonValue::Number(number) => Some(number.to_string()),
        JsonValue::Bool(flag) => Some(flag.to_string()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => None,
    }
}

/// Creates node metadata, reading the declared exception policy.
fn node_meta(
    json_key: String,
    scope: Scope,
    declares: bool,
    object: &Map<String, JsonValue>,
) -> NodeMeta {
    let mut meta = NodeMeta::new(json_key, scope.owner, scope.vendor);
    meta.declares_vendor = declares;
    meta.exception = match object.get("exception") {
        None | Some(JsonValue::Null) => PolicySetting::Pending,
        Some(JsonValue::String(text)) => {
            ExceptionPolicy::parse(text).map_or_else(
                || {
                    tracing::warn!(
                        json_key = %meta.json_key,
                        exception = %text,
                        "unknown exception policy; using ignore"
                    );
                    PolicySetting::Explicit(ExceptionPolicy::Ignore)
                },
                PolicySetting::Explicit,
            )
        }
        Some(_) => {
            tracing::warn!(json_key = %meta.json_key, "non-string exception policy; using ignore");
            PolicySetting::Explicit(ExceptionPolicy::Ignore)
        }
    };
    meta
}

// ============================================================================
// SECTION: Default Policies
// ============================================================================

/// Returns `next` when a later sibling exists, else `ignore`.
const fn positional(position: usize, count: usize, next: ExceptionPolicy) -> ExceptionPolicy {
    if position + 1 < count { next } else { ExceptionPolicy::Ignore }
}

/// Assigns `fallback` when the node did not declare a policy.
const fn default_policy(meta: &mut NodeMeta, fallback: ExceptionPolicy) {
    if matches!(meta.exception, PolicySetting::Pending) {
        meta.exception = PolicySetting::Defaulted(fallback);
    }
}

/// Resolves every pending policy in the task.
fn apply_default_policies(task: &mut Task) {
    let count = task.action_count();
    for (position, action) in task.action_ids().enumerate() {
        default_policy(
            &mut task[action].meta,
            positional(position, count, ExceptionPolicy::NextAction),
        );
        let streams = task[action].streams.clone();
        for (position, stream) in streams.iter().enumerate() {
            let fallback = positional(position, streams.len(), ExceptionPolicy::NextStream);
            default_stream_policies(task, *stream, fallback);
        }
        let profiles = task[action].profiles.clone();
        for (position, profile) in profiles.iter().enumerate() {
            default_policy(
                &mut task[*profile].meta,
                positional(position, profiles.len(), ExceptionPolicy::NextEncryptionProfile),
            );
        }
    }
}

/// Assigns the stream fallback to a stream and everything inside it.
fn default_stream_policies(task: &mut Task, stream: StreamId, fallback: ExceptionPolicy) {
    default_policy(&mut task[stream].meta, fallback);
    for source in task[stream].sources.clone() {
        default_policy(&mut task[source].meta, fallback);
        for pixel_format in task[source].pixel_formats.clone() {
            default_policy(&mut task[pixel_format].meta, fallback);
            for attribute in task[pixel_format].attributes.clone() {
                default_policy(&mut task[attribute].meta, fallback);
                for value in task[attribute].values.clone() {
                    default_policy(&mut task[value].meta, fallback);
                }
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use super::TaskBuilder;
    use crate::core::identifiers::VendorId;
    use crate::core::policy::ExceptionPolicy;
    use crate::core::policy::GuidOwner;
    use crate::core::policy::PolicySetting;
    use crate::core::task::SourceSelector;
    use crate::core::task::Task;
    use crate::runtime::document::TaskDocument;

    /// Scanner vendor used by these tests.
    const SCANNER: &str = "8a7c2f5e-4b1d-4f6a-9c3e-2d1b0a9f8e7d";

    /// Builds a task from JSON text.
    fn build(text: &str) -> Task {
        let scanner = VendorId::parse(SCANNER).unwrap();
        TaskBuilder::new(Some(&scanner)).build(&TaskDocument::parse(text).unwrap()).unwrap()
    }

    /// Tests the missing-field defaults.
    #[test]
    fn test_missing_fields_use_defaults() {
        let task = build(r#"{"actions":[{"streams":[{"sources":[{"pixelFormats":[{}]}]}]}]}"#);
        let action = task.action_ids().next().unwrap();
        assert_eq!(task[action].name, "configure");
        let stream = task[action].streams[0];
        assert_eq!(task[stream].name, "stream0");
        let source = task[stream].sources[0];
        assert_eq!(task[source].selector, SourceSelector::Any);
        assert_eq!(task[source].name, "source0");
        let pixel_format = task[source].pixel_formats[0];
        assert_eq!(task[pixel_format].selector_text, "rgb24");
        assert_eq!(task[pixel_format].addressing.len(), 5);
    }

    /// Tests that positional defaults never copy a parent's explicit policy.
    #[test]
    fn test_defaults_are_positional() {
        let task = build(
            r#"{"actions":[{"action":"configure","exception":"fail","streams":[
                {"sources":[{"source":"feeder"}]},
                {"sources":[{"source":"flatbed"}]}]}]}"#,
        );
        let action = task.action_ids().next().unwrap();
        assert_eq!(task[action].meta.exception, PolicySetting::Explicit(ExceptionPolicy::Fail));
        let first = task[action].streams[0];
        let second = task[action].streams[1];
        let first_source = task[first].sources[0];
        let second_source = task[second].sources[0];
        assert_eq!(task[first_source].meta.policy(), ExceptionPolicy::NextStream);
        assert_eq!(task[second_source].meta.policy(), ExceptionPolicy::Ignore);
    }

    /// Tests vendor inheritance and declared-vendor tracking.
    #[test]
    fn test_vendor_scope_is_inherited() {
        let text = format!(
            r#"{{"actions":[{{"streams":[{{"vendor":"{SCANNER}","sources":[{{"source":"tray7"}}]}}]}}]}}"#
        );
        let task = build(&text);
        let action = task.action_ids().next().unwrap();
        let stream = task[action].streams[0];
        let source = task[stream].sources[0];
        assert_eq!(task[stream].meta.owner, GuidOwner::Scanner);
        assert!(task[stream].meta.declares_vendor);
        assert_eq!(task[source].meta.owner, GuidOwner::Scanner);
        assert!(!task[source].meta.declares_vendor);
        assert_eq!(task[source].selector, SourceSelector::Vendor);
    }

    /// Tests that unknown-vendor content is dropped before topology checks.
    #[test]
    fn test_unknown_vendor_subtree_is_opaque() {
        let task = build(
            r#"{"actions":[{"streams":[
                {"vendor":"00000000-0000-0000-0000-000000000001","attribute":"x"},
                {"name":"kept"}]}]}"#,
        );
        let action = task.action_ids().next().unwrap();
        assert_eq!(task[action].streams.len(), 1);
        let stream = task[action].streams[0];
        assert_eq!(task[stream].name, "kept");
        assert_eq!(task[stream].meta.json_key, "actions[0].streams[1]");
    }
}
