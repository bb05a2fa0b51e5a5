// crates/twain-direct-core/src/runtime/document.rs
// ============================================================================
// Module: TWAIN Direct Task Document
// Description: Path-addressable wrapper over a parsed task document.
// Purpose: Parse raw task text and report parse failures by character offset.
// Dependencies: serde_json, crate::core::error
// ============================================================================

//! ## Overview
//! The task text is parsed once into a generic JSON value. Parse failures are
//! reported as a character offset into the original text rather than a
//! line/column pair, because that is what task replies carry.
//!
//! Paths use the same dotted form as reply locators, for example
//! `actions[0].streams[1].sources[0].source`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value as JsonValue;

use crate::core::error::TaskError;

// ============================================================================
// SECTION: Document
// ============================================================================

/// Parsed task document.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskDocument {
    /// Root JSON value.
    root: JsonValue,
}

impl TaskDocument {
    /// Parses raw task text.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Malformed`] with the character offset of the
    /// first syntax error.
    pub fn parse(text: &str) -> Result<Self, TaskError> {
        serde_json::from_str::<JsonValue>(text)
            .map(|root| Self {
                root,
            })
            .map_err(|err| TaskError::Malformed {
                offset: character_offset(text, err.line(), err.column()),
                message: err.to_string(),
            })
    }

    /// Returns the root value.
    #[must_use]
    pub const fn root(&self) -> &JsonValue {
        &self.root
    }

    /// Looks up a dotted path such as `actions[0].streams[1].name`.
    ///
    /// The empty path addresses the root.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&JsonValue> {
        if path.is_empty() {
            return Some(&self.root);
        }
        path.split('.').try_fold(&self.root, lookup_segment)
    }
}

/// Resolves one `name[index][index]` segment below `current`.
fn lookup_segment<'a>(current: &'a JsonValue, segment: &str) -> Option<&'a JsonValue> {
    let (name, mut rest) = match segment.find('[') {
        Some(at) => segment.split_at(at),
        None => (segment, ""),
    };
    let mut node = if name.is_empty() { current } else { current.get(name)? };
    while let Some(stripped) = rest.strip_prefix('[') {
        let close = stripped.find(']')?;
        let index = stripped[.. close].parse::<usize>().ok()?;
        node = node.get(index)?;
        rest = &stripped[close + 1 ..];
    }
    if rest.is_empty() { Some(node) } else { None }
}

// ============================================================================
// SECTION: Offsets
// ============================================================================

/// Converts a parser line/column pair (both 1-based) into a character offset.
fn character_offset(text: &str, line: usize, column: usize) -> u64 {
    let mut offset = 0usize;
    for (index, current) in text.split('\n').enumerate() {
        if index + 1 == line {
            let bytes = column.saturating_sub(1).min(current.len());
            offset += current.get(.. bytes).map_or(bytes, |prefix| prefix.chars().count());
            return u64::try_from(offset).unwrap_or(u64::MAX);
        }
        offset += current.chars().count() + 1;
    }
    u64::try_from(text.chars().count()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::panic,
        reason = "Test-only assertions are permitted."
    )]

    use serde_json::json;

    use super::TaskDocument;
    use crate::core::error::TaskError;

    /// Tests that parse errors report the offset of the offending character.
    #[test]
    fn test_parse_error_reports_character_offset() {
        let Err(TaskError::Malformed {
            offset, ..
        }) = TaskDocument::parse(r#"{"actions":}"#)
        else {
            panic!("expected malformed document");
        };
        assert_eq!(offset, 11);
    }

    /// Tests offsets on later lines count the preceding lines.
    #[test]
    fn test_parse_error_offset_spans_lines() {
        let Err(TaskError::Malformed {
            offset, ..
        }) = TaskDocument::parse("{\n  \"actions\": [,]\n}")
        else {
            panic!("expected malformed document");
        };
        assert_eq!(offset, 16);
    }

    /// Tests dotted path lookup through objects and arrays.
    #[test]
    fn test_lookup_dotted_path() {
        let document = TaskDocument::parse(
            r#"{"actions":[{"action":"configure","streams":[{"name":"s0"},{"name":"s1"}]}]}"#,
        )
        .unwrap();
        assert_eq!(document.lookup("actions[0].action"), Some(&json!("configure")));
        assert_eq!(document.lookup("actions[0].streams[1].name"), Some(&json!("s1")));
        assert!(document.lookup("actions[0].streams[2]").is_none());
        assert!(document.lookup("actions[x]").is_none());
        assert!(document.lookup("").is_some());
    }
}
