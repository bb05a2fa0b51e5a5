// crates/twain-direct-core/src/core/identifiers.rs
// ============================================================================
// Module: TWAIN Direct Identifiers
// Description: Typed arena identifiers and vendor GUIDs for task hierarchies.
// Purpose: Provide strongly typed handles into the task arena with stable forms.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! Every node in a parsed task lives in a per-kind arena owned by
//! [`crate::core::Task`]. The identifiers in this module are dense, 0-based
//! indexes into those arenas. They are only minted by the hierarchy builder,
//! so an identifier taken from a task is always valid for that task.
//!
//! [`VendorId`] wraps the GUID that scopes vendor-specific content.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Arena Identifiers
// ============================================================================

/// Identifier of an action node.
///
/// # Invariants
/// - Indexes the action arena of the task that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(usize);

impl ActionId {
    /// Creates an action identifier from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "action#{}", self.0)
    }
}

/// Identifier of a stream node.
///
/// # Invariants
/// - Indexes the stream arena of the task that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamId(usize);

impl StreamId {
    /// Creates a stream identifier from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream#{}", self.0)
    }
}

/// Identifier of a source node.
///
/// # Invariants
/// - Indexes the source arena of the task that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(usize);

impl SourceId {
    /// Creates a source identifier from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Identifier of a pixel format node.
///
/// # Invariants
/// - Indexes the pixel format arena of the task that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelFormatId(usize);

impl PixelFormatId {
    /// Creates a pixel format identifier from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for PixelFormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pixelFormat#{}", self.0)
    }
}

/// Identifier of an attribute node.
///
/// # Invariants
/// - Indexes the attribute arena of the task that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeId(usize);

impl AttributeId {
    /// Creates an attribute identifier from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for AttributeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "attribute#{}", self.0)
    }
}

/// Identifier of a value node.
///
/// # Invariants
/// - Indexes the value arena of the task that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueId(usize);

impl ValueId {
    /// Creates a value identifier from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "value#{}", self.0)
    }
}

/// Identifier of an encryption profile node.
///
/// # Invariants
/// - Indexes the encryption profile arena of the task that minted it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(usize);

impl ProfileId {
    /// Creates an encryption profile identifier from an arena index.
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encryptionProfile#{}", self.0)
    }
}

// ============================================================================
// SECTION: Vendor Identifiers
// ============================================================================

/// Vendor GUID scoping standard or device-specific task content.
///
/// # Invariants
/// - Always a syntactically valid GUID; comparisons ignore textual case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VendorId(Uuid);

impl VendorId {
    /// Reserved vendor id owned by the TWAIN Direct standard itself.
    pub const TWAIN_DIRECT: Self = Self(Uuid::from_u128(0x211a_1e90_11e1_11e5_9493_1697_f925_ec7b));

    /// Creates a vendor identifier from a GUID.
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Parses a vendor identifier (returns `None` for malformed GUIDs).
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        Uuid::parse_str(text.trim()).ok().map(Self)
    }

    /// Returns the underlying GUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for VendorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl From<Uuid> for VendorId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}
