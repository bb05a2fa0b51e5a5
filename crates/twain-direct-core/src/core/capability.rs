// crates/twain-direct-core/src/core/capability.rs
// ============================================================================
// Module: TWAIN Direct Native Capabilities
// Description: Native capability operations in their delimited tuple form.
// Purpose: Carry device-vocabulary settings between resolver and device channel.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A native capability operation is one device setting in the device's own
//! vocabulary, written as a comma-delimited tuple:
//!
//! ```text
//! ICAP_PIXELTYPE,TWON_ONEVALUE,TWTY_UINT16,2
//! CAP_DOUBLEFEEDDETECTION,TWON_ARRAY,TWTY_UINT16,1,0
//! ```
//!
//! Array containers carry an explicit element count before the elements.
//! The textual form round-trips through [`fmt::Display`] and [`FromStr`] and
//! is what failure replies quote back to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Capability Names
// ============================================================================

/// Automatic paper source detection.
pub const CAP_AUTOMATICSENSEMEDIUM: &str = "CAP_AUTOMATICSENSEMEDIUM";
/// Camera side selection for per-side settings.
pub const CAP_CAMERASIDE: &str = "CAP_CAMERASIDE";
/// Double feed detection methods.
pub const CAP_DOUBLEFEEDDETECTION: &str = "CAP_DOUBLEFEEDDETECTION";
/// Duplex scanning switch.
pub const CAP_DUPLEXENABLED: &str = "CAP_DUPLEXENABLED";
/// Automatic document feeder switch.
pub const CAP_FEEDERENABLED: &str = "CAP_FEEDERENABLED";
/// Number of sheets to scan.
pub const CAP_SHEETCOUNT: &str = "CAP_SHEETCOUNT";
/// Number of images to transfer.
pub const CAP_XFERCOUNT: &str = "CAP_XFERCOUNT";
/// Automatic border detection.
pub const ICAP_AUTOMATICBORDERDETECTION: &str = "ICAP_AUTOMATICBORDERDETECTION";
/// Automatic deskew.
pub const ICAP_AUTOMATICDESKEW: &str = "ICAP_AUTOMATICDESKEW";
/// Automatic length detection.
pub const ICAP_AUTOMATICLENGTHDETECTION: &str = "ICAP_AUTOMATICLENGTHDETECTION";
/// Automatic rotation.
pub const ICAP_AUTOMATICROTATE: &str = "ICAP_AUTOMATICROTATE";
/// Brightness.
pub const ICAP_BRIGHTNESS: &str = "ICAP_BRIGHTNESS";
/// Compression scheme.
pub const ICAP_COMPRESSION: &str = "ICAP_COMPRESSION";
/// Contrast.
pub const ICAP_CONTRAST: &str = "ICAP_CONTRAST";
/// Pixel type (bitonal, gray, color).
pub const ICAP_PIXELTYPE: &str = "ICAP_PIXELTYPE";
/// Fixed rotation in degrees.
pub const ICAP_ROTATION: &str = "ICAP_ROTATION";
/// Bitonal threshold.
pub const ICAP_THRESHOLD: &str = "ICAP_THRESHOLD";
/// Horizontal resolution.
pub const ICAP_XRESOLUTION: &str = "ICAP_XRESOLUTION";
/// Vertical resolution.
pub const ICAP_YRESOLUTION: &str = "ICAP_YRESOLUTION";

// ============================================================================
// SECTION: Container and Item Types
// ============================================================================

/// Container shape of a native capability value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Container {
    /// A single value.
    OneValue,
    /// A counted list of values.
    Array,
}

impl Container {
    /// Returns the native container keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneValue => "TWON_ONEVALUE",
            Self::Array => "TWON_ARRAY",
        }
    }

    /// Parses a native container keyword.
    fn parse(text: &str) -> Option<Self> {
        match text {
            "TWON_ONEVALUE" => Some(Self::OneValue),
            "TWON_ARRAY" => Some(Self::Array),
            _ => None,
        }
    }
}

/// Item type of a native capability value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Boolean (0 or 1).
    Bool,
    /// Signed 16-bit integer.
    Int16,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 16-bit integer.
    #[serde(rename = "uint16")]
    UInt16,
    /// Unsigned 32-bit integer.
    #[serde(rename = "uint32")]
    UInt32,
    /// Fixed-point number.
    Fix32,
}

impl ItemType {
    /// Returns the native item type keyword.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bool => "TWTY_BOOL",
            Self::Int16 => "TWTY_INT16",
            Self::Int32 => "TWTY_INT32",
            Self::UInt16 => "TWTY_UINT16",
            Self::UInt32 => "TWTY_UINT32",
            Self::Fix32 => "TWTY_FIX32",
        }
    }

    /// Parses a native item type keyword.
    fn parse(text: &str) -> Option<Self> {
        match text {
            "TWTY_BOOL" => Some(Self::Bool),
            "TWTY_INT16" => Some(Self::Int16),
            "TWTY_INT32" => Some(Self::Int32),
            "TWTY_UINT16" => Some(Self::UInt16),
            "TWTY_UINT32" => Some(Self::UInt32),
            "TWTY_FIX32" => Some(Self::Fix32),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Native Capability
// ============================================================================

/// One native capability operation.
///
/// # Invariants
/// - `name` is non-empty and contains no commas.
/// - One-value containers hold exactly one value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativeCapability {
    /// Capability name (for example `ICAP_PIXELTYPE`).
    name: String,
    /// Container shape.
    container: Container,
    /// Item type.
    item_type: ItemType,
    /// Values in textual form.
    values: Vec<String>,
}

impl NativeCapability {
    /// Creates a one-value operation.
    #[must_use]
    pub fn one_value(name: &str, item_type: ItemType, value: impl fmt::Display) -> Self {
        Self {
            name: name.to_string(),
            container: Container::OneValue,
            item_type,
            values: vec![value.to_string()],
        }
    }

    /// Creates a boolean one-value operation.
    #[must_use]
    pub fn boolean(name: &str, enabled: bool) -> Self {
        Self::one_value(name, ItemType::Bool, u8::from(enabled))
    }

    /// Creates an array operation.
    #[must_use]
    pub fn array<T: fmt::Display>(name: &str, item_type: ItemType, values: &[T]) -> Self {
        Self {
            name: name.to_string(),
            container: Container::Array,
            item_type,
            values: values.iter().map(ToString::to_string).collect(),
        }
    }

    /// Returns the capability name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the container shape.
    #[must_use]
    pub const fn container(&self) -> Container {
        self.container
    }

    /// Returns the item type.
    #[must_use]
    pub const fn item_type(&self) -> ItemType {
        self.item_type
    }

    /// Returns all values.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Returns the first value, if any.
    #[must_use]
    pub fn value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }

    /// Returns a copy of this operation carrying a different single value.
    #[must_use]
    pub fn with_value(&self, value: impl fmt::Display) -> Self {
        Self {
            name: self.name.clone(),
            container: Container::OneValue,
            item_type: self.item_type,
            values: vec![value.to_string()],
        }
    }
}

impl fmt::Display for NativeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.name, self.container.as_str(), self.item_type.as_str())?;
        if self.container == Container::Array {
            write!(f, ",{}", self.values.len())?;
        }
        for value in &self.values {
            write!(f, ",{value}")?;
        }
        Ok(())
    }
}

/// Errors raised when decoding a native capability tuple.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityParseError {
    /// The tuple has fewer fields than its container requires.
    #[error("capability tuple is truncated: {0}")]
    Truncated(String),
    /// The capability name is empty.
    #[error("capability name is empty")]
    EmptyName,
    /// Unknown container keyword.
    #[error("unknown capability container: {0}")]
    Container(String),
    /// Unknown item type keyword.
    #[error("unknown capability item type: {0}")]
    ItemType(String),
    /// Array count does not match the number of elements.
    #[error("array count {declared} does not match {actual} elements")]
    Count {
        /// Count declared in the tuple.
        declared: String,
        /// Number of elements present.
        actual: usize,
    },
}

impl FromStr for NativeCapability {
    type Err = CapabilityParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut fields = text.trim().split(',').map(str::trim);
        let name = fields.next().unwrap_or_default();
        if name.is_empty() {
            return Err(CapabilityParseError::EmptyName);
        }
        let container_text =
            fields.next().ok_or_else(|| CapabilityParseError::Truncated(text.to_string()))?;
        let container = Container::parse(container_text)
            .ok_or_else(|| CapabilityParseError::Container(container_text.to_string()))?;
        let item_text =
            fields.next().ok_or_else(|| CapabilityParseError::Truncated(text.to_string()))?;
        let item_type = ItemType::parse(item_text)
            .ok_or_else(|| CapabilityParseError::ItemType(item_text.to_string()))?;
        let values: Vec<String> = match container {
            Container::OneValue => {
                let value = fields
                    .next()
                    .ok_or_else(|| CapabilityParseError::Truncated(text.to_string()))?;
                vec![value.to_string()]
            }
            Container::Array => {
                let declared = fields
                    .next()
                    .ok_or_else(|| CapabilityParseError::Truncated(text.to_string()))?;
                let elements: Vec<String> = fields.by_ref().map(str::to_string).collect();
                if declared.parse::<usize>().ok() != Some(elements.len()) {
                    return Err(CapabilityParseError::Count {
                        declared: declared.to_string(),
                        actual: elements.len(),
                    });
                }
                elements
            }
        };
        Ok(Self {
            name: name.to_string(),
            container,
            item_type,
            values,
        })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
