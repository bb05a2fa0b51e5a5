// crates/twain-direct-core/src/core/setting.rs
// ============================================================================
// Module: TWAIN Direct Settings
// Description: Attribute kinds and typed settings parsed from task values.
// Purpose: Replace string dispatch with closed enums checked at compile time.
// Dependencies: serde, crate::core::capability
// ============================================================================

//! ## Overview
//! Each attribute name maps to an [`AttributeKind`] through a static table.
//! Each value string is parsed into a [`Setting`] for its attribute kind.
//! Parsing is pure and device-independent; it is what the Process phase uses
//! to decide whether a value is recognized. Turning a setting into native
//! operations happens later, in the resolver, with device context.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::capability::NativeCapability;

// ============================================================================
// SECTION: Attribute Kinds
// ============================================================================

/// Closed set of attributes the engine knows how to negotiate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeKind {
    /// Automatic deskew on/off.
    AutomaticDeskew,
    /// Brightness level.
    Brightness,
    /// Compression scheme.
    Compression,
    /// Contrast level.
    Contrast,
    /// Cropping mode.
    Cropping,
    /// Double feed detection method.
    DoubleFeedDetection,
    /// Number of sheets to scan.
    NumberOfSheets,
    /// Resolution in dots per inch.
    Resolution,
    /// Rotation.
    Rotation,
    /// Bitonal threshold.
    Threshold,
    /// Scanner-owned attribute whose values are native tuples.
    Vendor,
    /// Name not recognized for standard content.
    Unrecognized,
}

/// Attribute name table.
const ATTRIBUTE_NAMES: &[(&str, AttributeKind)] = &[
    ("automaticDeskew", AttributeKind::AutomaticDeskew),
    ("brightness", AttributeKind::Brightness),
    ("compression", AttributeKind::Compression),
    ("contrast", AttributeKind::Contrast),
    ("cropping", AttributeKind::Cropping),
    ("doubleFeedDetection", AttributeKind::DoubleFeedDetection),
    ("numberOfSheets", AttributeKind::NumberOfSheets),
    ("resolution", AttributeKind::Resolution),
    ("rotation", AttributeKind::Rotation),
    ("threshold", AttributeKind::Threshold),
];

impl AttributeKind {
    /// Looks up a standard attribute name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        ATTRIBUTE_NAMES.iter().find(|(candidate, _)| *candidate == name).map(|(_, kind)| *kind)
    }
}

// ============================================================================
// SECTION: Typed Settings
// ============================================================================

/// Compression schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CompressionSetting {
    /// Uncompressed.
    None,
    /// CCITT group 4 (bitonal).
    Group4,
    /// JPEG (gray and color).
    Jpeg,
    /// Group 4 for bitonal images, JPEG otherwise.
    AutoVersion1,
}

/// Cropping modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CroppingSetting {
    /// Detect borders.
    Automatic,
    /// Fixed frame.
    Fixed,
    /// Fixed width with detected length.
    FixedAutomaticLength,
    /// Recognized but not negotiable; degrades to ignore.
    Unsupported,
}

/// Double feed detection methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DoubleFeedSetting {
    /// Ultrasonic sensing.
    Ultrasonic,
    /// Detection by length.
    ByLength,
    /// Infrared sensing.
    Infrared,
    /// Detection disabled.
    Off,
}

/// Number of sheets to scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SheetCount {
    /// An explicit number of sheets.
    Count(u32),
    /// Scan until the feeder is empty.
    Maximum,
}

/// Resolution requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResolutionSetting {
    /// A literal resolution.
    Dpi(u32),
    /// Nearest supported value to the previous sibling value.
    Closest,
    /// Nearest supported value at or above the previous sibling value.
    ClosestGreaterThan,
    /// Nearest supported value at or below the previous sibling value.
    ClosestLessThan,
    /// Lowest supported value.
    Minimum,
    /// Highest supported value.
    Maximum,
    /// Supported value suited to previews.
    Preview,
}

/// Rotation requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RotationSetting {
    /// Rotate based on content.
    Automatic,
    /// Rotate by a fixed number of degrees.
    Degrees(u16),
}

/// A value parsed for its attribute kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// Automatic deskew switch.
    AutomaticDeskew(bool),
    /// Brightness in -1000..=1000.
    Brightness(i32),
    /// Compression scheme.
    Compression(CompressionSetting),
    /// Contrast in -1000..=1000.
    Contrast(i32),
    /// Cropping mode.
    Cropping(CroppingSetting),
    /// Double feed detection method.
    DoubleFeedDetection(DoubleFeedSetting),
    /// Sheet count.
    NumberOfSheets(SheetCount),
    /// Resolution request.
    Resolution(ResolutionSetting),
    /// Rotation request.
    Rotation(RotationSetting),
    /// Threshold in 0..=255.
    Threshold(u32),
    /// Literal native operation from a vendor attribute.
    Native(NativeCapability),
}

impl Setting {
    /// Parses `text` as a value of `kind`; `None` means unrecognized.
    #[must_use]
    pub fn parse(kind: AttributeKind, text: &str) -> Option<Self> {
        match kind {
            AttributeKind::AutomaticDeskew => parse_switch(text).map(Self::AutomaticDeskew),
            AttributeKind::Brightness => parse_level(text).map(Self::Brightness),
            AttributeKind::Compression => parse_compression(text).map(Self::Compression),
            AttributeKind::Contrast => parse_level(text).map(Self::Contrast),
            AttributeKind::Cropping => parse_cropping(text).map(Self::Cropping),
            AttributeKind::DoubleFeedDetection => {
                parse_double_feed(text).map(Self::DoubleFeedDetection)
            }
            AttributeKind::NumberOfSheets => parse_sheet_count(text).map(Self::NumberOfSheets),
            AttributeKind::Resolution => parse_resolution(text).map(Self::Resolution),
            AttributeKind::Rotation => parse_rotation(text).map(Self::Rotation),
            AttributeKind::Threshold => {
                text.parse::<u32>().ok().filter(|value| *value <= 255).map(Self::Threshold)
            }
            AttributeKind::Vendor => text.parse::<NativeCapability>().ok().map(Self::Native),
            AttributeKind::Unrecognized => None,
        }
    }
}

// ============================================================================
// SECTION: Parsers
// ============================================================================

/// Parses an on/off switch.
fn parse_switch(text: &str) -> Option<bool> {
    match text {
        "on" | "true" => Some(true),
        "off" | "false" => Some(false),
        _ => None,
    }
}

/// Parses a brightness or contrast level.
fn parse_level(text: &str) -> Option<i32> {
    text.parse::<i32>().ok().filter(|level| (-1000 ..= 1000).contains(level))
}

/// Parses a compression keyword.
fn parse_compression(text: &str) -> Option<CompressionSetting> {
    match text {
        "none" => Some(CompressionSetting::None),
        "group4" => Some(CompressionSetting::Group4),
        "jpeg" => Some(CompressionSetting::Jpeg),
        "autoVersion1" => Some(CompressionSetting::AutoVersion1),
        _ => None,
    }
}

/// Parses a cropping keyword.
fn parse_cropping(text: &str) -> Option<CroppingSetting> {
    match text {
        "automatic" => Some(CroppingSetting::Automatic),
        "fixed" => Some(CroppingSetting::Fixed),
        "fixedAutomaticLength" => Some(CroppingSetting::FixedAutomaticLength),
        "automaticMultiple" | "long" | "relative" => Some(CroppingSetting::Unsupported),
        _ => None,
    }
}

/// Parses a double feed detection keyword.
fn parse_double_feed(text: &str) -> Option<DoubleFeedSetting> {
    match text {
        "ultrasonic" => Some(DoubleFeedSetting::Ultrasonic),
        "byLength" => Some(DoubleFeedSetting::ByLength),
        "infrared" => Some(DoubleFeedSetting::Infrared),
        "off" => Some(DoubleFeedSetting::Off),
        _ => None,
    }
}

/// Parses a sheet count.
fn parse_sheet_count(text: &str) -> Option<SheetCount> {
    if text == "maximum" {
        return Some(SheetCount::Maximum);
    }
    text.parse::<u32>().ok().filter(|count| *count > 0).map(SheetCount::Count)
}

/// Parses a resolution request.
fn parse_resolution(text: &str) -> Option<ResolutionSetting> {
    match text {
        "closest" => Some(ResolutionSetting::Closest),
        "closestGreaterThan" => Some(ResolutionSetting::ClosestGreaterThan),
        "closestLessThan" => Some(ResolutionSetting::ClosestLessThan),
        "minimum" => Some(ResolutionSetting::Minimum),
        "maximum" => Some(ResolutionSetting::Maximum),
        "preview" => Some(ResolutionSetting::Preview),
        literal => literal.parse::<u32>().ok().filter(|dpi| *dpi > 0).map(ResolutionSetting::Dpi),
    }
}

/// Parses a rotation request.
fn parse_rotation(text: &str) -> Option<RotationSetting> {
    match text {
        "automatic" => Some(RotationSetting::Automatic),
        "0" => Some(RotationSetting::Degrees(0)),
        "90" => Some(RotationSetting::Degrees(90)),
        "180" => Some(RotationSetting::Degrees(180)),
        "270" => Some(RotationSetting::Degrees(270)),
        _ => None,
    }
}
