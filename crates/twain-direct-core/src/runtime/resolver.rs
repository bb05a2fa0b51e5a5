// crates/twain-direct-core/src/runtime/resolver.rs
// ============================================================================
// Module: TWAIN Direct Value Resolver
// Description: Maps typed settings onto native capability operations.
// Purpose: Turn declarative values into the operations a device understands.
// Dependencies: serde_json, crate::core
// ============================================================================

//! ## Overview
//! Resolution is pure: it reads the device inquiry cache and the context of
//! the value being negotiated, but never contacts the device. A setting
//! either resolves to a [`Candidate`] (one or more operations that must all
//! be accepted) or degrades to [`Resolution::Skip`], which the caller treats
//! as "nothing to do here".
//!
//! The `closest` family compares against the previous sibling value only;
//! the first value of an attribute can never resolve through it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value as JsonValue;

use crate::core::capability::CAP_DOUBLEFEEDDETECTION;
use crate::core::capability::CAP_SHEETCOUNT;
use crate::core::capability::CAP_XFERCOUNT;
use crate::core::capability::ICAP_AUTOMATICBORDERDETECTION;
use crate::core::capability::ICAP_AUTOMATICDESKEW;
use crate::core::capability::ICAP_AUTOMATICLENGTHDETECTION;
use crate::core::capability::ICAP_AUTOMATICROTATE;
use crate::core::capability::ICAP_BRIGHTNESS;
use crate::core::capability::ICAP_COMPRESSION;
use crate::core::capability::ICAP_CONTRAST;
use crate::core::capability::ICAP_ROTATION;
use crate::core::capability::ICAP_THRESHOLD;
use crate::core::capability::ICAP_XRESOLUTION;
use crate::core::capability::ICAP_YRESOLUTION;
use crate::core::capability::ItemType;
use crate::core::capability::NativeCapability;
use crate::core::inquiry::DeviceInquiry;
use crate::core::setting::CompressionSetting;
use crate::core::setting::CroppingSetting;
use crate::core::setting::DoubleFeedSetting;
use crate::core::setting::ResolutionSetting;
use crate::core::setting::RotationSetting;
use crate::core::setting::Setting;
use crate::core::setting::SheetCount;
use crate::core::task::PixelType;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Resolution used as the `preview` target.
const PREVIEW_RESOLUTION: u32 = 75;

/// Device and sibling context for resolving one value.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    /// Inquiry cache for the device in session.
    pub inquiry: &'a DeviceInquiry,
    /// Resolved resolution of the previous sibling value, if any.
    pub previous: Option<u32>,
    /// Pixel type already in effect for the enclosing pixel format.
    pub pixel_type: Option<PixelType>,
}

/// Operations that together implement one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Operations applied in order; all must be accepted.
    pub operations: Vec<NativeCapability>,
    /// Value to report when accepted.
    pub reply_value: JsonValue,
    /// Numeric resolution this value resolved to, for later siblings.
    pub dpi: Option<u32>,
}

impl Candidate {
    /// Creates a candidate that reports the value as written.
    fn new(operations: Vec<NativeCapability>, raw: &JsonValue) -> Self {
        Self {
            operations,
            reply_value: raw.clone(),
            dpi: None,
        }
    }

    /// Replaces the reported value.
    fn reporting(mut self, value: impl Into<JsonValue>) -> Self {
        self.reply_value = value.into();
        self
    }
}

/// Result of resolving one value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Try these operations.
    Apply(Candidate),
    /// Nothing to negotiate; the value degrades to ignore.
    Skip,
}

// ============================================================================
// SECTION: Resolver
// ============================================================================

/// Resolves a parsed setting into native operations.
#[must_use]
pub fn resolve(setting: &Setting, raw: &JsonValue, context: &ResolveContext<'_>) -> Resolution {
    match setting {
        Setting::AutomaticDeskew(enabled) => {
            apply(vec![NativeCapability::boolean(ICAP_AUTOMATICDESKEW, *enabled)], raw)
        }
        Setting::Brightness(level) => {
            apply(vec![NativeCapability::one_value(ICAP_BRIGHTNESS, ItemType::Fix32, level)], raw)
        }
        Setting::Compression(compression) => resolve_compression(*compression, raw, context),
        Setting::Contrast(level) => {
            apply(vec![NativeCapability::one_value(ICAP_CONTRAST, ItemType::Fix32, level)], raw)
        }
        Setting::Cropping(cropping) => resolve_cropping(*cropping, raw),
        Setting::DoubleFeedDetection(method) => resolve_double_feed(*method, raw),
        Setting::NumberOfSheets(count) => resolve_sheet_count(*count, raw, context),
        Setting::Resolution(resolution) => resolve_resolution(*resolution, raw, context),
        Setting::Rotation(rotation) => resolve_rotation(*rotation, raw),
        Setting::Threshold(threshold) => {
            let operation = NativeCapability::one_value(ICAP_THRESHOLD, ItemType::Fix32, threshold);
            apply(vec![operation], raw)
        }
        Setting::Native(operation) => apply(vec![operation.clone()], raw),
    }
}

/// Wraps operations into an applicable candidate.
fn apply(operations: Vec<NativeCapability>, raw: &JsonValue) -> Resolution {
    Resolution::Apply(Candidate::new(operations, raw))
}

/// Resolves a resolution request.
fn resolve_resolution(
    resolution: ResolutionSetting,
    raw: &JsonValue,
    context: &ResolveContext<'_>,
) -> Resolution {
    let inquiry = context.inquiry;
    let dpi = match resolution {
        ResolutionSetting::Dpi(dpi) => Some(dpi),
        ResolutionSetting::Minimum => inquiry.minimum_resolution(),
        ResolutionSetting::Maximum => inquiry.maximum_resolution(),
        ResolutionSetting::Preview => inquiry.closest_resolution(PREVIEW_RESOLUTION),
        ResolutionSetting::Closest => {
            context.previous.and_then(|target| inquiry.closest_resolution(target))
        }
        ResolutionSetting::ClosestGreaterThan => {
            context.previous.and_then(|target| inquiry.closest_resolution_at_least(target))
        }
        ResolutionSetting::ClosestLessThan => {
            context.previous.and_then(|target| inquiry.closest_resolution_at_most(target))
        }
    };
    let Some(dpi) = dpi else {
        tracing::debug!(
            has_previous = context.previous.is_some(),
            "resolution request has no target; ignoring value"
        );
        return Resolution::Skip;
    };
    let mut candidate = Candidate::new(
        vec![
            NativeCapability::one_value(ICAP_XRESOLUTION, ItemType::Fix32, dpi),
            NativeCapability::one_value(ICAP_YRESOLUTION, ItemType::Fix32, dpi),
        ],
        raw,
    );
    if !matches!(resolution, ResolutionSetting::Dpi(_)) {
        candidate = candidate.reporting(dpi);
    }
    candidate.dpi = Some(dpi);
    Resolution::Apply(candidate)
}

/// Resolves a compression request.
fn resolve_compression(
    compression: CompressionSetting,
    raw: &JsonValue,
    context: &ResolveContext<'_>,
) -> Resolution {
    if context.inquiry.is_minimally_capable() {
        let operation = NativeCapability::one_value(ICAP_COMPRESSION, ItemType::UInt16, 0);
        return Resolution::Apply(Candidate::new(vec![operation], raw).reporting("none"));
    }
    let (native, label) = match compression {
        CompressionSetting::None => (0, "none"),
        CompressionSetting::Group4 => (5, "group4"),
        CompressionSetting::Jpeg => (6, "jpeg"),
        CompressionSetting::AutoVersion1 => {
            if context.pixel_type.is_some_and(PixelType::is_bitonal) {
                (5, "group4")
            } else {
                (6, "jpeg")
            }
        }
    };
    let operation = NativeCapability::one_value(ICAP_COMPRESSION, ItemType::UInt16, native);
    let candidate = Candidate::new(vec![operation], raw);
    Resolution::Apply(match compression {
        CompressionSetting::AutoVersion1 => candidate.reporting(label),
        _ => candidate,
    })
}

/// Resolves a cropping request.
fn resolve_cropping(cropping: CroppingSetting, raw: &JsonValue) -> Resolution {
    let (border, length) = match cropping {
        CroppingSetting::Automatic => (true, false),
        CroppingSetting::Fixed => (false, false),
        CroppingSetting::FixedAutomaticLength => (false, true),
        CroppingSetting::Unsupported => return Resolution::Skip,
    };
    apply(
        vec![
            NativeCapability::boolean(ICAP_AUTOMATICBORDERDETECTION, border),
            NativeCapability::boolean(ICAP_AUTOMATICLENGTHDETECTION, length),
        ],
        raw,
    )
}

/// Resolves a double feed detection request.
fn resolve_double_feed(method: DoubleFeedSetting, raw: &JsonValue) -> Resolution {
    let methods: &[u16] = match method {
        DoubleFeedSetting::Ultrasonic => &[0],
        DoubleFeedSetting::ByLength => &[1],
        DoubleFeedSetting::Infrared => &[2],
        DoubleFeedSetting::Off => &[],
    };
    apply(vec![NativeCapability::array(CAP_DOUBLEFEEDDETECTION, ItemType::UInt16, methods)], raw)
}

/// Resolves a sheet count request.
fn resolve_sheet_count(
    count: SheetCount,
    raw: &JsonValue,
    context: &ResolveContext<'_>,
) -> Resolution {
    let inquiry = context.inquiry;
    if inquiry.sheet_count && inquiry.supports_capability(CAP_SHEETCOUNT) {
        let sheets = match count {
            SheetCount::Count(sheets) => sheets,
            SheetCount::Maximum => 0,
        };
        return apply(
            vec![NativeCapability::one_value(CAP_SHEETCOUNT, ItemType::UInt32, sheets)],
            raw,
        );
    }
    let transfers = match count {
        SheetCount::Count(sheets) => {
            let Ok(transfers) = i16::try_from(u64::from(sheets) * 2) else {
                tracing::debug!(sheets, "sheet count exceeds transfer count range; ignoring value");
                return Resolution::Skip;
            };
            transfers
        }
        SheetCount::Maximum => -1,
    };
    apply(vec![NativeCapability::one_value(CAP_XFERCOUNT, ItemType::Int16, transfers)], raw)
}

/// Resolves a rotation request.
fn resolve_rotation(rotation: RotationSetting, raw: &JsonValue) -> Resolution {
    let operation = match rotation {
        RotationSetting::Automatic => NativeCapability::boolean(ICAP_AUTOMATICROTATE, true),
        RotationSetting::Degrees(degrees) => {
            NativeCapability::one_value(ICAP_ROTATION, ItemType::Fix32, degrees)
        }
    };
    apply(vec![operation], raw)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::panic, reason = "Test-only assertions are permitted.")]

    use serde_json::json;

    use super::Candidate;
    use super::ResolveContext;
    use super::Resolution;
    use super::resolve;
    use crate::core::inquiry::DeviceInquiry;
    use crate::core::setting::AttributeKind;
    use crate::core::setting::Setting;
    use crate::core::task::PixelType;

    /// Resolves `text` for `kind` with the given context.
    fn resolve_text(
        kind: AttributeKind,
        text: &str,
        inquiry: &DeviceInquiry,
        previous: Option<u32>,
        pixel_type: Option<PixelType>,
    ) -> Resolution {
        let Some(setting) = Setting::parse(kind, text) else {
            panic!("value should parse: {text}");
        };
        let context = ResolveContext {
            inquiry,
            previous,
            pixel_type,
        };
        resolve(&setting, &json!(text), &context)
    }

    /// Resolves `text` without sibling context and expects a candidate.
    fn candidate(kind: AttributeKind, text: &str, inquiry: &DeviceInquiry) -> Candidate {
        match resolve_text(kind, text, inquiry, None, None) {
            Resolution::Apply(candidate) => candidate,
            Resolution::Skip => panic!("value should resolve: {text}"),
        }
    }

    /// Returns the dpi a `closest`-family request resolves to.
    fn closest(text: &str, inquiry: &DeviceInquiry, previous: Option<u32>) -> Option<u32> {
        match resolve_text(AttributeKind::Resolution, text, inquiry, previous, None) {
            Resolution::Apply(candidate) => candidate.dpi,
            Resolution::Skip => None,
        }
    }

    /// Renders every operation of a candidate.
    fn rendered(candidate: &Candidate) -> Vec<String> {
        candidate.operations.iter().map(ToString::to_string).collect()
    }

    /// Inquiry with a fixed resolution list.
    fn inquiry() -> DeviceInquiry {
        DeviceInquiry {
            resolutions: vec![75, 150, 300, 600],
            ..DeviceInquiry::default()
        }
    }

    /// Tests that `closest` needs a previous sibling value.
    #[test]
    fn test_closest_without_previous_is_skipped() {
        assert_eq!(closest("closest", &inquiry(), None), None);
    }

    /// Tests the closest family against the previous value.
    #[test]
    fn test_closest_family_uses_previous_value() {
        let inquiry = inquiry();
        assert_eq!(closest("closest", &inquiry, Some(200)), Some(150));
        assert_eq!(closest("closest", &inquiry, Some(225)), Some(150));
        assert_eq!(closest("closestGreaterThan", &inquiry, Some(200)), Some(300));
        assert_eq!(closest("closestLessThan", &inquiry, Some(200)), Some(150));
        assert_eq!(closest("closestGreaterThan", &inquiry, Some(1200)), None);
    }

    /// Tests literal and symbolic resolution operations and reply values.
    #[test]
    fn test_resolution_operations() {
        let inquiry = inquiry();
        let literal = candidate(AttributeKind::Resolution, "300", &inquiry);
        assert_eq!(rendered(&literal), vec![
            "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
            "ICAP_YRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
        ]);
        assert_eq!(literal.reply_value, json!("300"));
        let maximum = candidate(AttributeKind::Resolution, "maximum", &inquiry);
        assert_eq!(maximum.reply_value, json!(600));
        let preview = candidate(AttributeKind::Resolution, "preview", &inquiry);
        assert_eq!(preview.dpi, Some(75));
    }

    /// Tests autoVersion1 compression against the resolved pixel type.
    #[test]
    fn test_auto_compression_follows_pixel_type() {
        let inquiry = inquiry();
        let kind = AttributeKind::Compression;
        let Resolution::Apply(bitonal) =
            resolve_text(kind, "autoVersion1", &inquiry, None, Some(PixelType::Bw1))
        else {
            panic!("bitonal compression should resolve");
        };
        assert_eq!(rendered(&bitonal), vec![
            "ICAP_COMPRESSION,TWON_ONEVALUE,TWTY_UINT16,5".to_string()
        ]);
        assert_eq!(bitonal.reply_value, json!("group4"));
        let Resolution::Apply(color) =
            resolve_text(kind, "autoVersion1", &inquiry, None, Some(PixelType::Rgb24))
        else {
            panic!("color compression should resolve");
        };
        assert_eq!(color.reply_value, json!("jpeg"));
    }

    /// Tests that minimally-capable devices always get uncompressed output.
    #[test]
    fn test_minimal_device_forces_no_compression() {
        let inquiry = DeviceInquiry {
            compression: false,
            ..DeviceInquiry::default()
        };
        let forced = candidate(AttributeKind::Compression, "jpeg", &inquiry);
        assert_eq!(rendered(&forced), vec![
            "ICAP_COMPRESSION,TWON_ONEVALUE,TWTY_UINT16,0".to_string()
        ]);
    }

    /// Tests sheet count and transfer count fallbacks.
    #[test]
    fn test_number_of_sheets_fallback() {
        let with_sheets = DeviceInquiry {
            sheet_count: true,
            ..DeviceInquiry::default()
        };
        let sheets = candidate(AttributeKind::NumberOfSheets, "maximum", &with_sheets);
        assert_eq!(rendered(&sheets), vec![
            "CAP_SHEETCOUNT,TWON_ONEVALUE,TWTY_UINT32,0".to_string()
        ]);
        let without = DeviceInquiry::default();
        let transfers = candidate(AttributeKind::NumberOfSheets, "3", &without);
        assert_eq!(rendered(&transfers), vec![
            "CAP_XFERCOUNT,TWON_ONEVALUE,TWTY_INT16,6".to_string()
        ]);
        let unbounded = candidate(AttributeKind::NumberOfSheets, "maximum", &without);
        assert_eq!(rendered(&unbounded), vec![
            "CAP_XFERCOUNT,TWON_ONEVALUE,TWTY_INT16,-1".to_string()
        ]);
    }

    /// Tests cropping pairs and unsupported cropping modes.
    #[test]
    fn test_cropping_pairs() {
        let inquiry = inquiry();
        let length = candidate(AttributeKind::Cropping, "fixedAutomaticLength", &inquiry);
        assert_eq!(rendered(&length), vec![
            "ICAP_AUTOMATICBORDERDETECTION,TWON_ONEVALUE,TWTY_BOOL,0".to_string(),
            "ICAP_AUTOMATICLENGTHDETECTION,TWON_ONEVALUE,TWTY_BOOL,1".to_string(),
        ]);
        let relative = resolve_text(AttributeKind::Cropping, "relative", &inquiry, None, None);
        assert_eq!(relative, Resolution::Skip);
    }

    /// Tests double feed detection arrays.
    #[test]
    fn test_double_feed_arrays() {
        let inquiry = inquiry();
        let off = candidate(AttributeKind::DoubleFeedDetection, "off", &inquiry);
        assert_eq!(rendered(&off), vec![
            "CAP_DOUBLEFEEDDETECTION,TWON_ARRAY,TWTY_UINT16,0".to_string()
        ]);
        let infrared = candidate(AttributeKind::DoubleFeedDetection, "infrared", &inquiry);
        assert_eq!(rendered(&infrared), vec![
            "CAP_DOUBLEFEEDDETECTION,TWON_ARRAY,TWTY_UINT16,1,2".to_string()
        ]);
    }
}
