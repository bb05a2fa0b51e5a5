// crates/twain-direct-core/src/core/inquiry.rs
// ============================================================================
// Module: TWAIN Direct Device Inquiry
// Description: Cached per-device capability support facts.
// Purpose: Feed source derivation and value resolution without device contact.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The inquiry cache is populated once per device session (from config or by
//! probing the device) and consulted read-only by every negotiation. It
//! answers questions such as "does the device sense the paper source
//! automatically?" and "which resolutions does it support?".

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Physical Size
// ============================================================================

/// Physical scan area reported by the device.
///
/// # Invariants
/// - Dimensions are in thousandths of an inch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalSize {
    /// Maximum scan width.
    pub width: u32,
    /// Maximum scan height.
    pub height: u32,
}

// ============================================================================
// SECTION: Device Inquiry
// ============================================================================

/// Capability support facts for the device in session.
///
/// # Invariants
/// - `resolutions` is sorted ascending without duplicates once normalized.
/// - An empty `supported_capabilities` list means "unknown", not "none".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceInquiry {
    /// Device can sense the paper source automatically.
    pub automatic_sense_medium: bool,
    /// Device exposes per-camera-side settings.
    pub camera_side: bool,
    /// Device supports a native sheet count.
    pub sheet_count: bool,
    /// Device has an automatic document feeder.
    pub feeder: bool,
    /// Device can scan both sides.
    pub duplex: bool,
    /// Device supports compression; false marks the minimally-capable class.
    pub compression: bool,
    /// Supported resolutions in dots per inch.
    pub resolutions: Vec<u32>,
    /// Physical scan area, when known. Carried for collaborators; the
    /// negotiation itself never reads it.
    pub physical_size: Option<PhysicalSize>,
    /// Native capability names the device reports as supported.
    pub supported_capabilities: Vec<String>,
}

impl Default for DeviceInquiry {
    fn default() -> Self {
        Self {
            automatic_sense_medium: false,
            camera_side: false,
            sheet_count: false,
            feeder: true,
            duplex: true,
            compression: true,
            resolutions: Vec::new(),
            physical_size: None,
            supported_capabilities: Vec::new(),
        }
    }
}

impl DeviceInquiry {
    /// Sorts and deduplicates the resolution list.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.resolutions.sort_unstable();
        self.resolutions.dedup();
        self
    }

    /// Returns true when the device belongs to the minimally-capable class.
    #[must_use]
    pub const fn is_minimally_capable(&self) -> bool {
        !self.compression
    }

    /// Returns true when the named capability may be negotiated.
    ///
    /// An empty support list is treated as "everything may be tried".
    #[must_use]
    pub fn supports_capability(&self, name: &str) -> bool {
        self.supported_capabilities.is_empty() || self.first_supported(&[name]).is_some()
    }

    /// Returns the first candidate capability name the device supports.
    ///
    /// Candidates are checked in order against the whole support list.
    #[must_use]
    pub fn first_supported<'a>(&self, candidates: &[&'a str]) -> Option<&'a str> {
        candidates.iter().copied().find(|candidate| {
            self.supported_capabilities
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(candidate))
        })
    }

    /// Returns the lowest supported resolution.
    #[must_use]
    pub fn minimum_resolution(&self) -> Option<u32> {
        self.resolutions.iter().copied().min()
    }

    /// Returns the highest supported resolution.
    #[must_use]
    pub fn maximum_resolution(&self) -> Option<u32> {
        self.resolutions.iter().copied().max()
    }

    /// Returns the supported resolution nearest to `target` (ties pick the lower).
    #[must_use]
    pub fn closest_resolution(&self, target: u32) -> Option<u32> {
        self.resolutions
            .iter()
            .copied()
            .min_by_key(|candidate| (candidate.abs_diff(target), *candidate))
    }

    /// Returns the smallest supported resolution at or above `target`.
    #[must_use]
    pub fn closest_resolution_at_least(&self, target: u32) -> Option<u32> {
        self.resolutions.iter().copied().filter(|candidate| *candidate >= target).min()
    }

    /// Returns the largest supported resolution at or below `target`.
    #[must_use]
    pub fn closest_resolution_at_most(&self, target: u32) -> Option<u32> {
        self.resolutions.iter().copied().filter(|candidate| *candidate <= target).max()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::DeviceInquiry;

    /// Builds an inquiry with the given support list.
    fn inquiry_with(supported: &[&str]) -> DeviceInquiry {
        DeviceInquiry {
            supported_capabilities: supported.iter().map(ToString::to_string).collect(),
            ..DeviceInquiry::default()
        }
    }

    /// Tests that the support scan matches entries at different positions in
    /// the candidate and support lists.
    #[test]
    fn test_first_supported_scans_with_inner_index() {
        let inquiry = inquiry_with(&["ICAP_PIXELTYPE", "CAP_XFERCOUNT", "CAP_SHEETCOUNT"]);
        // The match sits at candidate index 1 and support index 2; a scan that
        // reused the candidate index against the support list would miss it.
        assert_eq!(
            inquiry.first_supported(&["CAP_DUPLEXENABLED", "CAP_SHEETCOUNT"]),
            Some("CAP_SHEETCOUNT")
        );
        assert_eq!(inquiry.first_supported(&["ICAP_XRESOLUTION"]), None);
    }

    /// Tests that an empty support list does not block negotiation.
    #[test]
    fn test_empty_support_list_allows_everything() {
        let inquiry = inquiry_with(&[]);
        assert!(inquiry.supports_capability("ICAP_ROTATION"));
        let restricted = inquiry_with(&["icap_rotation"]);
        assert!(restricted.supports_capability("ICAP_ROTATION"));
        assert!(!restricted.supports_capability("ICAP_CONTRAST"));
    }

    /// Tests closest-resolution selection including ties.
    #[test]
    fn test_closest_resolution_prefers_lower_on_ties() {
        let inquiry = DeviceInquiry {
            resolutions: vec![75, 150, 300, 600],
            ..DeviceInquiry::default()
        };
        assert_eq!(inquiry.closest_resolution(225), Some(150));
        assert_eq!(inquiry.closest_resolution(250), Some(300));
        assert_eq!(inquiry.closest_resolution_at_least(301), Some(600));
        assert_eq!(inquiry.closest_resolution_at_most(299), Some(150));
        assert_eq!(inquiry.closest_resolution_at_least(601), None);
    }
}
