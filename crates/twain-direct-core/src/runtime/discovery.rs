// crates/twain-direct-core/src/runtime/discovery.rs
// ============================================================================
// Module: TWAIN Direct Inquiry Discovery
// Description: Populates a device inquiry cache by probing the device.
// Purpose: Build the per-session support facts the resolver relies on.
// Dependencies: tracing, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! Discovery asks the device for the allowed values of every capability the
//! engine knows how to negotiate. A capability that answers is recorded as
//! supported; the answers also fill the support flags and the resolution
//! list. Discovery runs once per session, before any task is negotiated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::capability::CAP_AUTOMATICSENSEMEDIUM;
use crate::core::capability::CAP_CAMERASIDE;
use crate::core::capability::CAP_DOUBLEFEEDDETECTION;
use crate::core::capability::CAP_DUPLEXENABLED;
use crate::core::capability::CAP_FEEDERENABLED;
use crate::core::capability::CAP_SHEETCOUNT;
use crate::core::capability::CAP_XFERCOUNT;
use crate::core::capability::ICAP_AUTOMATICBORDERDETECTION;
use crate::core::capability::ICAP_AUTOMATICDESKEW;
use crate::core::capability::ICAP_AUTOMATICLENGTHDETECTION;
use crate::core::capability::ICAP_AUTOMATICROTATE;
use crate::core::capability::ICAP_BRIGHTNESS;
use crate::core::capability::ICAP_COMPRESSION;
use crate::core::capability::ICAP_CONTRAST;
use crate::core::capability::ICAP_PIXELTYPE;
use crate::core::capability::ICAP_ROTATION;
use crate::core::capability::ICAP_THRESHOLD;
use crate::core::capability::ICAP_XRESOLUTION;
use crate::core::capability::ICAP_YRESOLUTION;
use crate::core::capability::NativeCapability;
use crate::core::inquiry::DeviceInquiry;
use crate::interfaces::DeviceChannel;
use crate::interfaces::DeviceError;

// ============================================================================
// SECTION: Discovery
// ============================================================================

/// Capabilities probed during discovery.
const PROBED_CAPABILITIES: &[&str] = &[
    CAP_AUTOMATICSENSEMEDIUM,
    CAP_CAMERASIDE,
    CAP_DOUBLEFEEDDETECTION,
    CAP_DUPLEXENABLED,
    CAP_FEEDERENABLED,
    CAP_SHEETCOUNT,
    CAP_XFERCOUNT,
    ICAP_AUTOMATICBORDERDETECTION,
    ICAP_AUTOMATICDESKEW,
    ICAP_AUTOMATICLENGTHDETECTION,
    ICAP_AUTOMATICROTATE,
    ICAP_BRIGHTNESS,
    ICAP_COMPRESSION,
    ICAP_CONTRAST,
    ICAP_PIXELTYPE,
    ICAP_ROTATION,
    ICAP_THRESHOLD,
    ICAP_XRESOLUTION,
    ICAP_YRESOLUTION,
];

impl DeviceInquiry {
    /// Probes the device and builds a normalized inquiry cache.
    ///
    /// Capabilities that fail to answer are recorded as unsupported; a
    /// channel failure is logged and treated the same way.
    pub fn discover<D: DeviceChannel>(device: &mut D) -> Self {
        let mut answered: Vec<NativeCapability> = Vec::new();
        for name in PROBED_CAPABILITIES.iter().copied() {
            match device.get(name) {
                Ok(capability) => answered.push(capability),
                Err(DeviceError::Channel(message)) => {
                    tracing::warn!(capability = name, error = %message, "inquiry probe failed");
                }
                Err(err) => tracing::debug!(capability = name, error = %err, "capability absent"),
            }
        }
        let find = |name: &str| answered.iter().find(|capability| capability.name() == name);
        let allows_on =
            |name: &str| find(name).is_some_and(|capability| has_value(capability, "1"));
        let inquiry = Self {
            automatic_sense_medium: allows_on(CAP_AUTOMATICSENSEMEDIUM),
            camera_side: find(CAP_CAMERASIDE).is_some(),
            sheet_count: find(CAP_SHEETCOUNT).is_some(),
            feeder: allows_on(CAP_FEEDERENABLED),
            duplex: allows_on(CAP_DUPLEXENABLED),
            compression: find(ICAP_COMPRESSION).is_some_and(|capability| {
                capability.values().iter().any(|value| value.trim() != "0")
            }),
            resolutions: find(ICAP_XRESOLUTION).map(resolution_list).unwrap_or_default(),
            physical_size: None,
            supported_capabilities: answered
                .iter()
                .map(|capability| capability.name().to_string())
                .collect(),
        }
        .normalized();
        tracing::info!(
            supported = inquiry.supported_capabilities.len(),
            resolutions = inquiry.resolutions.len(),
            minimal = inquiry.is_minimally_capable(),
            "device inquiry discovered"
        );
        inquiry
    }
}

/// Returns true when `capability` lists `value`.
fn has_value(capability: &NativeCapability, value: &str) -> bool {
    capability.values().iter().any(|candidate| candidate.trim() == value)
}

/// Parses the whole-number part of every resolution value.
fn resolution_list(capability: &NativeCapability) -> Vec<u32> {
    capability
        .values()
        .iter()
        .filter_map(|value| value.trim().split('.').next().and_then(|whole| whole.parse().ok()))
        .filter(|dpi| *dpi > 0)
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use crate::core::ItemType;
    use crate::core::capability::CAP_DUPLEXENABLED;
    use crate::core::capability::CAP_FEEDERENABLED;
    use crate::core::capability::ICAP_COMPRESSION;
    use crate::core::inquiry::DeviceInquiry;
    use crate::runtime::simulated::SimulatedCapability;
    use crate::runtime::simulated::SimulatedDevice;
    use crate::runtime::simulated::standard_capabilities;

    /// Tests discovery against the standard simulated device.
    #[test]
    fn test_discover_standard_device() {
        let mut device = SimulatedDevice::standard(&[600, 100, 300]);
        let inquiry = DeviceInquiry::discover(&mut device);
        assert_eq!(inquiry.resolutions, vec![100, 300, 600]);
        assert!(inquiry.feeder);
        assert!(inquiry.duplex);
        assert!(inquiry.automatic_sense_medium);
        assert!(inquiry.camera_side);
        assert!(!inquiry.sheet_count);
        assert!(inquiry.compression);
        assert!(inquiry.supports_capability(CAP_FEEDERENABLED));
        assert!(!inquiry.supports_capability("CAP_SHEETCOUNT"));
    }

    /// Tests that a flatbed-only device without compression is minimal.
    #[test]
    fn test_discover_minimal_flatbed() {
        let capabilities = standard_capabilities(&[150])
            .into_iter()
            .filter(|capability| {
                capability.name != CAP_FEEDERENABLED && capability.name != CAP_DUPLEXENABLED
            })
            .map(|capability| {
                if capability.name == ICAP_COMPRESSION {
                    SimulatedCapability::new(ICAP_COMPRESSION, ItemType::UInt16, &["0"], &["0"])
                } else {
                    capability
                }
            });
        let mut device = SimulatedDevice::new(capabilities);
        let inquiry = DeviceInquiry::discover(&mut device);
        assert!(!inquiry.feeder);
        assert!(!inquiry.duplex);
        assert!(inquiry.is_minimally_capable());
    }
}
