// crates/twain-direct-core/src/runtime/simulated.rs
// ============================================================================
// Module: TWAIN Direct Simulated Device
// Description: In-memory device channel, profile catalog, and certificate store.
// Purpose: Provide deterministic collaborators for tests, the CLI, and demos.
// Dependencies: serde, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! [`SimulatedDevice`] keeps a table of capabilities, each with an allowed
//! value list, a current value, and a power-on default. A set request is
//! accepted when every requested value is allowed; otherwise the device
//! reports the request as refused and keeps its current value.
//!
//! Handles are cheap clones over shared state, so a test can hand one clone
//! to the engine and inspect the operation log through another.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;

use crate::core::CertificateInfo;
use crate::core::ItemType;
use crate::core::NativeCapability;
use crate::core::ProfileEntry;
use crate::core::capability::CAP_AUTOMATICSENSEMEDIUM;
use crate::core::capability::CAP_CAMERASIDE;
use crate::core::capability::CAP_DOUBLEFEEDDETECTION;
use crate::core::capability::CAP_DUPLEXENABLED;
use crate::core::capability::CAP_FEEDERENABLED;
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
use crate::interfaces::CertificateError;
use crate::interfaces::CertificateStore;
use crate::interfaces::DeviceChannel;
use crate::interfaces::DeviceError;
use crate::interfaces::ProfileCatalog;
use crate::interfaces::SetReply;

// ============================================================================
// SECTION: Capabilities
// ============================================================================

/// One capability of a simulated device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedCapability {
    /// Native capability name.
    pub name: String,
    /// Native item type.
    pub item_type: ItemType,
    /// Allowed values; empty accepts anything.
    #[serde(default)]
    pub allowed: Vec<String>,
    /// Current values.
    #[serde(default)]
    pub current: Vec<String>,
    /// Power-on default values.
    #[serde(default)]
    pub default: Vec<String>,
}

impl SimulatedCapability {
    /// Creates a capability whose current value is its default.
    #[must_use]
    pub fn new(name: &str, item_type: ItemType, allowed: &[&str], default: &[&str]) -> Self {
        let default: Vec<String> = default.iter().map(ToString::to_string).collect();
        Self {
            name: name.to_string(),
            item_type,
            allowed: allowed.iter().map(ToString::to_string).collect(),
            current: default.clone(),
            default,
        }
    }

    /// Returns true when every requested value is allowed.
    fn allows(&self, values: &[String]) -> bool {
        self.allowed.is_empty()
            || values.iter().all(|value| self.allowed.iter().any(|allowed| allowed == value.trim()))
    }

    /// Renders a value list as a native operation.
    fn render(&self, values: &[String]) -> NativeCapability {
        match values {
            [single] => NativeCapability::one_value(&self.name, self.item_type, single),
            many => NativeCapability::array(&self.name, self.item_type, many),
        }
    }
}

/// Capability table of a typical feeder scanner with a flatbed.
#[must_use]
pub fn standard_capabilities(resolutions: &[u32]) -> Vec<SimulatedCapability> {
    let resolution_values: Vec<String> = resolutions.iter().map(ToString::to_string).collect();
    let resolution_refs: Vec<&str> = resolution_values.iter().map(String::as_str).collect();
    let default_resolution = resolution_refs.first().copied().unwrap_or("200");
    vec![
        SimulatedCapability::new(CAP_AUTOMATICSENSEMEDIUM, ItemType::UInt16, &["0", "1"], &["0"]),
        SimulatedCapability::new(CAP_CAMERASIDE, ItemType::UInt16, &["0", "1", "2"], &["0"]),
        SimulatedCapability::new(CAP_DOUBLEFEEDDETECTION, ItemType::UInt16, &["0", "1", "2"], &[]),
        SimulatedCapability::new(CAP_DUPLEXENABLED, ItemType::Bool, &["0", "1"], &["0"]),
        SimulatedCapability::new(CAP_FEEDERENABLED, ItemType::Bool, &["0", "1"], &["1"]),
        SimulatedCapability::new(CAP_XFERCOUNT, ItemType::Int16, &[], &["-1"]),
        SimulatedCapability::new(
            ICAP_AUTOMATICBORDERDETECTION,
            ItemType::Bool,
            &["0", "1"],
            &["0"],
        ),
        SimulatedCapability::new(ICAP_AUTOMATICDESKEW, ItemType::Bool, &["0", "1"], &["0"]),
        SimulatedCapability::new(
            ICAP_AUTOMATICLENGTHDETECTION,
            ItemType::Bool,
            &["0", "1"],
            &["0"],
        ),
        SimulatedCapability::new(ICAP_AUTOMATICROTATE, ItemType::Bool, &["0", "1"], &["0"]),
        SimulatedCapability::new(ICAP_BRIGHTNESS, ItemType::Fix32, &[], &["0"]),
        SimulatedCapability::new(ICAP_COMPRESSION, ItemType::UInt16, &["0", "5", "6"], &["0"]),
        SimulatedCapability::new(ICAP_CONTRAST, ItemType::Fix32, &[], &["0"]),
        SimulatedCapability::new(ICAP_PIXELTYPE, ItemType::UInt16, &["0", "1", "2"], &["0"]),
        SimulatedCapability::new(
            ICAP_ROTATION,
            ItemType::Fix32,
            &["0", "90", "180", "270"],
            &["0"],
        ),
        SimulatedCapability::new(ICAP_THRESHOLD, ItemType::Fix32, &[], &["128"]),
        SimulatedCapability::new(
            ICAP_XRESOLUTION,
            ItemType::Fix32,
            &resolution_refs,
            &[default_resolution],
        ),
        SimulatedCapability::new(
            ICAP_YRESOLUTION,
            ItemType::Fix32,
            &resolution_refs,
            &[default_resolution],
        ),
    ]
}

// ============================================================================
// SECTION: Simulated Device
// ============================================================================

/// Operation recorded by the simulated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceOperation {
    /// Allowed values were queried.
    Get(String),
    /// The current value was queried.
    GetCurrent(String),
    /// A set was requested, in native tuple form.
    Set(String),
    /// Every capability was reset.
    Reset,
}

/// Shared state behind every handle of one simulated device.
#[derive(Debug)]
struct DeviceState {
    /// Capabilities keyed by name.
    capabilities: BTreeMap<String, SimulatedCapability>,
    /// Operations in the order they arrived.
    log: Vec<DeviceOperation>,
    /// Reset requests succeed.
    reset_supported: bool,
}

/// In-memory device channel.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    /// Shared device state protected by a mutex.
    state: Arc<Mutex<DeviceState>>,
}

impl SimulatedDevice {
    /// Creates a device with the given capabilities.
    #[must_use]
    pub fn new(capabilities: impl IntoIterator<Item = SimulatedCapability>) -> Self {
        Self::with_reset(capabilities, true)
    }

    /// Creates a device whose reset support is explicit.
    #[must_use]
    pub fn with_reset(
        capabilities: impl IntoIterator<Item = SimulatedCapability>,
        reset_supported: bool,
    ) -> Self {
        let capabilities = capabilities
            .into_iter()
            .map(|capability| (capability.name.clone(), capability))
            .collect();
        Self {
            state: Arc::new(Mutex::new(DeviceState {
                capabilities,
                log: Vec::new(),
                reset_supported,
            })),
        }
    }

    /// Creates a device with [`standard_capabilities`].
    #[must_use]
    pub fn standard(resolutions: &[u32]) -> Self {
        Self::new(standard_capabilities(resolutions))
    }

    /// Locks the shared state.
    fn lock(&self) -> Result<MutexGuard<'_, DeviceState>, DeviceError> {
        self.state
            .lock()
            .map_err(|_| DeviceError::Channel("simulated device mutex poisoned".to_string()))
    }

    /// Returns the operation log.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Channel`] when the state lock is poisoned.
    pub fn operations(&self) -> Result<Vec<DeviceOperation>, DeviceError> {
        Ok(self.lock()?.log.clone())
    }

    /// Returns the native tuples of every set request, in order.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Channel`] when the state lock is poisoned.
    pub fn set_requests(&self) -> Result<Vec<String>, DeviceError> {
        Ok(self
            .lock()?
            .log
            .iter()
            .filter_map(|operation| match operation {
                DeviceOperation::Set(native) => Some(native.clone()),
                DeviceOperation::Get(_)
                | DeviceOperation::GetCurrent(_)
                | DeviceOperation::Reset => None,
            })
            .collect())
    }

    /// Clears the operation log.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Channel`] when the state lock is poisoned.
    pub fn clear_log(&self) -> Result<(), DeviceError> {
        self.lock()?.log.clear();
        Ok(())
    }

    /// Returns the current values of a capability.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::Channel`] when the state lock is poisoned.
    pub fn current(&self, name: &str) -> Result<Option<Vec<String>>, DeviceError> {
        Ok(self.lock()?.capabilities.get(name).map(|capability| capability.current.clone()))
    }
}

impl DeviceChannel for SimulatedDevice {
    fn get(&mut self, name: &str) -> Result<NativeCapability, DeviceError> {
        let mut state = self.lock()?;
        state.log.push(DeviceOperation::Get(name.to_string()));
        let capability = state
            .capabilities
            .get(name)
            .ok_or_else(|| DeviceError::NotSupported(name.to_string()))?;
        let values =
            if capability.allowed.is_empty() { &capability.current } else { &capability.allowed };
        Ok(NativeCapability::array(&capability.name, capability.item_type, values))
    }

    fn get_current(&mut self, name: &str) -> Result<NativeCapability, DeviceError> {
        let mut state = self.lock()?;
        state.log.push(DeviceOperation::GetCurrent(name.to_string()));
        let capability = state
            .capabilities
            .get(name)
            .ok_or_else(|| DeviceError::NotSupported(name.to_string()))?;
        Ok(capability.render(&capability.current))
    }

    fn set(&mut self, operation: &NativeCapability) -> Result<SetReply, DeviceError> {
        let mut state = self.lock()?;
        state.log.push(DeviceOperation::Set(operation.to_string()));
        let capability = state
            .capabilities
            .get_mut(operation.name())
            .ok_or_else(|| DeviceError::NotSupported(operation.name().to_string()))?;
        if !capability.allows(operation.values()) {
            return Ok(SetReply {
                accepted: false,
                echoed: capability.render(&capability.current),
            });
        }
        capability.current =
            operation.values().iter().map(|value| value.trim().to_string()).collect();
        Ok(SetReply {
            accepted: true,
            echoed: capability.render(&capability.current),
        })
    }

    fn reset_all(&mut self) -> Result<(), DeviceError> {
        let mut state = self.lock()?;
        state.log.push(DeviceOperation::Reset);
        if !state.reset_supported {
            return Err(DeviceError::SequenceError("reset not supported".to_string()));
        }
        for capability in state.capabilities.values_mut() {
            capability.current.clone_from(&capability.default);
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Static Collaborators
// ============================================================================

/// Fixed encryption profile catalog.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticProfileCatalog {
    /// Profiles in catalog order.
    profiles: Vec<ProfileEntry>,
}

impl StaticProfileCatalog {
    /// Creates a catalog from profiles in catalog order.
    #[must_use]
    pub const fn new(profiles: Vec<ProfileEntry>) -> Self {
        Self {
            profiles,
        }
    }
}

impl ProfileCatalog for StaticProfileCatalog {
    fn lookup(&self, name: &str) -> Option<ProfileEntry> {
        self.profiles.iter().find(|profile| profile.name == name).cloned()
    }

    fn names(&self) -> Vec<String> {
        self.profiles.iter().map(|profile| profile.name.clone()).collect()
    }
}

/// Certificate store holding at most one fixed certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticCertificateStore {
    /// The active certificate.
    certificate: Option<CertificateInfo>,
}

impl StaticCertificateStore {
    /// Creates a store with the given certificate.
    #[must_use]
    pub const fn new(certificate: Option<CertificateInfo>) -> Self {
        Self {
            certificate,
        }
    }
}

impl CertificateStore for StaticCertificateStore {
    fn active_certificate(&self) -> Result<Option<CertificateInfo>, CertificateError> {
        Ok(self.certificate.clone())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
