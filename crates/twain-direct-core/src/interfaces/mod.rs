// crates/twain-direct-core/src/interfaces/mod.rs
// ============================================================================
// Module: TWAIN Direct Interfaces
// Description: Collaborator traits for devices, profile catalogs, and certificates.
// Purpose: Keep the engine independent of any transport or key store.
// Dependencies: crate::core, thiserror
// ============================================================================

//! ## Overview
//! The engine reaches the outside world only through these traits. The
//! device channel is passed explicitly into every negotiation call; nothing
//! in the engine holds a global handle to a device.
//!
//! Implementations must be deterministic for a given device state so that
//! negotiating the same task twice yields the same reply.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::core::CertificateInfo;
use crate::core::NativeCapability;
use crate::core::ProfileEntry;

// ============================================================================
// SECTION: Device Channel
// ============================================================================

/// Reply to a capability set request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetReply {
    /// Device accepted the request (possibly coercing the value).
    pub accepted: bool,
    /// Value the device reports as current after the request.
    pub echoed: NativeCapability,
}

/// Device capability channel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// The device does not support the capability.
    #[error("capability not supported: {0}")]
    NotSupported(String),
    /// The capability exists but cannot be changed in the current state.
    #[error("capability sequence error: {0}")]
    SequenceError(String),
    /// The device refused the requested value.
    #[error("capability value rejected: {0}")]
    RejectedValue(String),
    /// The channel itself failed.
    #[error("device channel failure: {0}")]
    Channel(String),
}

impl DeviceError {
    /// Returns true when the failure means "this capability is absent".
    #[must_use]
    pub const fn is_not_supported(&self) -> bool {
        matches!(self, Self::NotSupported(_))
    }
}

/// Stateful capability channel to one device.
///
/// Calls are strictly sequential; the engine never issues a request while
/// another is outstanding.
pub trait DeviceChannel {
    /// Returns the allowed values of a capability.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the capability cannot be queried.
    fn get(&mut self, name: &str) -> Result<NativeCapability, DeviceError>;

    /// Returns the current value of a capability.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the capability cannot be queried.
    fn get_current(&mut self, name: &str) -> Result<NativeCapability, DeviceError>;

    /// Applies a native operation.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the operation is refused.
    fn set(&mut self, operation: &NativeCapability) -> Result<SetReply, DeviceError>;

    /// Restores every capability to its power-on default.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the device cannot be reset.
    fn reset_all(&mut self) -> Result<(), DeviceError>;
}

// ============================================================================
// SECTION: Profile Catalog
// ============================================================================

/// Catalog of encryption profiles available on the device.
pub trait ProfileCatalog {
    /// Looks up a profile by name.
    fn lookup(&self, name: &str) -> Option<ProfileEntry>;

    /// Returns all profile names in catalog order.
    fn names(&self) -> Vec<String>;
}

// ============================================================================
// SECTION: Certificate Store
// ============================================================================

/// Certificate store errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CertificateError {
    /// The store could not be read.
    #[error("certificate store failure: {0}")]
    Store(String),
}

/// Source of the device's active certificate metadata.
pub trait CertificateStore {
    /// Returns the active certificate, if one is installed.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError`] when the store cannot be read.
    fn active_certificate(&self) -> Result<Option<CertificateInfo>, CertificateError>;
}
