// crates/twain-direct-core/src/lib.rs
// ============================================================================
// Module: TWAIN Direct Core Library
// Description: Public API surface for the TWAIN Direct task engine.
// Purpose: Expose core types, collaborator interfaces, and runtime helpers.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! TWAIN Direct core negotiates declarative scanning tasks against a device.
//! A task names the settings a client wants, with fallbacks; the engine
//! walks them in order, applies what the device accepts, and replies with
//! exactly the subset that took effect. The engine reaches devices, profile
//! catalogs, and certificate stores only through explicit interfaces.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::CertificateError;
pub use interfaces::CertificateStore;
pub use interfaces::DeviceChannel;
pub use interfaces::DeviceError;
pub use interfaces::ProfileCatalog;
pub use interfaces::SetReply;
pub use runtime::CancellationFlag;
pub use runtime::DeviceOperation;
pub use runtime::Evaluation;
pub use runtime::NodeStatusEntry;
pub use runtime::ScanSourceReport;
pub use runtime::SessionState;
pub use runtime::SimulatedCapability;
pub use runtime::SimulatedDevice;
pub use runtime::StaticCertificateStore;
pub use runtime::StaticProfileCatalog;
pub use runtime::TaskDocument;
pub use runtime::TaskEngine;
pub use runtime::TaskEngineConfig;
pub use runtime::TaskOutcome;
pub use runtime::node_statuses;
pub use runtime::standard_capabilities;
