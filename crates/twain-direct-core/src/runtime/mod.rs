// crates/twain-direct-core/src/runtime/mod.rs
// ============================================================================
// Module: TWAIN Direct Runtime
// Description: Task parsing, classification, negotiation, and reply synthesis.
// Purpose: Turn task text into device operations and a reply document.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! Runtime modules implement the two-phase negotiation driver. The document
//! is parsed and validated, the hierarchy built, the Process phase classifies
//! every node without device contact, and the Run phase negotiates what is
//! left. All entry points go through [`TaskEngine`].

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod builder;
pub mod discovery;
pub mod document;
pub mod engine;
pub mod negotiate;
pub mod process;
pub mod resolver;
pub mod simulated;
pub mod synthesize;
pub mod topology;
pub mod value_set;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use builder::TaskBuilder;
pub use document::TaskDocument;
pub use engine::CancellationFlag;
pub use engine::Evaluation;
pub use engine::SessionState;
pub use engine::TaskEngine;
pub use engine::TaskEngineConfig;
pub use engine::TaskOutcome;
pub use negotiate::ScanSourceReport;
pub use resolver::Candidate;
pub use resolver::Resolution;
pub use resolver::ResolveContext;
pub use simulated::DeviceOperation;
pub use simulated::SimulatedCapability;
pub use simulated::SimulatedDevice;
pub use simulated::StaticCertificateStore;
pub use simulated::StaticProfileCatalog;
pub use simulated::standard_capabilities;
pub use synthesize::NodeStatusEntry;
pub use synthesize::node_statuses;
pub use topology::NodeKind;
pub use value_set::CapabilityValueSet;
