// crates/twain-direct-config/src/lib.rs
// ============================================================================
// Module: TWAIN Direct Config Library
// Description: Session configuration model, validation, and examples.
// Purpose: Single source of truth for twain-direct.toml semantics.
// Dependencies: twain-direct-core, serde, toml
// ============================================================================

//! ## Overview
//! `twain-direct-config` defines the configuration of one device session:
//! scanner identity, the inquiry cache, the simulated device table, the
//! encryption catalog, logging, and input limits. Validation is strict and
//! fails closed; the loaded model converts directly into the engine's
//! collaborators.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
