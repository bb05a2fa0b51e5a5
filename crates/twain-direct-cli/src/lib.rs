// crates/twain-direct-cli/src/lib.rs
// ============================================================================
// Module: TWAIN Direct CLI Library
// Description: Shared helpers for the TWAIN Direct command-line interface.
// Purpose: Provide reusable components (i18n, telemetry) for the CLI binary.
// Dependencies: tracing-subscriber, twain-direct-config.
// ============================================================================

//! ## Overview
//! This library houses shared CLI utilities: the internationalized message
//! catalog and tracing subscriber installation. The binary entry point
//! (`src/main.rs`) imports these helpers to keep user-facing output and
//! diagnostics consistent.

// ============================================================================
// SECTION: Modules
// ============================================================================

/// Internationalization helpers and message catalog.
pub mod i18n;
/// Tracing subscriber installation.
pub mod telemetry;

#[cfg(test)]
mod tests;
