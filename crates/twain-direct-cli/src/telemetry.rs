// crates/twain-direct-cli/src/telemetry.rs
// ============================================================================
// Module: CLI Telemetry
// Description: Installs the global tracing subscriber for CLI commands.
// Purpose: Route engine diagnostics to stderr in the configured format.
// Dependencies: tracing, tracing-subscriber, twain-direct-config.
// ============================================================================

//! ## Overview
//! Diagnostics go to stderr so stdout carries only reply documents. The
//! `RUST_LOG` environment variable overrides the configured filter.
//! Installation happens at most once per process.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io;
use std::io::IsTerminal;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use twain_direct_config::LogFormat;
use twain_direct_config::LoggingConfig;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Records that the global subscriber was installed.
static TELEMETRY_INSTALLED: OnceLock<()> = OnceLock::new();

/// Errors encountered while configuring telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The log filter expression did not parse.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// The global subscriber could not be installed.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(String),
}

// ============================================================================
// SECTION: Installation
// ============================================================================

/// Installs the global tracing subscriber on first use.
///
/// Later calls return without touching the global state.
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another
/// subscriber already owns the global slot.
pub fn install(config: &LoggingConfig) -> Result<(), TelemetryError> {
    if TELEMETRY_INSTALLED.get().is_some() {
        return Ok(());
    }
    let filter = resolve_filter(config)?;
    let subscriber = build_subscriber(filter, config.format);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|err| TelemetryError::Subscriber(err.to_string()))?;
    let _ = TELEMETRY_INSTALLED.set(());
    Ok(())
}

/// Resolves the filter from `RUST_LOG`, falling back to the configured one.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] when the configured filter is invalid.
pub(crate) fn resolve_filter(config: &LoggingConfig) -> Result<EnvFilter, TelemetryError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.filter).map_err(|err| TelemetryError::Filter(err.to_string()))
}

/// Builds a stderr subscriber in the requested format.
fn build_subscriber(filter: EnvFilter, format: LogFormat) -> Box<dyn Subscriber + Send + Sync> {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal());
    match format {
        LogFormat::Json => Box::new(builder.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    }
}
