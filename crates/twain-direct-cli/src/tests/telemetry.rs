// crates/twain-direct-cli/src/tests/telemetry.rs
// ============================================================================
// Module: CLI Telemetry Tests
// Description: Unit tests for log filter resolution and subscriber install.
// Purpose: Ensure invalid filters fail closed and installation is idempotent.
// Dependencies: twain-direct-cli telemetry module
// ============================================================================

//! ## Overview
//! Exercises filter resolution and repeated subscriber installation.

use twain_direct_config::LogFormat;
use twain_direct_config::LoggingConfig;

use crate::telemetry::TelemetryError;
use crate::telemetry::install;
use crate::telemetry::resolve_filter;

#[test]
fn configured_filter_is_accepted() {
    let config = LoggingConfig {
        filter: "twain_direct_core=debug,warn".to_string(),
        format: LogFormat::Compact,
    };
    assert!(resolve_filter(&config).is_ok());
}

#[test]
fn invalid_configured_filter_is_rejected() {
    if std::env::var_os("RUST_LOG").is_some() {
        return;
    }
    let config = LoggingConfig {
        filter: "twain_direct_core=loud".to_string(),
        format: LogFormat::Json,
    };
    assert!(matches!(resolve_filter(&config), Err(TelemetryError::Filter(_))));
}

#[test]
fn repeated_install_is_idempotent() {
    let config = LoggingConfig::default();
    install(&config).unwrap();
    install(&config).unwrap();
}
