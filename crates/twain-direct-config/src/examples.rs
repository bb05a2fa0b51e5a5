// crates/twain-direct-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and the CLI.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for TWAIN Direct configuration. The output is static
//! and is kept loadable by the config tests.

/// Returns a canonical example `twain-direct.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[scanner]
name = "Lab Feeder Scanner"
vendor_id = "7c2f5a1e-3b4d-4e6f-8a9b-0c1d2e3f4a5b"

# Omit [inquiry] to discover support facts from the device at startup.
[inquiry]
automatic_sense_medium = true
camera_side = true
sheet_count = true
feeder = true
duplex = true
compression = true
resolutions = [100, 150, 200, 300, 600]
supported_capabilities = []

[inquiry.physical_size]
width = 8500
height = 14000

[device]
base = "standard"
resolutions = [100, 150, 200, 300, 600]
reset_supported = true

[[device.capabilities]]
name = "CAP_SHEETCOUNT"
item_type = "uint32"
values = []
current = ["0"]

[[encryption.profiles]]
name = "pdf-aes256"
profile = { cipher = "aes256", keyWrap = "rsa-oaep" }

[[encryption.profiles]]
name = "none"

[encryption.certificate]
subject = "CN=Lab Feeder Scanner"
issuer = "CN=Lab Root CA"
not_before = "2026-01-01T00:00:00Z"
not_after = "2028-01-01T00:00:00Z"
fingerprint = "3f:9a:0c:51:7e:22:b4:d8"

[logging]
filter = "info"
format = "compact"

[limits]
max_task_bytes = 1048576
"#,
    )
}
