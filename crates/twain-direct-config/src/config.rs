// crates/twain-direct-config/src/config.rs
// ============================================================================
// Module: TWAIN Direct Configuration
// Description: Configuration loading and validation for a device session.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: twain-direct-core, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The model describes one device session: who the scanner is, what the
//! device supports, how the simulated device behaves, which encryption
//! profiles exist, and how the process logs. Missing or invalid configuration
//! fails closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use twain_direct_core::CertificateInfo;
use twain_direct_core::DeviceInquiry;
use twain_direct_core::ItemType;
use twain_direct_core::ProfileEntry;
use twain_direct_core::SimulatedCapability;
use twain_direct_core::SimulatedDevice;
use twain_direct_core::StaticCertificateStore;
use twain_direct_core::StaticProfileCatalog;
use twain_direct_core::TaskEngineConfig;
use twain_direct_core::VendorId;
use twain_direct_core::standard_capabilities;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "twain-direct.toml";
/// Environment variable naming the configuration file.
pub const CONFIG_ENV_VAR: &str = "TWAIN_DIRECT_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default maximum task document size in bytes.
pub(crate) const DEFAULT_MAX_TASK_BYTES: usize = 1024 * 1024;
/// Upper bound for the task document size limit.
pub(crate) const MAX_TASK_BYTES: usize = 16 * 1024 * 1024;
/// Resolutions of the standard simulated device when none are configured.
pub(crate) const DEFAULT_RESOLUTIONS: [u32; 5] = [100, 150, 200, 300, 600];
/// Maximum number of configured device capabilities.
pub(crate) const MAX_DEVICE_CAPABILITIES: usize = 256;
/// Maximum number of configured encryption profiles.
pub(crate) const MAX_ENCRYPTION_PROFILES: usize = 64;

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// TWAIN Direct session configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TwainDirectConfig {
    /// Scanner identity.
    #[serde(default)]
    pub scanner: ScannerConfig,
    /// Inquiry cache; discovered from the device when absent.
    #[serde(default)]
    pub inquiry: Option<DeviceInquiry>,
    /// Simulated device table.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Encryption profile catalog and certificate.
    #[serde(default)]
    pub encryption: EncryptionConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Input limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl TwainDirectConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// The path is `path` when given, else the `TWAIN_DIRECT_CONFIG`
    /// environment variable, else `twain-direct.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scanner.validate()?;
        if let Some(inquiry) = &self.inquiry {
            validate_inquiry(inquiry)?;
        }
        self.device.validate()?;
        self.encryption.validate()?;
        self.logging.validate()?;
        self.limits.validate()?;
        Ok(())
    }

    /// Returns true when the inquiry cache must be discovered from the device.
    #[must_use]
    pub const fn needs_discovery(&self) -> bool {
        self.inquiry.is_none()
    }

    /// Builds the task engine configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the scanner vendor is not a GUID.
    pub fn engine_config(&self) -> Result<TaskEngineConfig, ConfigError> {
        Ok(TaskEngineConfig {
            scanner_vendor: self.scanner.vendor()?,
            inquiry: self.inquiry.clone().unwrap_or_default(),
            ..TaskEngineConfig::default()
        })
    }

    /// Builds the simulated device described by `[device]`.
    #[must_use]
    pub fn simulated_device(&self) -> SimulatedDevice {
        SimulatedDevice::with_reset(self.device.capability_table(), self.device.reset_supported)
    }

    /// Builds the encryption profile catalog.
    #[must_use]
    pub fn profile_catalog(&self) -> StaticProfileCatalog {
        StaticProfileCatalog::new(
            self.encryption
                .profiles
                .iter()
                .map(|profile| ProfileEntry {
                    name: profile.name.clone(),
                    profile: profile.profile.clone(),
                })
                .collect(),
        )
    }

    /// Builds the certificate store.
    #[must_use]
    pub fn certificate_store(&self) -> StaticCertificateStore {
        StaticCertificateStore::new(
            self.encryption.certificate.as_ref().map(CertificateConfig::to_certificate),
        )
    }
}

// ============================================================================
// SECTION: Scanner
// ============================================================================

/// Scanner identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScannerConfig {
    /// Display name of the scanner.
    #[serde(default = "default_scanner_name")]
    pub name: String,
    /// Vendor GUID claimed by the scanner for its own task extensions.
    #[serde(default)]
    pub vendor_id: Option<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            name: default_scanner_name(),
            vendor_id: None,
        }
    }
}

impl ScannerConfig {
    /// Validates scanner identity.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("scanner.name must be non-empty".to_string()));
        }
        self.vendor()?;
        Ok(())
    }

    /// Parses the configured vendor GUID.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when `vendor_id` is not a GUID.
    pub fn vendor(&self) -> Result<Option<VendorId>, ConfigError> {
        let Some(text) = &self.vendor_id else {
            return Ok(None);
        };
        let vendor = VendorId::parse(text).ok_or_else(|| {
            ConfigError::Invalid(format!("scanner.vendor_id is not a GUID: {text}"))
        })?;
        if vendor == VendorId::TWAIN_DIRECT {
            return Err(ConfigError::Invalid(
                "scanner.vendor_id must differ from the TWAIN Direct vendor".to_string(),
            ));
        }
        Ok(Some(vendor))
    }
}

// ============================================================================
// SECTION: Inquiry
// ============================================================================

/// Validates an explicit inquiry cache.
fn validate_inquiry(inquiry: &DeviceInquiry) -> Result<(), ConfigError> {
    if inquiry.resolutions.contains(&0) {
        return Err(ConfigError::Invalid("inquiry.resolutions must be non-zero".to_string()));
    }
    if let Some(size) = inquiry.physical_size
        && (size.width == 0 || size.height == 0)
    {
        return Err(ConfigError::Invalid(
            "inquiry.physical_size dimensions must be non-zero".to_string(),
        ));
    }
    if inquiry.supported_capabilities.iter().any(|name| name.trim().is_empty()) {
        return Err(ConfigError::Invalid(
            "inquiry.supported_capabilities entries must be non-empty".to_string(),
        ));
    }
    Ok(())
}

// ============================================================================
// SECTION: Device
// ============================================================================

/// Starting capability table of the simulated device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceBase {
    /// Feeder scanner with a flatbed and the usual image capabilities.
    #[default]
    Standard,
    /// No capabilities beyond those configured explicitly.
    Empty,
}

/// Simulated device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Starting capability table.
    #[serde(default)]
    pub base: DeviceBase,
    /// Resolutions offered by the standard table.
    #[serde(default = "default_resolutions")]
    pub resolutions: Vec<u32>,
    /// Whether the device honors reset requests.
    #[serde(default = "default_reset_supported")]
    pub reset_supported: bool,
    /// Capabilities added to, or replacing entries of, the base table.
    #[serde(default)]
    pub capabilities: Vec<CapabilityConfig>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base: DeviceBase::Standard,
            resolutions: default_resolutions(),
            reset_supported: default_reset_supported(),
            capabilities: Vec::new(),
        }
    }
}

impl DeviceConfig {
    /// Validates the device table.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.base == DeviceBase::Standard && self.resolutions.is_empty() {
            return Err(ConfigError::Invalid(
                "device.resolutions must be non-empty for the standard device".to_string(),
            ));
        }
        if self.resolutions.contains(&0) {
            return Err(ConfigError::Invalid("device.resolutions must be non-zero".to_string()));
        }
        if self.capabilities.len() > MAX_DEVICE_CAPABILITIES {
            return Err(ConfigError::Invalid("device.capabilities exceeds max entries".to_string()));
        }
        let mut names = BTreeSet::new();
        for capability in &self.capabilities {
            capability.validate()?;
            if !names.insert(capability.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "device.capabilities has duplicate name: {}",
                    capability.name
                )));
            }
        }
        Ok(())
    }

    /// Returns the capability table with overrides applied.
    #[must_use]
    pub fn capability_table(&self) -> Vec<SimulatedCapability> {
        let mut table = match self.base {
            DeviceBase::Standard => standard_capabilities(&self.resolutions),
            DeviceBase::Empty => Vec::new(),
        };
        for capability in &self.capabilities {
            table.retain(|existing| existing.name != capability.name);
            table.push(capability.to_simulated());
        }
        table
    }
}

/// One simulated device capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CapabilityConfig {
    /// Native capability name.
    pub name: String,
    /// Native item type.
    #[serde(default = "default_item_type")]
    pub item_type: ItemType,
    /// Allowed values; empty allows any value.
    #[serde(default)]
    pub values: Vec<String>,
    /// Power-on value, also restored by a reset.
    #[serde(default)]
    pub current: Vec<String>,
}

impl CapabilityConfig {
    /// Validates one capability entry.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "device.capabilities.name must be non-empty".to_string(),
            ));
        }
        if !self.values.is_empty()
            && let Some(value) = self.current.iter().find(|value| !self.values.contains(value))
        {
            return Err(ConfigError::Invalid(format!(
                "device.capabilities {} current value {value} is not allowed",
                self.name
            )));
        }
        Ok(())
    }

    /// Converts the entry into a simulated capability.
    fn to_simulated(&self) -> SimulatedCapability {
        SimulatedCapability {
            name: self.name.clone(),
            item_type: self.item_type,
            allowed: self.values.clone(),
            current: self.current.clone(),
            default: self.current.clone(),
        }
    }
}

// ============================================================================
// SECTION: Encryption
// ============================================================================

/// Encryption profile catalog and certificate.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncryptionConfig {
    /// Profiles in catalog order.
    #[serde(default)]
    pub profiles: Vec<ProfileConfig>,
    /// Active certificate, if any.
    #[serde(default)]
    pub certificate: Option<CertificateConfig>,
}

impl EncryptionConfig {
    /// Validates the catalog.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.len() > MAX_ENCRYPTION_PROFILES {
            return Err(ConfigError::Invalid(
                "encryption.profiles exceeds max entries".to_string(),
            ));
        }
        let mut names = BTreeSet::new();
        for profile in &self.profiles {
            if profile.name.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "encryption.profiles.name must be non-empty".to_string(),
                ));
            }
            if !names.insert(profile.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "encryption.profiles has duplicate name: {}",
                    profile.name
                )));
            }
        }
        if let Some(certificate) = &self.certificate {
            certificate.validate()?;
        }
        Ok(())
    }
}

/// One encryption profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    /// Profile name clients select.
    pub name: String,
    /// Profile body echoed in replies.
    #[serde(default)]
    pub profile: Option<JsonValue>,
}

/// Certificate metadata reported by encryptionReport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CertificateConfig {
    /// Certificate subject.
    pub subject: String,
    /// Certificate issuer.
    pub issuer: String,
    /// Start of validity.
    #[serde(default)]
    pub not_before: Option<String>,
    /// End of validity.
    #[serde(default)]
    pub not_after: Option<String>,
    /// Fingerprint.
    #[serde(default)]
    pub fingerprint: Option<String>,
}

impl CertificateConfig {
    /// Validates certificate metadata.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.subject.trim().is_empty() || self.issuer.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "encryption.certificate subject and issuer must be non-empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts to the engine's certificate type.
    fn to_certificate(&self) -> CertificateInfo {
        CertificateInfo {
            subject: self.subject.clone(),
            issuer: self.issuer.clone(),
            not_before: self.not_before.clone(),
            not_after: self.not_after.clone(),
            fingerprint: self.fingerprint.clone(),
        }
    }
}

// ============================================================================
// SECTION: Logging and Limits
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per event.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Filter directives, overridden by `RUST_LOG`.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::Compact,
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.filter must be non-empty".to_string()));
        }
        Ok(())
    }
}

/// Input limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Maximum task document size in bytes.
    #[serde(default = "default_max_task_bytes")]
    pub max_task_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_task_bytes: default_max_task_bytes(),
        }
    }
}

impl LimitsConfig {
    /// Validates limits.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_task_bytes == 0 {
            return Err(ConfigError::Invalid("limits.max_task_bytes must be non-zero".to_string()));
        }
        if self.max_task_bytes > MAX_TASK_BYTES {
            return Err(ConfigError::Invalid("limits.max_task_bytes exceeds max".to_string()));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Default scanner display name.
fn default_scanner_name() -> String {
    "TWAIN Direct Simulated Scanner".to_string()
}

/// Default standard-table resolutions.
fn default_resolutions() -> Vec<u32> {
    DEFAULT_RESOLUTIONS.to_vec()
}

/// Default reset support.
const fn default_reset_supported() -> bool {
    true
}

/// Default item type for configured capabilities.
const fn default_item_type() -> ItemType {
    ItemType::UInt16
}

/// Default log filter.
fn default_log_filter() -> String {
    "info".to_string()
}

/// Default task size limit.
const fn default_max_task_bytes() -> usize {
    DEFAULT_MAX_TASK_BYTES
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = TwainDirectConfig::from_toml_str("").unwrap();
        assert_eq!(config, TwainDirectConfig::default());
        assert!(config.needs_discovery());
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.limits.max_task_bytes, DEFAULT_MAX_TASK_BYTES);
    }

    #[test]
    fn capability_override_replaces_standard_entry() {
        let config = TwainDirectConfig::from_toml_str(
            r#"
            [[device.capabilities]]
            name = "ICAP_PIXELTYPE"
            item_type = "uint16"
            values = ["0"]
            current = ["0"]
            "#,
        )
        .unwrap();
        let table = config.device.capability_table();
        let pixel_types: Vec<_> =
            table.iter().filter(|capability| capability.name == "ICAP_PIXELTYPE").collect();
        assert_eq!(pixel_types.len(), 1);
        assert_eq!(pixel_types[0].allowed, vec!["0".to_string()]);
    }

    #[test]
    fn empty_base_contains_only_configured_capabilities() {
        let config = TwainDirectConfig::from_toml_str(
            r#"
            [device]
            base = "empty"

            [[device.capabilities]]
            name = "CAP_FEEDERENABLED"
            item_type = "bool"
            values = ["0", "1"]
            current = ["1"]
            "#,
        )
        .unwrap();
        let table = config.device.capability_table();
        assert_eq!(table.len(), 1);
        assert_eq!(table[0].item_type, ItemType::Bool);
    }

    #[test]
    fn twain_direct_vendor_is_not_a_scanner_vendor() {
        let scanner = ScannerConfig {
            vendor_id: Some("211a1e90-11e1-11e5-9493-1697f925ec7b".to_string()),
            ..ScannerConfig::default()
        };
        assert!(scanner.vendor().is_err());
    }
}
