// crates/twain-direct-core/src/core/encryption.rs
// ============================================================================
// Module: TWAIN Direct Encryption Metadata
// Description: Profile catalog entries, certificate metadata, and reports.
// Purpose: Share encryption data between collaborators, runtime, and replies.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! Encryption actions never touch image payloads. They pick a named profile
//! from an external catalog and report which certificate and profiles are
//! available. These types carry that information.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Profile catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Profile name as referenced by tasks.
    pub name: String,
    /// Opaque profile description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<Value>,
}

/// Metadata of the active device certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CertificateInfo {
    /// Certificate subject.
    pub subject: String,
    /// Certificate issuer.
    pub issuer: String,
    /// Start of the validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<String>,
    /// End of the validity window.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
    /// Certificate fingerprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Descriptive reply fragment for `encryptionReport` actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionReport {
    /// Active certificate, when one is installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateInfo>,
    /// Names of the profiles available in the catalog.
    pub encryption_profiles: Vec<String>,
    /// Public-key encryption is supported.
    pub public_key_encryption: bool,
}
