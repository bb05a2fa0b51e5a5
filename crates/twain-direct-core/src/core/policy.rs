// crates/twain-direct-core/src/core/policy.rs
// ============================================================================
// Module: TWAIN Direct Exception Policy
// Description: Per-node fallback policy and vendor ownership classification.
// Purpose: Encode exception handling and vendor scope as closed enums.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every task node carries an exception policy telling the negotiation driver
//! what to do when the node cannot be honored. Nodes that do not declare one
//! start with [`PolicySetting::Pending`] and receive a positional default in
//! the post-construction fix-up pass.
//!
//! Vendor ownership decides whether content is negotiated at all: unknown
//! vendors are dropped silently when the hierarchy is built.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::VendorId;
use crate::core::outcome::Outcome;

// ============================================================================
// SECTION: Exception Policy
// ============================================================================

/// Fallback instruction applied when a node cannot be negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExceptionPolicy {
    /// Swallow the problem and continue as if the node succeeded.
    Ignore,
    /// Abort the whole task with a structured error.
    Fail,
    /// Abandon the current action and move to the next one.
    NextAction,
    /// Abandon the current stream and try the next one.
    NextStream,
    /// Abandon the current encryption profile and try the next one.
    NextEncryptionProfile,
}

impl ExceptionPolicy {
    /// Parses a policy keyword from a task document.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "ignore" => Some(Self::Ignore),
            "fail" => Some(Self::Fail),
            "nextAction" => Some(Self::NextAction),
            "nextStream" => Some(Self::NextStream),
            "nextEncryptionProfile" => Some(Self::NextEncryptionProfile),
            _ => None,
        }
    }

    /// Returns the task-document keyword for the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ignore => "ignore",
            Self::Fail => "fail",
            Self::NextAction => "nextAction",
            Self::NextStream => "nextStream",
            Self::NextEncryptionProfile => "nextEncryptionProfile",
        }
    }

    /// Returns the outcome a node settles on when this policy fires.
    #[must_use]
    pub const fn outcome(self) -> Outcome {
        match self {
            Self::Ignore => Outcome::SuccessIgnore,
            Self::Fail => Outcome::Fail,
            Self::NextAction => Outcome::NextAction,
            Self::NextStream => Outcome::NextStream,
            Self::NextEncryptionProfile => Outcome::NextEncryptionProfile,
        }
    }

    /// Returns the outcome for this policy inside the configure branch.
    ///
    /// Profile fallback has no meaning below a stream and behaves as `ignore`.
    #[must_use]
    pub const fn stream_outcome(self) -> Outcome {
        match self {
            Self::NextEncryptionProfile => Outcome::SuccessIgnore,
            other => other.outcome(),
        }
    }

    /// Returns the outcome for this policy inside the encryption profile branch.
    ///
    /// Stream fallback has no meaning for profiles and behaves as `ignore`.
    #[must_use]
    pub const fn profile_outcome(self) -> Outcome {
        match self {
            Self::NextStream => Outcome::SuccessIgnore,
            other => other.outcome(),
        }
    }
}

impl fmt::Display for ExceptionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exception policy slot stored on each node.
///
/// # Invariants
/// - `Pending` only exists between construction and the fix-up pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySetting {
    /// Declared in the task document.
    Explicit(ExceptionPolicy),
    /// Not declared; awaiting the positional default.
    Pending,
    /// Positional default assigned by the fix-up pass.
    Defaulted(ExceptionPolicy),
}

impl PolicySetting {
    /// Returns the effective policy (`ignore` while still pending).
    #[must_use]
    pub const fn resolved(self) -> ExceptionPolicy {
        match self {
            Self::Explicit(policy) | Self::Defaulted(policy) => policy,
            Self::Pending => ExceptionPolicy::Ignore,
        }
    }

    /// Returns true when the policy was declared in the task document.
    #[must_use]
    pub const fn is_explicit(self) -> bool {
        matches!(self, Self::Explicit(_))
    }
}

// ============================================================================
// SECTION: Vendor Ownership
// ============================================================================

/// Owner of a node's content as derived from its vendor GUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuidOwner {
    /// Standard content (no vendor, or the reserved TWAIN Direct id).
    TwainDirect,
    /// Content scoped to the scanner in session.
    Scanner,
    /// Content scoped to some other vendor; skipped silently.
    Unknown,
}

impl GuidOwner {
    /// Classifies a declared vendor string against the scanner in session.
    #[must_use]
    pub fn classify(vendor: &str, scanner: Option<&VendorId>) -> Self {
        let trimmed = vendor.trim();
        if trimmed.is_empty() {
            return Self::TwainDirect;
        }
        let Some(parsed) = VendorId::parse(trimmed) else {
            return Self::Unknown;
        };
        if parsed == VendorId::TWAIN_DIRECT {
            Self::TwainDirect
        } else if scanner == Some(&parsed) {
            Self::Scanner
        } else {
            Self::Unknown
        }
    }
}
