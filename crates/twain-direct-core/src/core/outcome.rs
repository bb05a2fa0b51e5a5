// crates/twain-direct-core/src/core/outcome.rs
// ============================================================================
// Module: TWAIN Direct Outcomes
// Description: Negotiation outcomes and node status state machine.
// Purpose: Give every fold point in the driver a closed sum to match on.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Nodes move `Ready -> Run -> Settled(outcome)`. Classification (the
//! Process phase) moves nodes to `Run` or settles them early; the Run phase
//! settles the rest.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of negotiating one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    /// The node was honored.
    Success,
    /// Nothing at this node mattered; treated as success.
    SuccessIgnore,
    /// Hard failure; the task aborts.
    Fail,
    /// A capability existed but every requested value was rejected.
    BadValue,
    /// Move on to the next action.
    NextAction,
    /// Move on to the next stream.
    NextStream,
    /// Move on to the next encryption profile.
    NextEncryptionProfile,
    /// The node belongs to another vendor and was excluded.
    VendorMismatch,
}

impl Outcome {
    /// Folds a child outcome into its parent level.
    ///
    /// `SuccessIgnore`, `BadValue` and `VendorMismatch` count as success one
    /// level up; control signals and failures propagate unchanged.
    #[must_use]
    pub const fn fold(self) -> Self {
        match self {
            Self::Success | Self::SuccessIgnore | Self::BadValue | Self::VendorMismatch => {
                Self::Success
            }
            Self::Fail => Self::Fail,
            Self::NextAction => Self::NextAction,
            Self::NextStream => Self::NextStream,
            Self::NextEncryptionProfile => Self::NextEncryptionProfile,
        }
    }

    /// Returns true for `Success` and `SuccessIgnore`.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::SuccessIgnore)
    }

    /// Returns the camelCase label used in logs and CLI output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SuccessIgnore => "successIgnore",
            Self::Fail => "fail",
            Self::BadValue => "badValue",
            Self::NextAction => "nextAction",
            Self::NextStream => "nextStream",
            Self::NextEncryptionProfile => "nextEncryptionProfile",
            Self::VendorMismatch => "vendorMismatch",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Node Status
// ============================================================================

/// Lifecycle status of a task node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeStatus {
    /// Constructed; not yet classified.
    #[default]
    Ready,
    /// Classified and eligible for device contact.
    Run,
    /// Finished with the given outcome.
    Settled(Outcome),
}

impl NodeStatus {
    /// Returns the settled outcome, if any.
    #[must_use]
    pub const fn outcome(self) -> Option<Outcome> {
        match self {
            Self::Settled(outcome) => Some(outcome),
            Self::Ready | Self::Run => None,
        }
    }

    /// Returns true when the node settled with [`Outcome::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Settled(Outcome::Success))
    }

    /// Returns true when the node is eligible for the Run phase.
    #[must_use]
    pub const fn is_runnable(self) -> bool {
        matches!(self, Self::Run)
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Run => f.write_str("run"),
            Self::Settled(outcome) => f.write_str(outcome.as_str()),
        }
    }
}
