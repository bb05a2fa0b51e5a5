// crates/twain-direct-core/src/core/error.rs
// ============================================================================
// Module: TWAIN Direct Task Errors
// Description: Task failure taxonomy and the first-failure-wins result record.
// Purpose: Turn structural, value, and device failures into reply codes.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! A task fails at most once. The first failure recorded in a
//! [`TaskResult`] wins; later failures are logged and dropped so the reply
//! always names the root cause rather than a consequence of it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::interfaces::CertificateError;
use crate::interfaces::DeviceError;

// ============================================================================
// SECTION: Task Errors
// ============================================================================

/// Reasons a task fails as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    /// The task text is not valid JSON.
    #[error("malformed task document at character {offset}: {message}")]
    Malformed {
        /// Character offset of the parse failure.
        offset: u64,
        /// Parser message.
        message: String,
    },
    /// A key appears where the topology does not allow it.
    #[error("invalid task topology at {json_key}")]
    Structural {
        /// Locator of the offending key.
        json_key: String,
    },
    /// A value is not recognized and its policy is `fail`.
    #[error("invalid value '{value}' at {json_key}")]
    InvalidValue {
        /// Locator of the offending field.
        json_key: String,
        /// Offending value as written.
        value: String,
    },
    /// The device refused an operation and the policy is `fail`.
    #[error("device rejected {native} at {json_key}")]
    Rejected {
        /// Locator of the node being negotiated.
        json_key: String,
        /// Native operation that was attempted.
        native: String,
    },
    /// Every candidate stream or profile was exhausted.
    #[error("no fallback left at {json_key}")]
    ExhaustedFallback {
        /// Locator of the last candidate.
        json_key: String,
    },
    /// The device channel itself failed in a way that cannot be ignored.
    #[error("device unavailable: {0}")]
    DeviceUnavailable(#[from] DeviceError),
    /// The certificate store could not be read for an encryption report.
    #[error("certificate unavailable: {0}")]
    CertificateUnavailable(#[from] CertificateError),
    /// Negotiation was cancelled between actions.
    #[error("negotiation cancelled before {json_key}")]
    Cancelled {
        /// Locator of the first action not negotiated.
        json_key: String,
    },
}

impl TaskError {
    /// Returns the reply code for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Malformed { .. } => "invalidJson",
            Self::Structural { .. } => "invalidTask",
            Self::InvalidValue { .. } => "invalidValue",
            Self::Rejected { .. } | Self::ExhaustedFallback { .. } => "fail",
            Self::DeviceUnavailable(_) => "deviceUnavailable",
            Self::CertificateUnavailable(_) => "certificateUnavailable",
            Self::Cancelled { .. } => "cancelled",
        }
    }

    /// Returns the document locator, if the error has one.
    #[must_use]
    pub fn json_key(&self) -> Option<&str> {
        match self {
            Self::Structural { json_key }
            | Self::InvalidValue { json_key, .. }
            | Self::Rejected { json_key, .. }
            | Self::ExhaustedFallback { json_key }
            | Self::Cancelled { json_key } => Some(json_key),
            Self::Malformed { .. }
            | Self::DeviceUnavailable(_)
            | Self::CertificateUnavailable(_) => None,
        }
    }

    /// Returns the parse offset, if the error came from parsing.
    #[must_use]
    pub const fn character_offset(&self) -> Option<u64> {
        match self {
            Self::Malformed { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Returns the native operation string, if the device refused one.
    #[must_use]
    pub fn native_value(&self) -> Option<&str> {
        match self {
            Self::Rejected { native, .. } => Some(native),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Task Result
// ============================================================================

/// Recorded task failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Name of the action being processed (empty before any action).
    pub action: String,
    /// The failure itself.
    pub error: TaskError,
}

/// First-failure-wins task result.
///
/// # Invariants
/// - Once a failure is recorded it never changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskResult {
    /// The first recorded failure.
    failure: Option<TaskFailure>,
}

impl TaskResult {
    /// Creates a successful result.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failure: None,
        }
    }

    /// Records a failure unless one is already recorded.
    ///
    /// Returns true when this call recorded the failure.
    pub fn record_failure(&mut self, action: &str, error: TaskError) -> bool {
        if let Some(existing) = &self.failure {
            tracing::debug!(
                recorded = %existing.error,
                dropped = %error,
                "task already failed; keeping first failure"
            );
            return false;
        }
        tracing::info!(action, code = error.code(), error = %error, "task failed");
        self.failure = Some(TaskFailure {
            action: action.to_string(),
            error,
        });
        true
    }

    /// Returns true when a failure has been recorded.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.failure.is_some()
    }

    /// Returns the recorded failure.
    #[must_use]
    pub const fn failure(&self) -> Option<&TaskFailure> {
        self.failure.as_ref()
    }

    /// Consumes the result and returns the recorded failure.
    #[must_use]
    pub fn into_failure(self) -> Option<TaskFailure> {
        self.failure
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::TaskError;
    use super::TaskResult;

    /// Tests that later failures never overwrite the first one.
    #[test]
    fn test_first_failure_wins() {
        let mut result = TaskResult::new();
        assert!(result.record_failure("configure", TaskError::Structural {
            json_key: "actions[0].streams".to_string(),
        }));
        assert!(!result.record_failure("configure", TaskError::ExhaustedFallback {
            json_key: "actions[0].streams[1]".to_string(),
        }));
        let failure = result.failure().map(|failure| failure.error.code());
        assert_eq!(failure, Some("invalidTask"));
    }

    /// Tests reply fields exposed by each error variant.
    #[test]
    fn test_error_reply_fields() {
        let malformed = TaskError::Malformed {
            offset: 17,
            message: "expected value".to_string(),
        };
        assert_eq!(malformed.code(), "invalidJson");
        assert_eq!(malformed.character_offset(), Some(17));
        assert_eq!(malformed.json_key(), None);

        let rejected = TaskError::Rejected {
            json_key: "actions[0].streams[0].sources[0]".to_string(),
            native: "CAP_FEEDERENABLED,TWON_ONEVALUE,TWTY_BOOL,1".to_string(),
        };
        assert_eq!(rejected.code(), "fail");
        assert_eq!(rejected.native_value(), Some("CAP_FEEDERENABLED,TWON_ONEVALUE,TWTY_BOOL,1"));
    }
}
