// crates/twain-direct-core/src/runtime/engine.rs
// ============================================================================
// Module: TWAIN Direct Task Engine
// Description: Parse, classify, negotiate, and reply for one device session.
// Purpose: Provide the single entry point that turns task text into a reply.
// Dependencies: serde_json, tracing, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! The engine owns the device session: the device channel, the profile
//! catalog, the certificate store, and the session state that survives
//! between tasks (selected encryption profile, last scan source).
//!
//! Each submission is independent: a fresh hierarchy is built, processed,
//! negotiated action by action, and dropped once the reply is produced.
//! Submissions on one engine are serialized by `&mut self`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use serde_json::Value as JsonValue;

use crate::core::error::TaskError;
use crate::core::error::TaskFailure;
use crate::core::error::TaskResult;
use crate::core::hashing::DEFAULT_HASH_ALGORITHM;
use crate::core::hashing::HashAlgorithm;
use crate::core::hashing::HashDigest;
use crate::core::hashing::HashError;
use crate::core::hashing::hash_canonical_json;
use crate::core::identifiers::VendorId;
use crate::core::inquiry::DeviceInquiry;
use crate::core::outcome::Outcome;
use crate::core::reply::TaskReply;
use crate::core::task::ActionKind;
use crate::core::task::Task;
use crate::interfaces::CertificateStore;
use crate::interfaces::DeviceChannel;
use crate::interfaces::ProfileCatalog;
use crate::runtime::builder::TaskBuilder;
use crate::runtime::document::TaskDocument;
use crate::runtime::negotiate::Negotiator;
use crate::runtime::negotiate::ScanSourceReport;
use crate::runtime::negotiate::reset_device;
use crate::runtime::negotiate::run_encryption_profiles;
use crate::runtime::negotiate::run_encryption_report;
use crate::runtime::process::process_task;
use crate::runtime::synthesize::synthesize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for a task engine session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskEngineConfig {
    /// Vendor GUID of the scanner in session, if it has one.
    pub scanner_vendor: Option<VendorId>,
    /// Capability support facts for the device.
    pub inquiry: DeviceInquiry,
    /// Hash algorithm used for reply digests.
    pub hash_algorithm: HashAlgorithm,
}

impl Default for TaskEngineConfig {
    fn default() -> Self {
        Self {
            scanner_vendor: None,
            inquiry: DeviceInquiry::default(),
            hash_algorithm: DEFAULT_HASH_ALGORITHM,
        }
    }
}

// ============================================================================
// SECTION: Session State
// ============================================================================

/// State that persists across tasks within one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Encryption profile selected by the last encryptionProfiles action.
    pub active_profile: Option<String>,
    /// Scan source read back after the last successful configure action.
    pub source_report: Option<ScanSourceReport>,
}

/// Cooperative cancellation flag checked between actions.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Creates a flag that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================================
// SECTION: Outcomes
// ============================================================================

/// Result of negotiating one task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    /// Reply document.
    pub reply: TaskReply,
    /// Recorded failure, when the reply is the single-error document.
    pub failure: Option<TaskFailure>,
    /// Negotiated hierarchy, when the task got far enough to build one.
    pub task: Option<Task>,
}

impl TaskOutcome {
    /// Builds the outcome from a finished result.
    fn finish(result: TaskResult, task: Option<Task>) -> Self {
        match result.into_failure() {
            Some(failure) => Self {
                reply: TaskReply::failure(&failure),
                failure: Some(failure),
                task,
            },
            None => Self {
                reply: task.as_ref().map_or_else(TaskReply::trivial, synthesize),
                failure: None,
                task,
            },
        }
    }

    /// Returns true when the task did not fail.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Renders the reply as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when serialization fails.
    pub fn reply_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.reply)
    }
}

/// Result of classifying a task without device contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Classified hierarchy, when the task could be built.
    pub task: Option<Task>,
    /// Recorded failure, if any.
    pub failure: Option<TaskFailure>,
}

// ============================================================================
// SECTION: Task Engine
// ============================================================================

/// Task negotiation engine for one device session.
pub struct TaskEngine<D, P, C> {
    /// Engine configuration.
    config: TaskEngineConfig,
    /// Device channel.
    device: D,
    /// Encryption profile catalog.
    catalog: P,
    /// Certificate store.
    certificates: C,
    /// Cross-task session state.
    session: SessionState,
}

impl<D, P, C> TaskEngine<D, P, C>
where
    D: DeviceChannel,
    P: ProfileCatalog,
    C: CertificateStore,
{
    /// Creates an engine for one device session.
    #[must_use]
    pub fn new(config: TaskEngineConfig, device: D, catalog: P, certificates: C) -> Self {
        let config = TaskEngineConfig {
            inquiry: config.inquiry.normalized(),
            ..config
        };
        Self {
            config,
            device,
            catalog,
            certificates,
            session: SessionState::default(),
        }
    }

    /// Replaces the inquiry cache with one discovered from the device.
    pub fn discover_inquiry(&mut self) {
        self.config.inquiry = DeviceInquiry::discover(&mut self.device);
    }

    /// Returns the engine configuration.
    #[must_use]
    pub const fn config(&self) -> &TaskEngineConfig {
        &self.config
    }

    /// Returns the session state.
    #[must_use]
    pub const fn session(&self) -> &SessionState {
        &self.session
    }

    /// Returns the device channel.
    #[must_use]
    pub const fn device(&self) -> &D {
        &self.device
    }

    /// Returns the device channel mutably.
    pub const fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Parses, builds, and classifies a task without touching the device.
    #[must_use]
    pub fn evaluate(&self, text: &str) -> Evaluation {
        let mut result = TaskResult::new();
        let task = self.prepare(text, &mut result);
        Evaluation {
            task,
            failure: result.into_failure(),
        }
    }

    /// Negotiates a task against the device and produces its reply.
    pub fn negotiate(&mut self, text: &str, cancel: &CancellationFlag) -> TaskOutcome {
        let mut result = TaskResult::new();
        let Some(mut task) = self.prepare(text, &mut result) else {
            return TaskOutcome::finish(result, None);
        };
        if result.is_failed() {
            return TaskOutcome::finish(result, Some(task));
        }
        if task.action_count() == 0 {
            tracing::info!("task has no actions; replying trivially");
            return TaskOutcome::finish(result, Some(task));
        }
        self.run(&mut task, cancel, &mut result);
        TaskOutcome::finish(result, Some(task))
    }

    /// Computes the digest of a reply with the configured algorithm.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] when the reply cannot be canonicalized.
    pub fn digest(&self, reply: &TaskReply) -> Result<HashDigest, HashError> {
        hash_canonical_json(self.config.hash_algorithm, reply)
    }

    /// Parses, builds, and processes a task, recording any failure.
    fn prepare(&self, text: &str, result: &mut TaskResult) -> Option<Task> {
        let document = match TaskDocument::parse(text) {
            Ok(document) => document,
            Err(err) => {
                result.record_failure("", err);
                return None;
            }
        };
        let builder = TaskBuilder::new(self.config.scanner_vendor.as_ref());
        let mut task = match builder.build(&document) {
            Ok(task) => task,
            Err(err) => {
                let action = failing_action(&document, &err);
                result.record_failure(&action, err);
                return None;
            }
        };
        process_task(&mut task, result);
        Some(task)
    }

    /// Runs every runnable action in document order.
    fn run(&mut self, task: &mut Task, cancel: &CancellationFlag, result: &mut TaskResult) {
        for action in task.action_ids() {
            if cancel.is_cancelled() {
                reset_device(&mut self.device, "cancelled");
                result.record_failure(&task[action].name, TaskError::Cancelled {
                    json_key: task[action].meta.json_key.clone(),
                });
                return;
            }
            if !task[action].meta.status.is_runnable() {
                continue;
            }
            let name = task[action].name.clone();
            let outcome = match task[action].kind {
                ActionKind::Configure => {
                    let mut negotiator = Negotiator::new(
                        &mut self.device,
                        &self.config.inquiry,
                        result,
                        name.as_str(),
                    );
                    let outcome = negotiator.run_configure(task, action);
                    if outcome == Outcome::Success {
                        self.session.source_report = negotiator.read_source_report();
                    }
                    outcome
                }
                ActionKind::EncryptionProfiles => {
                    let (outcome, selected) =
                        run_encryption_profiles(task, action, &self.catalog, result);
                    if selected.is_some() {
                        self.session.active_profile = selected;
                    }
                    outcome
                }
                ActionKind::EncryptionReport => run_encryption_report(
                    task,
                    action,
                    &self.catalog,
                    &self.certificates,
                    result,
                ),
                ActionKind::VendorExtension | ActionKind::Unrecognized => Outcome::SuccessIgnore,
            };
            let folded = outcome.fold();
            task[action].meta.settle(folded);
            tracing::info!(
                json_key = %task[action].meta.json_key,
                action = %name,
                outcome = %folded,
                "action negotiated"
            );
            if folded == Outcome::Fail || result.is_failed() {
                return;
            }
        }
    }
}

/// Names the action a structural error belongs to.
fn failing_action(document: &TaskDocument, error: &TaskError) -> String {
    let Some(prefix) = error
        .json_key()
        .and_then(|json_key| json_key.split('.').next())
        .filter(|segment| segment.starts_with("actions["))
    else {
        return String::new();
    };
    match document.lookup(prefix) {
        Some(JsonValue::Object(object)) => {
            object.get("action").and_then(JsonValue::as_str).unwrap_or("configure").to_string()
        }
        _ => String::new(),
    }
}
