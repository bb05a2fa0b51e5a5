// crates/twain-direct-core/src/runtime/negotiate.rs
// ============================================================================
// Module: TWAIN Direct Run Phase
// Description: Device negotiation for configure and encryption actions.
// Purpose: Drive the device through streams, sources, pixel formats, and
//          attributes, folding outcomes by exception policy.
// Dependencies: tracing, crate::core, crate::interfaces, crate::runtime
// ============================================================================

//! ## Overview
//! The Run phase visits every node the Process phase left runnable. A
//! configure action tries its streams in order until one succeeds; inside a
//! stream every source, pixel format, and attribute must fold to success.
//!
//! Failure handling follows the exception policy of the node that failed:
//! - `ignore`: the node settles as `successIgnore` (or `badValue`).
//! - `nextStream`: the device is reset and the next stream is tried.
//! - `nextAction`: the action is abandoned and the next one runs.
//! - `fail`: the task fails with the refused native operation.
//!
//! ## Invariants
//! - A stream switch is always preceded by a device reset.
//! - Nodes are settled exactly once.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::capability::CAP_AUTOMATICSENSEMEDIUM;
use crate::core::capability::CAP_DUPLEXENABLED;
use crate::core::capability::CAP_FEEDERENABLED;
use crate::core::capability::ICAP_PIXELTYPE;
use crate::core::encryption::EncryptionReport;
use crate::core::error::TaskError;
use crate::core::error::TaskResult;
use crate::core::identifiers::ActionId;
use crate::core::identifiers::AttributeId;
use crate::core::identifiers::PixelFormatId;
use crate::core::identifiers::SourceId;
use crate::core::identifiers::StreamId;
use crate::core::identifiers::ValueId;
use crate::core::inquiry::DeviceInquiry;
use crate::core::outcome::NodeStatus;
use crate::core::outcome::Outcome;
use crate::core::policy::ExceptionPolicy;
use crate::core::setting::CompressionSetting;
use crate::core::setting::Setting;
use crate::core::task::AddressingAttribute;
use crate::core::task::AddressingSetting;
use crate::core::task::PixelType;
use crate::core::task::SourceSelector;
use crate::core::task::Task;
use crate::interfaces::CertificateStore;
use crate::interfaces::DeviceChannel;
use crate::interfaces::ProfileCatalog;
use crate::runtime::resolver::Resolution;
use crate::runtime::resolver::ResolveContext;
use crate::runtime::resolver::resolve;
use crate::runtime::value_set::Attempt;
use crate::runtime::value_set::CapabilityValueSet;
use crate::runtime::value_set::EntryResult;
use crate::runtime::value_set::ValueSetEntry;
use crate::runtime::value_set::apply_operations;

// ============================================================================
// SECTION: Source Report
// ============================================================================

/// Paper source the device ended up on after a successful configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSourceReport {
    /// The flatbed is selected (no feeder, no automatic sensing).
    pub flatbed: bool,
    /// Duplex capture is enabled.
    pub duplex: bool,
}

/// Resets the device, logging rather than failing when it refuses.
pub fn reset_device<D: DeviceChannel>(device: &mut D, reason: &'static str) {
    match device.reset_all() {
        Ok(()) => tracing::debug!(reason, "device reset"),
        Err(err) => {
            tracing::warn!(reason, error = %err, "device reset failed; continuing");
        }
    }
}

// ============================================================================
// SECTION: Configure Negotiator
// ============================================================================

/// Run-phase driver for one configure action.
pub struct Negotiator<'a, D> {
    /// Device in session.
    device: &'a mut D,
    /// Inquiry cache for the device.
    inquiry: &'a DeviceInquiry,
    /// Task-wide failure record.
    result: &'a mut TaskResult,
    /// Name of the action being negotiated.
    action: String,
}

impl<'a, D: DeviceChannel> Negotiator<'a, D> {
    /// Creates a negotiator for the named action.
    pub fn new(
        device: &'a mut D,
        inquiry: &'a DeviceInquiry,
        result: &'a mut TaskResult,
        action: impl Into<String>,
    ) -> Self {
        Self {
            device,
            inquiry,
            result,
            action: action.into(),
        }
    }

    /// Negotiates a configure action, trying streams until one succeeds.
    pub fn run_configure(&mut self, task: &mut Task, action: ActionId) -> Outcome {
        reset_device(self.device, "configure start");
        let streams = task[action].streams.clone();
        let mut outcome = Outcome::Success;
        for (position, stream) in streams.iter().enumerate() {
            let status = task[*stream].meta.status;
            let stream_outcome = if status.is_runnable() {
                self.run_stream(task, *stream).fold()
            } else {
                status.outcome().unwrap_or(Outcome::SuccessIgnore).fold()
            };
            task[*stream].meta.settle(stream_outcome);
            tracing::debug!(
                json_key = %task[*stream].meta.json_key,
                outcome = %stream_outcome,
                "stream negotiated"
            );
            match stream_outcome {
                Outcome::Success => {
                    outcome = Outcome::Success;
                    break;
                }
                Outcome::NextStream if position + 1 < streams.len() => {
                    reset_device(self.device, "next stream");
                }
                Outcome::NextStream => {
                    self.result.record_failure(&self.action, TaskError::ExhaustedFallback {
                        json_key: task[*stream].meta.json_key.clone(),
                    });
                    outcome = Outcome::Fail;
                    break;
                }
                Outcome::NextAction => {
                    outcome = Outcome::NextAction;
                    break;
                }
                _ => {
                    outcome = Outcome::Fail;
                    break;
                }
            }
        }
        if !outcome.is_success() {
            reset_device(self.device, "configure abandoned");
        }
        outcome
    }

    /// Reads back where the device will take paper from.
    pub fn read_source_report(&mut self) -> Option<ScanSourceReport> {
        let feeder = self.current_flag(CAP_FEEDERENABLED);
        let sense = self.current_flag(CAP_AUTOMATICSENSEMEDIUM);
        let duplex = self.current_flag(CAP_DUPLEXENABLED);
        if feeder.is_none() && sense.is_none() && duplex.is_none() {
            return None;
        }
        Some(ScanSourceReport {
            flatbed: !(feeder.unwrap_or(false) || sense.unwrap_or(false)),
            duplex: duplex.unwrap_or(false),
        })
    }

    /// Reads a capability's current value as a flag.
    fn current_flag(&mut self, name: &str) -> Option<bool> {
        match self.device.get_current(name) {
            Ok(current) => current.value().map(|value| value.trim() != "0"),
            Err(err) => {
                tracing::debug!(capability = name, error = %err, "current value unavailable");
                None
            }
        }
    }

    /// Negotiates the sources of one stream.
    fn run_stream(&mut self, task: &mut Task, stream: StreamId) -> Outcome {
        for source in task[stream].sources.clone() {
            if !task[source].meta.status.is_runnable() {
                continue;
            }
            let outcome = self.run_source(task, source).fold();
            task[source].meta.settle(outcome);
            if outcome != Outcome::Success {
                return outcome;
            }
        }
        Outcome::Success
    }

    /// Negotiates source addressing, then the pixel formats.
    fn run_source(&mut self, task: &mut Task, source: SourceId) -> Outcome {
        let policy = task[source].meta.policy();
        let lenient = task[source].selector == SourceSelector::Any;
        let json_key = task[source].meta.field_key("source");
        let outcome =
            self.run_addressing(&mut task[source].addressing, policy, lenient, &json_key);
        if outcome != Outcome::Success {
            return outcome;
        }
        for pixel_format in task[source].pixel_formats.clone() {
            if !task[pixel_format].meta.status.is_runnable() {
                continue;
            }
            let outcome = self.run_pixel_format(task, pixel_format).fold();
            task[pixel_format].meta.settle(outcome);
            if outcome != Outcome::Success {
                return outcome;
            }
        }
        Outcome::Success
    }

    /// Negotiates pixel format addressing, then the attributes.
    fn run_pixel_format(&mut self, task: &mut Task, pixel_format: PixelFormatId) -> Outcome {
        let policy = task[pixel_format].meta.policy();
        let lenient = task[task[pixel_format].source].selector == SourceSelector::Any;
        let json_key = task[pixel_format].meta.field_key("pixelFormat");
        let outcome =
            self.run_addressing(&mut task[pixel_format].addressing, policy, lenient, &json_key);
        if outcome != Outcome::Success {
            return outcome;
        }
        task[pixel_format].resolved_pixel_type = task[pixel_format]
            .addressing
            .iter()
            .find(|attribute| attribute.setting == AddressingSetting::PixelType)
            .and_then(|attribute| attribute.accepted.as_deref())
            .and_then(PixelType::from_native);
        for attribute in task[pixel_format].attributes.clone() {
            if !task[attribute].meta.status.is_runnable() {
                continue;
            }
            let outcome = self.run_attribute(task, pixel_format, attribute);
            task[attribute].meta.settle(outcome);
            let folded = outcome.fold();
            if folded != Outcome::Success {
                return folded;
            }
        }
        Outcome::Success
    }

    /// Returns true when an addressing setting should not be sent.
    fn skip_addressing(&self, attribute: &AddressingAttribute, sense_enabled: bool) -> bool {
        let inquiry = self.inquiry;
        let disabling = attribute.desired == Some(0);
        match attribute.setting {
            AddressingSetting::AutomaticSenseMedium => !inquiry.automatic_sense_medium,
            AddressingSetting::FeederEnabled => sense_enabled || (disabling && !inquiry.feeder),
            AddressingSetting::DuplexEnabled => disabling && !inquiry.duplex,
            AddressingSetting::CameraSide => !inquiry.camera_side,
            AddressingSetting::PixelType => false,
        }
    }

    /// Negotiates fixed addressing settings in order.
    ///
    /// When `lenient` is set, refusals of source-derived settings are ignored.
    fn run_addressing(
        &mut self,
        addressing: &mut [AddressingAttribute],
        policy: ExceptionPolicy,
        lenient: bool,
        json_key: &str,
    ) -> Outcome {
        let mut sense_enabled = false;
        for attribute in addressing.iter_mut() {
            let Some(operation) = attribute.operation() else {
                attribute.status = NodeStatus::Settled(Outcome::SuccessIgnore);
                continue;
            };
            if self.skip_addressing(attribute, sense_enabled) {
                tracing::debug!(native = %operation, "addressing skipped for this device");
                attribute.status = NodeStatus::Settled(Outcome::SuccessIgnore);
                continue;
            }
            match apply_operations(self.device, self.inquiry, std::slice::from_ref(&operation)) {
                Attempt::Accepted(echoed) => {
                    attribute.accepted = echoed
                        .first()
                        .and_then(|capability| capability.value())
                        .map(str::to_string);
                    attribute.status = NodeStatus::Settled(Outcome::Success);
                    if attribute.setting == AddressingSetting::AutomaticSenseMedium
                        && attribute.desired == Some(1)
                    {
                        sense_enabled = true;
                    }
                }
                Attempt::Refused(refusal) => {
                    let best_effort = lenient && attribute.setting != AddressingSetting::PixelType;
                    let outcome =
                        if best_effort { Outcome::SuccessIgnore } else { policy.stream_outcome() };
                    let status = if outcome == Outcome::SuccessIgnore && refusal.bad_value {
                        Outcome::BadValue
                    } else {
                        outcome
                    };
                    attribute.status = NodeStatus::Settled(status);
                    if outcome == Outcome::Fail {
                        self.result
                            .record_failure(&self.action, refusal.into_error(json_key.to_string()));
                    }
                    if outcome != Outcome::SuccessIgnore {
                        return outcome;
                    }
                }
            }
        }
        Outcome::Success
    }

    /// Returns the pixel type compression should be chosen against.
    fn pixel_type_for(
        &mut self,
        task: &Task,
        pixel_format: PixelFormatId,
        values: &[ValueId],
    ) -> Option<PixelType> {
        if let Some(pixel_type) = task[pixel_format].resolved_pixel_type {
            return Some(pixel_type);
        }
        let needs_pixel_type = values.iter().any(|value| {
            matches!(
                task[*value].setting,
                Some(Setting::Compression(CompressionSetting::AutoVersion1))
            )
        });
        if !needs_pixel_type {
            return None;
        }
        match self.device.get_current(ICAP_PIXELTYPE) {
            Ok(current) => current.value().and_then(PixelType::from_native),
            Err(err) => {
                tracing::debug!(error = %err, "current pixel type unavailable");
                None
            }
        }
    }

    /// Negotiates one attribute; the first accepted value wins.
    fn run_attribute(
        &mut self,
        task: &mut Task,
        pixel_format: PixelFormatId,
        attribute: AttributeId,
    ) -> Outcome {
        let values: Vec<ValueId> = task[attribute]
            .values
            .iter()
            .copied()
            .filter(|value| task[*value].meta.status.is_runnable())
            .collect();
        let Some(last) = values.last().copied() else {
            return Outcome::SuccessIgnore;
        };
        let pixel_type = self.pixel_type_for(task, pixel_format, &values);
        let mut previous = None;
        let mut entries = Vec::with_capacity(values.len());
        for value in &values {
            let context = ResolveContext {
                inquiry: self.inquiry,
                previous,
                pixel_type,
            };
            let candidate = task[*value].setting.as_ref().and_then(|setting| {
                match resolve(setting, &task[*value].raw, &context) {
                    Resolution::Apply(candidate) => Some(candidate),
                    Resolution::Skip => None,
                }
            });
            previous = candidate.as_ref().and_then(|candidate| candidate.dpi);
            entries.push(ValueSetEntry {
                key: *value,
                candidate,
            });
        }

        let value_set = CapabilityValueSet::new(entries);
        let mut accepted = false;
        let mut saw_bad_value = false;
        let mut refusal = None;
        for (value, entry) in value_set.negotiate(self.device, self.inquiry) {
            match entry {
                EntryResult::Skipped => task[value].meta.settle(Outcome::SuccessIgnore),
                EntryResult::Refused(refused) => {
                    saw_bad_value |= refused.bad_value;
                    task[value].meta.settle(Outcome::BadValue);
                    refusal = Some((value, refused));
                }
                EntryResult::Accepted(echoed) => {
                    let reply_value = value_set
                        .entries()
                        .iter()
                        .find(|entry| entry.key == value)
                        .and_then(|entry| entry.candidate.as_ref())
                        .map(|candidate| candidate.reply_value.clone());
                    let node = &mut task[value];
                    node.reply_value = reply_value;
                    node.accepted = echoed;
                    node.meta.settle(Outcome::Success);
                    accepted = true;
                }
            }
        }
        if accepted {
            return Outcome::Success;
        }
        let Some((refused, refusal)) = refusal else {
            return Outcome::SuccessIgnore;
        };
        match task[last].meta.policy().stream_outcome() {
            Outcome::SuccessIgnore if saw_bad_value => Outcome::BadValue,
            Outcome::Fail => {
                let json_key = task[refused].meta.json_key.clone();
                self.result.record_failure(&self.action, refusal.into_error(json_key));
                Outcome::Fail
            }
            other => other,
        }
    }
}

// ============================================================================
// SECTION: Encryption Actions
// ============================================================================

/// Negotiates an encryptionProfiles action against the profile catalog.
///
/// Returns the action outcome and the name of the selected profile.
pub fn run_encryption_profiles<P: ProfileCatalog>(
    task: &mut Task,
    action: ActionId,
    catalog: &P,
    result: &mut TaskResult,
) -> (Outcome, Option<String>) {
    let action_name = task[action].name.clone();
    let profiles = task[action].profiles.clone();
    for (position, profile) in profiles.iter().enumerate() {
        let node = &mut task[*profile];
        let name = node.name.clone().unwrap_or_default();
        let outcome = if node.meta.status.is_runnable() {
            if let Some(entry) = catalog.lookup(&name) {
                tracing::info!(profile = %name, "encryption profile selected");
                if entry.profile.is_some() {
                    node.profile = entry.profile;
                }
                node.meta.settle(Outcome::Success);
                return (Outcome::Success, Some(name));
            }
            let outcome = node.meta.policy().profile_outcome();
            node.meta.settle(outcome);
            outcome
        } else {
            node.meta.status.outcome().unwrap_or(Outcome::SuccessIgnore)
        };
        tracing::debug!(json_key = %node.meta.json_key, outcome = %outcome, "profile not selected");
        match outcome {
            Outcome::NextEncryptionProfile if position + 1 < profiles.len() => {}
            Outcome::NextEncryptionProfile => {
                result.record_failure(&action_name, TaskError::ExhaustedFallback {
                    json_key: node.meta.json_key.clone(),
                });
                return (Outcome::Fail, None);
            }
            Outcome::Fail => {
                result.record_failure(&action_name, TaskError::InvalidValue {
                    json_key: node.meta.field_key("name"),
                    value: name,
                });
                return (Outcome::Fail, None);
            }
            other => return (other, None),
        }
    }
    (Outcome::Success, None)
}

/// Produces the encryption report for an encryptionReport action.
pub fn run_encryption_report<P: ProfileCatalog, C: CertificateStore>(
    task: &mut Task,
    action: ActionId,
    catalog: &P,
    certificates: &C,
    result: &mut TaskResult,
) -> Outcome {
    match certificates.active_certificate() {
        Ok(certificate) => {
            task[action].report = Some(EncryptionReport {
                certificate,
                encryption_profiles: catalog.names(),
                public_key_encryption: true,
            });
            Outcome::Success
        }
        Err(err) => {
            let name = task[action].name.clone();
            result.record_failure(&name, TaskError::CertificateUnavailable(err));
            Outcome::Fail
        }
    }
}
