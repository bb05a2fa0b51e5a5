// crates/twain-direct-core/src/runtime/value_set.rs
// ============================================================================
// Module: TWAIN Direct Capability Value Set
// Description: Ordered candidate operations tried against the device.
// Purpose: Find the first candidate the device accepts for one setting.
// Dependencies: tracing, crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! A value set holds the candidates for one logical setting in preference
//! order. Each candidate is a group of operations that must all be accepted.
//! The first accepted candidate wins; trying stops there.
//!
//! Operations on capabilities the inquiry cache reports as unsupported are
//! refused locally without contacting the device. A candidate refused midway
//! is rolled back, so the device holds either all of it or none of it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::core::capability::NativeCapability;
use crate::core::error::TaskError;
use crate::core::inquiry::DeviceInquiry;
use crate::interfaces::DeviceChannel;
use crate::interfaces::DeviceError;
use crate::runtime::resolver::Candidate;

// ============================================================================
// SECTION: Attempts
// ============================================================================

/// Why a candidate was not applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Refusal {
    /// The refused operation in native tuple form.
    pub native: String,
    /// The capability exists but the value was refused.
    pub bad_value: bool,
    /// The device channel itself failed while applying the operation.
    pub channel: Option<DeviceError>,
}

impl Refusal {
    /// Converts the refusal into the task error reported under `fail`.
    #[must_use]
    pub fn into_error(self, json_key: String) -> TaskError {
        match self.channel {
            Some(err) => TaskError::DeviceUnavailable(err),
            None => TaskError::Rejected {
                json_key,
                native: self.native,
            },
        }
    }
}

/// Result of applying one candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    /// Every operation was accepted; these are the device-echoed values.
    Accepted(Vec<NativeCapability>),
    /// An operation was refused; earlier operations were rolled back.
    Refused(Refusal),
}

/// Applies every operation of a candidate, stopping at the first refusal.
///
/// Operations on capabilities outside the inquiry support list refuse the
/// candidate before the device is contacted. When a later operation is
/// refused, the operations already accepted are set back to the values read
/// before the candidate was applied, so the device never keeps half of a
/// candidate.
pub fn apply_operations<D: DeviceChannel>(
    device: &mut D,
    inquiry: &DeviceInquiry,
    operations: &[NativeCapability],
) -> Attempt {
    if let Some(operation) =
        operations.iter().find(|operation| !inquiry.supports_capability(operation.name()))
    {
        let native = operation.to_string();
        tracing::debug!(native = %native, "capability not in inquiry support list");
        return Attempt::Refused(Refusal {
            native,
            bad_value: false,
            channel: None,
        });
    }
    let grouped = operations.len() > 1;
    let mut echoed = Vec::with_capacity(operations.len());
    let mut applied: Vec<Option<NativeCapability>> = Vec::with_capacity(operations.len());
    for operation in operations {
        let native = operation.to_string();
        let previous = if grouped { snapshot(device, operation.name()) } else { None };
        let refusal = match device.set(operation) {
            Ok(reply) if reply.accepted => {
                tracing::debug!(native = %native, echoed = %reply.echoed, "operation accepted");
                echoed.push(reply.echoed);
                applied.push(previous);
                continue;
            }
            Ok(_) => {
                tracing::debug!(native = %native, "operation refused by device");
                Refusal {
                    native,
                    bad_value: true,
                    channel: None,
                }
            }
            Err(err) => {
                let bad_value = matches!(
                    err,
                    DeviceError::RejectedValue(_) | DeviceError::SequenceError(_)
                );
                let channel = if matches!(err, DeviceError::Channel(_)) {
                    tracing::warn!(native = %native, error = %err, "device channel failure");
                    Some(err)
                } else {
                    tracing::debug!(native = %native, error = %err, "operation failed");
                    None
                };
                Refusal {
                    native,
                    bad_value,
                    channel,
                }
            }
        };
        roll_back(device, applied);
        return Attempt::Refused(refusal);
    }
    Attempt::Accepted(echoed)
}

/// Reads the current value of a capability before it is changed.
fn snapshot<D: DeviceChannel>(device: &mut D, name: &str) -> Option<NativeCapability> {
    match device.get_current(name) {
        Ok(current) => Some(current),
        Err(err) => {
            tracing::debug!(capability = name, error = %err, "no current value to restore");
            None
        }
    }
}

/// Restores accepted operations of a refused candidate, newest first.
fn roll_back<D: DeviceChannel>(device: &mut D, applied: Vec<Option<NativeCapability>>) {
    for previous in applied.into_iter().rev().flatten() {
        match device.set(&previous) {
            Ok(reply) if reply.accepted => {
                tracing::debug!(native = %previous, "partial candidate rolled back");
            }
            Ok(_) => tracing::warn!(native = %previous, "device refused rollback"),
            Err(err) => tracing::warn!(native = %previous, error = %err, "rollback failed"),
        }
    }
}

// ============================================================================
// SECTION: Value Set
// ============================================================================

/// One entry of a value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSetEntry<K> {
    /// Caller key identifying the entry (for example a value id).
    pub key: K,
    /// Candidate to try; `None` entries are skipped.
    pub candidate: Option<Candidate>,
}

/// Per-entry result of negotiating a value set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryResult {
    /// The entry had nothing to negotiate.
    Skipped,
    /// The entry was tried and refused.
    Refused(Refusal),
    /// The entry was accepted.
    Accepted(Vec<NativeCapability>),
}

/// Ordered candidates for one logical setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityValueSet<K> {
    /// Entries in preference order.
    entries: Vec<ValueSetEntry<K>>,
}

impl<K: Copy> CapabilityValueSet<K> {
    /// Creates a value set from entries in preference order.
    #[must_use]
    pub const fn new(entries: Vec<ValueSetEntry<K>>) -> Self {
        Self {
            entries,
        }
    }

    /// Returns the entries.
    #[must_use]
    pub fn entries(&self) -> &[ValueSetEntry<K>] {
        &self.entries
    }

    /// Tries entries in order until one is accepted.
    ///
    /// Returns the results of the entries that were visited; entries after
    /// the accepted one are not visited.
    pub fn negotiate<D: DeviceChannel>(
        &self,
        device: &mut D,
        inquiry: &DeviceInquiry,
    ) -> Vec<(K, EntryResult)> {
        let mut results = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let Some(candidate) = &entry.candidate else {
                results.push((entry.key, EntryResult::Skipped));
                continue;
            };
            match apply_operations(device, inquiry, &candidate.operations) {
                Attempt::Accepted(echoed) => {
                    results.push((entry.key, EntryResult::Accepted(echoed)));
                    break;
                }
                Attempt::Refused(refusal) => {
                    results.push((entry.key, EntryResult::Refused(refusal)));
                }
            }
        }
        results
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions are permitted.")]

    use serde_json::json;

    use super::Attempt;
    use super::CapabilityValueSet;
    use super::EntryResult;
    use super::Refusal;
    use super::ValueSetEntry;
    use super::apply_operations;
    use crate::core::ItemType;
    use crate::core::NativeCapability;
    use crate::core::capability::ICAP_XRESOLUTION;
    use crate::core::capability::ICAP_YRESOLUTION;
    use crate::core::inquiry::DeviceInquiry;
    use crate::interfaces::DeviceError;
    use crate::runtime::resolver::Candidate;
    use crate::runtime::simulated::SimulatedDevice;
    use crate::runtime::simulated::standard_capabilities;

    /// Candidate setting both resolutions to `dpi`.
    fn resolution(dpi: u32) -> Candidate {
        Candidate {
            operations: vec![
                NativeCapability::one_value(ICAP_XRESOLUTION, ItemType::Fix32, dpi),
                NativeCapability::one_value(ICAP_YRESOLUTION, ItemType::Fix32, dpi),
            ],
            reply_value: json!(dpi),
            dpi: Some(dpi),
        }
    }

    /// Tests that trying stops at the first accepted entry.
    #[test]
    fn test_first_accepted_entry_wins() {
        let mut device = SimulatedDevice::standard(&[100, 200]);
        let value_set = CapabilityValueSet::new(vec![
            ValueSetEntry {
                key: 0_usize,
                candidate: None,
            },
            ValueSetEntry {
                key: 1,
                candidate: Some(resolution(300)),
            },
            ValueSetEntry {
                key: 2,
                candidate: Some(resolution(200)),
            },
            ValueSetEntry {
                key: 3,
                candidate: Some(resolution(100)),
            },
        ]);
        let results = value_set.negotiate(&mut device, &DeviceInquiry::default());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0], (0, EntryResult::Skipped));
        assert_eq!(results[1], (1, EntryResult::Refused(Refusal {
            native: "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
            bad_value: true,
            channel: None,
        })));
        assert!(matches!(results[2], (2, EntryResult::Accepted(_))));
    }

    /// Tests that unsupported capabilities are refused without device contact.
    #[test]
    fn test_unsupported_capability_is_refused_locally() {
        let mut device = SimulatedDevice::standard(&[100, 200]);
        let inquiry = DeviceInquiry {
            supported_capabilities: vec![ICAP_XRESOLUTION.to_string()],
            ..DeviceInquiry::default()
        };
        let attempt = apply_operations(&mut device, &inquiry, &resolution(200).operations);
        assert_eq!(attempt, Attempt::Refused(Refusal {
            native: "ICAP_YRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,200".to_string(),
            bad_value: false,
            channel: None,
        }));
        assert!(device.operations().unwrap().is_empty());
    }

    /// Tests that a refused second operation restores the first one.
    #[test]
    fn test_partial_candidate_is_rolled_back() {
        let mut capabilities = standard_capabilities(&[150, 300, 600]);
        for capability in &mut capabilities {
            if capability.name == ICAP_YRESOLUTION {
                capability.allowed = vec!["150".to_string(), "600".to_string()];
            }
        }
        let mut device = SimulatedDevice::new(capabilities);
        let attempt =
            apply_operations(&mut device, &DeviceInquiry::default(), &resolution(300).operations);
        assert!(matches!(attempt, Attempt::Refused(Refusal { bad_value: true, .. })));
        assert_eq!(device.current(ICAP_XRESOLUTION).unwrap(), Some(vec!["150".to_string()]));
        assert_eq!(device.current(ICAP_YRESOLUTION).unwrap(), Some(vec!["150".to_string()]));
        assert_eq!(device.set_requests().unwrap(), vec![
            "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
            "ICAP_YRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
            "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,150".to_string(),
        ]);
    }

    /// Tests that channel failures surface as device-unavailable errors.
    #[test]
    fn test_channel_failure_maps_to_device_unavailable() {
        let refusal = Refusal {
            native: "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
            bad_value: false,
            channel: Some(DeviceError::Channel("link down".to_string())),
        };
        let error = refusal.into_error("actions[0]".to_string());
        assert_eq!(error.code(), "deviceUnavailable");
        assert_eq!(error.json_key(), None);
    }
}
