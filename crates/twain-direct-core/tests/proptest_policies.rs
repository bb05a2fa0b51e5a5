// crates/twain-direct-core/tests/proptest_policies.rs
// ============================================================================
// Module: Exception Policy Property-Based Tests
// Description: Property tests for default fallback and vendor filtering.
// Purpose: Check sibling fallback and silent exclusion across task shapes.
// ============================================================================

//! Property-based tests for default exception policies and vendor filtering.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

use proptest::prelude::*;
use twain_direct_core::CancellationFlag;
use twain_direct_core::DeviceOperation;
use twain_direct_core::SimulatedDevice;
use twain_direct_core::StaticCertificateStore;
use twain_direct_core::StaticProfileCatalog;
use twain_direct_core::TaskEngine;
use twain_direct_core::TaskEngineConfig;
use twain_direct_core::TaskReply;
use twain_direct_core::VendorId;
use uuid::Uuid;

// ============================================================================
// SECTION: Test Fixtures
// ============================================================================

type Engine = TaskEngine<SimulatedDevice, StaticProfileCatalog, StaticCertificateStore>;

fn engine() -> (Engine, SimulatedDevice) {
    let device = SimulatedDevice::standard(&[100, 200, 300]);
    let observer = device.clone();
    let mut engine = TaskEngine::new(
        TaskEngineConfig::default(),
        device,
        StaticProfileCatalog::default(),
        StaticCertificateStore::default(),
    );
    engine.discover_inquiry();
    observer.clear_log().unwrap();
    (engine, observer)
}

/// Stream requesting a single resolution.
fn stream(dpi: u32) -> String {
    format!(
        r#"{{"sources":[{{"source":"any","pixelFormats":[{{"pixelFormat":"rgb24",
            "attributes":[{{"attribute":"resolution","values":[{{"value":{dpi}}}]}}]}}]}}]}}"#
    )
}

/// Configure task whose streams `0 .. failing` request an unsupported value.
fn task_with_failures(count: usize, failing: usize) -> String {
    let streams: Vec<String> =
        (0 .. count).map(|index| stream(if index < failing { 1200 } else { 200 })).collect();
    format!(r#"{{"actions":[{{"action":"configure","streams":[{}]}}]}}"#, streams.join(","))
}

fn reset_count(device: &SimulatedDevice) -> usize {
    device
        .operations()
        .unwrap()
        .iter()
        .filter(|operation| **operation == DeviceOperation::Reset)
        .count()
}

fn foreign_vendor() -> impl Strategy<Value = String> {
    any::<u128>()
        .prop_map(|bits| Uuid::from_u128(bits).to_string())
        .prop_filter("not the TWAIN Direct vendor", |text| {
            VendorId::parse(text) != Some(VendorId::TWAIN_DIRECT)
        })
}

// ============================================================================
// SECTION: Properties
// ============================================================================

proptest! {
    #[test]
    fn default_policy_falls_through_to_next_stream(
        (count, failing) in (1usize .. 6).prop_flat_map(|count| (Just(count), 0 ..= count))
    ) {
        let (mut engine, device) = engine();
        let outcome = engine.negotiate(&task_with_failures(count, failing), &CancellationFlag::new());
        prop_assert!(outcome.is_success());

        let winner = failing.min(count - 1);
        let streams = &outcome.reply.actions[0].streams;
        prop_assert_eq!(streams.len(), 1);
        prop_assert_eq!(&streams[0].name, &format!("stream{winner}"));

        let attributes = &streams[0].sources[0].pixel_formats[0].attributes;
        if failing < count {
            prop_assert_eq!(attributes.len(), 1);
            prop_assert_eq!(attributes[0].values[0].value.clone(), serde_json::json!(200));
        } else {
            prop_assert!(attributes.is_empty());
        }
        prop_assert_eq!(reset_count(&device), 1 + winner);
    }

    #[test]
    fn foreign_vendor_streams_never_appear(vendor in foreign_vendor(), position in 0usize .. 3) {
        let (mut engine, _) = engine();
        let streams: Vec<String> = (0 .. 3)
            .map(|index| {
                if index == position {
                    format!(r#"{{"vendor":"{vendor}","sources":[{{"source":"feeder"}}]}}"#)
                } else {
                    r#"{"sources":[{"source":"flatbed"}]}"#.to_string()
                }
            })
            .collect();
        let task = format!(
            r#"{{"actions":[{{"action":"configure","streams":[{}]}}]}}"#,
            streams.join(",")
        );
        let outcome = engine.negotiate(&task, &CancellationFlag::new());
        prop_assert!(outcome.is_success());
        let reply_json = outcome.reply_json().unwrap();
        prop_assert!(!reply_json.contains(&vendor));
        prop_assert!(!reply_json.contains("\"feeder\""));
    }

    #[test]
    fn foreign_vendor_actions_leave_trivial_reply(vendor in foreign_vendor(), count in 1usize .. 4) {
        let (mut engine, device) = engine();
        let actions: Vec<String> = (0 .. count)
            .map(|_| {
                format!(
                    r#"{{"action":"configure","vendor":"{vendor}",
                        "streams":[{{"sources":[{{"source":"feeder"}}]}}]}}"#
                )
            })
            .collect();
        let task = format!(r#"{{"actions":[{}]}}"#, actions.join(","));
        let outcome = engine.negotiate(&task, &CancellationFlag::new());
        prop_assert_eq!(outcome.reply, TaskReply::trivial());
        prop_assert!(device.operations().unwrap().is_empty());
    }
}
