// crates/twain-direct-core/tests/negotiation_scenarios.rs
// ============================================================================
// Module: Negotiation Scenario Tests
// Description: End-to-end negotiation of configure tasks on a simulated device.
// Purpose: Validate replies and device operation order for common tasks.
// ============================================================================

//! Configure-task negotiation tests against the simulated device.

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

use serde_json::Value;
use serde_json::json;
use twain_direct_core::CancellationFlag;
use twain_direct_core::DeviceOperation;
use twain_direct_core::ScanSourceReport;
use twain_direct_core::SimulatedCapability;
use twain_direct_core::SimulatedDevice;
use twain_direct_core::StaticCertificateStore;
use twain_direct_core::StaticProfileCatalog;
use twain_direct_core::TaskEngine;
use twain_direct_core::TaskEngineConfig;
use twain_direct_core::TaskOutcome;
use twain_direct_core::VendorId;
use twain_direct_core::standard_capabilities;

// ============================================================================
// SECTION: Test Fixtures
// ============================================================================

type Engine = TaskEngine<SimulatedDevice, StaticProfileCatalog, StaticCertificateStore>;

/// Builds an engine over the standard simulated device with a discovered
/// inquiry and a clean operation log, plus an observer handle on the device.
fn engine(resolutions: &[u32]) -> (Engine, SimulatedDevice) {
    let device = SimulatedDevice::standard(resolutions);
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

/// Scanner vendor GUID used by the vendor content tests.
const SCANNER: &str = "4a7e2f10-9c3b-4d5e-8f6a-1b2c3d4e5f60";

/// Builds an engine over `capabilities` with the scanner vendor set and an
/// undiscovered inquiry, plus an observer handle on the device.
fn engine_over(capabilities: Vec<SimulatedCapability>) -> (Engine, SimulatedDevice) {
    let device = SimulatedDevice::new(capabilities);
    let observer = device.clone();
    let engine = TaskEngine::new(
        TaskEngineConfig {
            scanner_vendor: VendorId::parse(SCANNER),
            ..TaskEngineConfig::default()
        },
        device,
        StaticProfileCatalog::default(),
        StaticCertificateStore::default(),
    );
    (engine, observer)
}

fn negotiate(engine: &mut Engine, task: &str) -> TaskOutcome {
    engine.negotiate(task, &CancellationFlag::new())
}

fn reply_value(outcome: &TaskOutcome) -> Value {
    serde_json::from_str(&outcome.reply_json().unwrap()).unwrap()
}

fn resolution_requests(device: &SimulatedDevice) -> Vec<String> {
    device
        .set_requests()
        .unwrap()
        .into_iter()
        .filter(|native| native.starts_with("ICAP_XRESOLUTION"))
        .collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[test]
fn empty_task_replies_trivially() {
    let (mut engine, device) = engine(&[75, 150, 300, 600]);
    let outcome = negotiate(&mut engine, r#"{"actions":[]}"#);
    assert!(outcome.is_success());
    assert_eq!(
        outcome.reply_json().unwrap(),
        r#"{"actions":[{"action":"","results":{"success":true}}]}"#
    );
    assert!(device.operations().unwrap().is_empty());
}

#[test]
fn missing_actions_list_replies_trivially() {
    let (mut engine, _) = engine(&[300]);
    let outcome = negotiate(&mut engine, r#"{"locale":"en-US"}"#);
    assert_eq!(reply_value(&outcome), json!({"actions":[{"action":"","results":{"success":true}}]}));
}

#[test]
fn flatbed_source_without_pixel_formats() {
    let (mut engine, _) = engine(&[75, 150, 300, 600]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"flatbed"}]}]}]}"#,
    );
    assert!(outcome.is_success());
    assert_eq!(
        reply_value(&outcome),
        json!({"actions":[{
            "action":"configure",
            "streams":[{"name":"stream0","sources":[{"source":"flatbed","name":"source0"}]}],
            "results":{"success":true}
        }]})
    );
    assert_eq!(
        engine.session().source_report,
        Some(ScanSourceReport {
            flatbed: true,
            duplex: false,
        })
    );
}

#[test]
fn literal_resolution_is_applied_and_later_values_untouched() {
    let (mut engine, device) = engine(&[75, 150, 300, 600]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"any",
            "pixelFormats":[{"pixelFormat":"rgb24","attributes":[
                {"attribute":"resolution","values":[{"value":"600"},{"value":"closest"}]}
            ]}]}]}]}]}"#,
    );
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let attribute = &reply["actions"][0]["streams"][0]["sources"][0]["pixelFormats"][0]["attributes"][0];
    assert_eq!(attribute, &json!({"attribute":"resolution","values":[{"value":"600"}]}));
    assert_eq!(resolution_requests(&device), vec![
        "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,600".to_string()
    ]);
    assert_eq!(device.current("ICAP_YRESOLUTION").unwrap(), Some(vec!["600".to_string()]));
}

#[test]
fn closest_without_previous_value_is_ignored() {
    let (mut engine, device) = engine(&[75, 150, 300, 600]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"any",
            "pixelFormats":[{"pixelFormat":"gray8","attributes":[
                {"attribute":"resolution","values":[{"value":"closest"}]}
            ]}]}]}]}]}"#,
    );
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let pixel_format = &reply["actions"][0]["streams"][0]["sources"][0]["pixelFormats"][0];
    assert_eq!(pixel_format, &json!({"pixelFormat":"gray8","name":"pixelFormat0"}));
    assert!(resolution_requests(&device).is_empty());
}

#[test]
fn closest_resolves_against_previous_sibling() {
    let (mut engine, device) = engine(&[75, 150, 300, 600]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"any",
            "pixelFormats":[{"pixelFormat":"rgb24","attributes":[
                {"attribute":"resolution","values":[{"value":280},{"value":"closest"}]}
            ]}]}]}]}]}"#,
    );
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let values = &reply["actions"][0]["streams"][0]["sources"][0]["pixelFormats"][0]["attributes"][0]["values"];
    assert_eq!(values, &json!([{"value":300}]));
    assert_eq!(resolution_requests(&device), vec![
        "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,280".to_string(),
        "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
    ]);
}

#[test]
fn failed_stream_resets_device_before_next_stream() {
    let (mut engine, device) = engine(&[75, 150, 300, 600]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[
            {"exception":"nextStream","sources":[{"source":"any","pixelFormats":[
                {"pixelFormat":"rgb24","attributes":[
                    {"attribute":"resolution","values":[{"value":1200}]}]}]}]},
            {"sources":[{"source":"any","pixelFormats":[
                {"pixelFormat":"rgb24","attributes":[
                    {"attribute":"resolution","values":[{"value":300}]}]}]}]}
        ]}]}"#,
    );
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let streams = reply["actions"][0]["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0]["name"], json!("stream1"));
    assert_eq!(
        streams[0]["sources"][0]["pixelFormats"][0]["attributes"][0]["values"],
        json!([{"value":300}])
    );

    let operations = device.operations().unwrap();
    let set = |native: &str| DeviceOperation::Set(native.to_string());
    let refused = operations
        .iter()
        .position(|op| op == &set("ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,1200"))
        .unwrap();
    let accepted = operations
        .iter()
        .position(|op| op == &set("ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300"))
        .unwrap();
    assert_eq!(operations.first(), Some(&DeviceOperation::Reset));
    assert!(operations[refused .. accepted].contains(&DeviceOperation::Reset));
}

#[test]
fn pixel_type_is_applied_before_compression() {
    let (mut engine, device) = engine(&[200, 300]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"feeder",
            "pixelFormats":[{"pixelFormat":"bw1","attributes":[
                {"attribute":"compression","values":[{"value":"autoVersion1"}]}
            ]}]}]}]}]}"#,
    );
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let values = &reply["actions"][0]["streams"][0]["sources"][0]["pixelFormats"][0]["attributes"][0]["values"];
    assert_eq!(values, &json!([{"value":"group4"}]));

    let requests = device.set_requests().unwrap();
    let pixel_type = requests
        .iter()
        .position(|native| native == "ICAP_PIXELTYPE,TWON_ONEVALUE,TWTY_UINT16,0")
        .unwrap();
    let compression = requests
        .iter()
        .position(|native| native == "ICAP_COMPRESSION,TWON_ONEVALUE,TWTY_UINT16,5")
        .unwrap();
    assert!(pixel_type < compression);
}

#[test]
fn auto_compression_for_color_uses_jpeg() {
    let (mut engine, device) = engine(&[200, 300]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"any",
            "pixelFormats":[{"pixelFormat":"rgb24","attributes":[
                {"attribute":"compression","values":[{"value":"autoVersion1"}]}
            ]}]}]}]}]}"#,
    );
    assert!(outcome.is_success());
    assert_eq!(device.current("ICAP_COMPRESSION").unwrap(), Some(vec!["6".to_string()]));
}

#[test]
fn unknown_vendor_content_is_silently_dropped() {
    let (mut engine, _) = engine(&[300]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[
            {"vendor":"0b5b1c6e-1f2a-4c3d-9e8f-7a6b5c4d3e2f","sources":[{"source":"feeder"}]},
            {"sources":[{"source":"flatbed"}]}
        ]}]}"#,
    );
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let streams = reply["actions"][0]["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 1);
    assert_eq!(streams[0]["sources"][0]["source"], json!("flatbed"));
}

#[test]
fn task_of_only_foreign_vendor_actions_is_trivial() {
    let (mut engine, device) = engine(&[300]);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","vendor":"0b5b1c6e-1f2a-4c3d-9e8f-7a6b5c4d3e2f",
            "streams":[{"sources":[{"source":"feeder"}]}]}]}"#,
    );
    assert_eq!(reply_value(&outcome), json!({"actions":[{"action":"","results":{"success":true}}]}));
    assert!(device.operations().unwrap().is_empty());
}

#[test]
fn scanner_vendor_content_is_echoed_with_vendor() {
    let scanner = "4a7e2f10-9c3b-4d5e-8f6a-1b2c3d4e5f60";
    let device = SimulatedDevice::standard(&[300]);
    let mut engine = TaskEngine::new(
        TaskEngineConfig {
            scanner_vendor: twain_direct_core::VendorId::parse(scanner),
            ..TaskEngineConfig::default()
        },
        device,
        StaticProfileCatalog::default(),
        StaticCertificateStore::default(),
    );
    engine.discover_inquiry();
    let task = format!(
        r#"{{"actions":[{{"action":"configure","streams":[
            {{"vendor":"{scanner}","sources":[{{"source":"flatbed"}}]}}]}}]}}"#
    );
    let outcome = negotiate(&mut engine, &task);
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    assert_eq!(reply["actions"][0]["streams"][0]["vendor"], json!(scanner));
}

#[test]
fn negotiation_is_idempotent_on_reset_device() {
    let (mut engine, _) = engine(&[100, 200, 300]);
    let task = r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"feederFront",
        "pixelFormats":[{"pixelFormat":"gray8","attributes":[
            {"attribute":"resolution","values":[{"value":"maximum"}]},
            {"attribute":"rotation","values":[{"value":90}]}
        ]}]}]}]}]}"#;
    let first = negotiate(&mut engine, task);
    let second = negotiate(&mut engine, task);
    assert!(first.is_success());
    assert_eq!(first.reply_json().unwrap(), second.reply_json().unwrap());
    assert_eq!(engine.digest(&first.reply).unwrap(), engine.digest(&second.reply).unwrap());
}

#[test]
fn reset_failures_do_not_fail_configure() {
    let device = SimulatedDevice::with_reset(twain_direct_core::standard_capabilities(&[300]), false);
    let mut engine = TaskEngine::new(
        TaskEngineConfig::default(),
        device,
        StaticProfileCatalog::default(),
        StaticCertificateStore::default(),
    );
    engine.discover_inquiry();
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"flatbed"}]}]}]}"#,
    );
    assert!(outcome.is_success());
}

#[test]
fn evaluate_does_not_touch_device() {
    let (engine, device) = engine(&[300]);
    let evaluation = engine.evaluate(
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"feeder"}]}]}]}"#,
    );
    assert!(evaluation.failure.is_none());
    assert!(evaluation.task.is_some());
    assert!(device.operations().unwrap().is_empty());
}

#[test]
fn cancelled_task_resets_device_and_reports_cancellation() {
    let (mut engine, device) = engine(&[300]);
    let cancel = CancellationFlag::new();
    cancel.cancel();
    let outcome = engine.negotiate(
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"feeder"}]}]}]}"#,
        &cancel,
    );
    assert!(!outcome.is_success());
    assert_eq!(
        reply_value(&outcome),
        json!({"actions":[{"action":"configure","results":{
            "success":false,"code":"cancelled","jsonKey":"actions[0]"}}]})
    );
    assert_eq!(device.operations().unwrap(), vec![DeviceOperation::Reset]);
}

#[test]
fn refused_second_resolution_axis_restores_first_axis() {
    let mut capabilities = standard_capabilities(&[150, 300, 600]);
    for capability in &mut capabilities {
        if capability.name == "ICAP_YRESOLUTION" {
            capability.allowed = vec!["150".to_string(), "600".to_string()];
        }
    }
    let (mut engine, device) = engine_over(capabilities);
    engine.discover_inquiry();
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"flatbed",
            "pixelFormats":[{"pixelFormat":"rgb24","attributes":[
                {"attribute":"resolution","values":[{"value":300}]}]}]}]}]}]}"#,
    );
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let pixel_format = &reply["actions"][0]["streams"][0]["sources"][0]["pixelFormats"][0];
    assert!(pixel_format.get("attributes").is_none());
    assert_eq!(device.current("ICAP_XRESOLUTION").unwrap(), Some(vec!["150".to_string()]));
    assert_eq!(device.current("ICAP_YRESOLUTION").unwrap(), Some(vec!["150".to_string()]));
    let requests = device.set_requests().unwrap();
    assert_eq!(requests[requests.len() - 3 ..], [
        "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
        "ICAP_YRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,300".to_string(),
        "ICAP_XRESOLUTION,TWON_ONEVALUE,TWTY_FIX32,150".to_string(),
    ]);
}

#[test]
fn missing_length_detection_restores_border_detection() {
    let capabilities: Vec<SimulatedCapability> = standard_capabilities(&[300])
        .into_iter()
        .filter(|capability| capability.name != "ICAP_AUTOMATICLENGTHDETECTION")
        .collect();
    let (mut engine, device) = engine_over(capabilities);
    let outcome = negotiate(
        &mut engine,
        r#"{"actions":[{"action":"configure","streams":[{"sources":[{"source":"any",
            "pixelFormats":[{"pixelFormat":"rgb24","attributes":[
                {"attribute":"cropping","values":[{"value":"automatic"}]}]}]}]}]}]}"#,
    );
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let pixel_format = &reply["actions"][0]["streams"][0]["sources"][0]["pixelFormats"][0];
    assert!(pixel_format.get("attributes").is_none());
    assert_eq!(
        device.current("ICAP_AUTOMATICBORDERDETECTION").unwrap(),
        Some(vec!["0".to_string()])
    );
}

#[test]
fn scanner_vendor_attribute_applies_native_operation() {
    let (mut engine, device) = engine_over(standard_capabilities(&[300]));
    engine.discover_inquiry();
    let task = format!(
        r#"{{"actions":[{{"action":"configure","streams":[{{"sources":[{{"source":"any",
            "pixelFormats":[{{"pixelFormat":"gray8","attributes":[
                {{"attribute":"edgeBoost","vendor":"{SCANNER}","values":[
                    {{"value":"ICAP_BRIGHTNESS,TWON_ONEVALUE,TWTY_FIX32,50"}}]}}]}}]}}]}}]}}]}}"#
    );
    let outcome = negotiate(&mut engine, &task);
    assert!(outcome.is_success());
    let reply = reply_value(&outcome);
    let attribute = &reply["actions"][0]["streams"][0]["sources"][0]["pixelFormats"][0]
        ["attributes"][0];
    assert_eq!(
        attribute,
        &json!({
            "attribute":"edgeBoost",
            "vendor":SCANNER,
            "values":[{"value":"ICAP_BRIGHTNESS,TWON_ONEVALUE,TWTY_FIX32,50"}]
        })
    );
    assert_eq!(device.current("ICAP_BRIGHTNESS").unwrap(), Some(vec!["50".to_string()]));
}

#[test]
fn scanner_vendor_action_without_policy_is_skipped() {
    let (mut engine, device) = engine_over(standard_capabilities(&[300]));
    engine.discover_inquiry();
    device.clear_log().unwrap();
    let task = format!(
        r#"{{"actions":[{{"action":"scrub","vendor":"{SCANNER}"}},
            {{"action":"configure","streams":[{{"sources":[{{"source":"flatbed"}}]}}]}}]}}"#
    );
    let outcome = negotiate(&mut engine, &task);
    assert!(outcome.is_success());
    let actions = &outcome.reply.actions;
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].action, "configure");
    assert!(!device.set_requests().unwrap().iter().any(|native| native.contains("scrub")));
}
