//! Enrollment workflow driven end-to-end through `AppService::tick`.

use biomark::app::events::{AppEvent, Outcome, WorkflowKind};
use biomark::app::ports::{CharBuffer, SearchHit, SensorError};
use biomark::workflow::EnrollState;
use serde_json::json;

use crate::mock_hw::{MockHardware, Rig, SensorCall};

fn post_ali(rig: &mut Rig) {
    rig.post("enroll", json!({ "Name": "Ali", "Roll_No": "42" }));
}

fn finished(rig: &Rig) -> Option<Outcome> {
    rig.sink.events.iter().rev().find_map(|e| match e {
        AppEvent::WorkflowFinished {
            workflow: WorkflowKind::Enroll,
            outcome,
            ..
        } => Some(*outcome),
        _ => None,
    })
}

#[test]
fn two_scans_store_template_and_publish_success() {
    let mut hw = MockHardware::new();
    hw.fingers(2);
    let mut rig = Rig::new(hw);
    post_ali(&mut rig);

    rig.run_to_idle(20);

    assert_eq!(
        rig.store.at("Enrollment_Result"),
        Some(&json!({
            "Status": "Success",
            "Type": "New",
            "Data": { "Name": "Ali", "Roll_No": "42" },
            "ID": 0,
        }))
    );
    assert_eq!(rig.command_type(), Some("none"));
    assert_eq!(rig.status(), Some("idle"));
    assert_eq!(rig.hw.count(SensorCall::Persist(0)), 1);
    assert_eq!(finished(&rig), Some(Outcome::Success));
    // Slot 0 is consumed; the counter moved on.
    assert_eq!(rig.app.slots().free_ids(), &[1]);
    assert!(rig.hw.showed("Enrollment Successful"));
}

#[test]
fn waits_for_finger_without_advancing() {
    let mut rig = Rig::new(MockHardware::new());
    post_ali(&mut rig);

    rig.ticks(5);

    assert!(matches!(rig.app.workflows().enroll.state(), EnrollState::Scan1(_)));
    assert_eq!(rig.status(), Some("processing"));
    assert_eq!(rig.hw.count(SensorCall::Vectorize(CharBuffer::One)), 0);
}

#[test]
fn duplicate_finger_publishes_existing_id_without_second_scan() {
    let mut hw = MockHardware::new();
    hw.fingers(2);
    hw.search_results.push_back(Ok(SearchHit::Found {
        slot: 7,
        confidence: 120,
    }));
    let mut rig = Rig::new(hw);
    post_ali(&mut rig);

    rig.run_to_idle(20);

    assert_eq!(
        rig.store.at("Enrollment_Result"),
        Some(&json!({
            "Status": "Success",
            "Type": "duplicate",
            "Data": {},
            "ID": "7",
        }))
    );
    assert_eq!(rig.hw.count(SensorCall::Capture), 1);
    assert_eq!(rig.hw.count(SensorCall::Vectorize(CharBuffer::Two)), 0);
    assert_eq!(finished(&rig), Some(Outcome::Duplicate));
    // The reserved slot went back to the pool.
    assert!(rig.app.slots().free_ids().contains(&0));
}

#[test]
fn missing_roll_number_flags_data_not_found() {
    let mut rig = Rig::new(MockHardware::new());
    rig.post("enroll", json!({ "Name": "Ali" }));

    rig.run_to_idle(5);

    assert_eq!(rig.store.at("Command/Result"), Some(&json!("Data_Not_Found")));
    assert_eq!(rig.store.at("Enrollment_Result"), None);
    assert_eq!(rig.status(), Some("idle"));
    assert_eq!(rig.app.slots().free_ids(), &[0]);
    assert_eq!(finished(&rig), Some(Outcome::Rejected));
}

#[test]
fn unconsumed_result_blocks_enrollment() {
    let mut rig = Rig::new(MockHardware::new());
    rig.store.put("Enrollment_Result", json!({ "Status": "Success" }));
    post_ali(&mut rig);

    rig.run_to_idle(5);

    assert_eq!(
        rig.store.at("Command/Result"),
        Some(&json!("Previous_Result_Not_Saved"))
    );
    assert_eq!(rig.status(), Some("idle"));
    assert_eq!(rig.hw.count(SensorCall::Capture), 0);
    assert_eq!(rig.app.slots().free_ids(), &[0]);
}

#[test]
fn unacknowledged_command_result_rejects() {
    let mut rig = Rig::new(MockHardware::new());
    rig.store.put("Command/Result", json!("Data_Not_Found"));
    post_ali(&mut rig);

    rig.run_to_idle(5);

    assert_eq!(finished(&rig), Some(Outcome::Rejected));
    assert_eq!(rig.store.at("Enrollment_Result"), None);
    assert_eq!(rig.status(), Some("idle"));
}

#[test]
fn cancel_mid_scan_releases_slot() {
    let mut rig = Rig::new(MockHardware::new());
    post_ali(&mut rig);
    rig.ticks(2);
    assert!(matches!(rig.app.workflows().enroll.state(), EnrollState::Scan1(_)));

    rig.cancel();
    rig.tick();

    assert!(!rig.app.is_busy());
    assert_eq!(
        rig.store.at("Enrollment_Result"),
        Some(&json!({
            "Status": "Cancelled",
            "Type": "None",
            "Data": {},
            "ID": "None",
        }))
    );
    assert_eq!(rig.store.at("Command/Cancelled"), Some(&json!(false)));
    assert!(rig.app.slots().free_ids().contains(&0));
    assert_eq!(finished(&rig), Some(Outcome::Cancelled));
}

#[test]
fn store_failure_publishes_raw_error_code() {
    let mut hw = MockHardware::new();
    hw.fingers(2);
    hw.persist_results.push_back(Err(SensorError::new(0x18)));
    let mut rig = Rig::new(hw);
    post_ali(&mut rig);

    rig.run_to_idle(20);

    assert_eq!(
        rig.store.at("Enrollment_Result"),
        Some(&json!({
            "Status": "Failure",
            "Type": "None",
            "Data": {},
            "ID": "None",
            "Info": "Error code: 24",
        }))
    );
    assert_eq!(finished(&rig), Some(Outcome::Failure));
    assert!(rig.app.slots().free_ids().contains(&0));
    assert_eq!(rig.status(), Some("idle"));
}

/// Run Ali's enrollment on `hw` and return the published failure `Info`.
fn failed_info(hw: MockHardware) -> (Rig, Option<serde_json::Value>) {
    let mut rig = Rig::new(hw);
    post_ali(&mut rig);
    rig.run_to_idle(20);
    assert_eq!(finished(&rig), Some(Outcome::Failure));
    assert_eq!(rig.store.at("Enrollment_Result/Status"), Some(&json!("Failure")));
    assert_eq!(rig.status(), Some("idle"));
    // Slot 0 was reserved, then handed back as a hole.
    assert_eq!(rig.app.slots().free_ids(), &[1, 0]);
    let info = rig.store.at("Enrollment_Result/Info").cloned();
    (rig, info)
}

#[test]
fn capture_error_in_first_scan_aborts() {
    let mut hw = MockHardware::new();
    hw.captures.push_back(Err(SensorError::new(0x03)));

    let (rig, info) = failed_info(hw);

    assert_eq!(info, Some(json!("Error code: 3")));
    assert_eq!(rig.hw.count(SensorCall::Vectorize(CharBuffer::One)), 0);
}

#[test]
fn vectorize_error_in_first_scan_aborts() {
    let mut hw = MockHardware::new();
    hw.fingers(1);
    hw.vectorize_results.push_back(Err(SensorError::new(0x06)));

    let (rig, info) = failed_info(hw);

    assert_eq!(info, Some(json!("Error code: 6")));
    assert_eq!(rig.hw.count(SensorCall::Search), 0);
}

#[test]
fn search_error_in_first_scan_aborts() {
    let mut hw = MockHardware::new();
    hw.fingers(1);
    hw.search_results.push_back(Err(SensorError::new(0x01)));

    let (rig, info) = failed_info(hw);

    assert_eq!(info, Some(json!("Error code: 1")));
    assert_eq!(rig.hw.count(SensorCall::Vectorize(CharBuffer::Two)), 0);
}

#[test]
fn vectorize_error_in_second_scan_aborts() {
    let mut hw = MockHardware::new();
    hw.fingers(2);
    hw.vectorize_results.push_back(Ok(()));
    hw.vectorize_results.push_back(Err(SensorError::new(0x07)));

    let (rig, info) = failed_info(hw);

    assert_eq!(info, Some(json!("Error code: 7")));
    assert_eq!(rig.hw.count(SensorCall::Combine), 0);
}

#[test]
fn combine_error_aborts_before_store() {
    let mut hw = MockHardware::new();
    hw.fingers(2);
    hw.combine_results.push_back(Err(SensorError::new(0x0A)));

    let (rig, info) = failed_info(hw);

    assert_eq!(info, Some(json!("Error code: 10")));
    assert_eq!(rig.hw.count(SensorCall::Combine), 1);
    assert_eq!(rig.hw.count(SensorCall::Persist(0)), 0);
}

#[test]
fn full_library_fails_with_exhausted_pool() {
    let all: Vec<u16> = (0..10).collect();
    let mut rig = Rig::new(MockHardware::with_occupied(&all));
    post_ali(&mut rig);

    rig.run_to_idle(5);

    assert_eq!(
        rig.store.at("Enrollment_Result/Info"),
        Some(&json!("No available fingerprint IDs"))
    );
    assert_eq!(finished(&rig), Some(Outcome::Failure));
}

#[test]
fn unreachable_store_holds_state_for_a_tick() {
    let mut rig = Rig::new(MockHardware::new());
    post_ali(&mut rig);
    rig.tick();
    assert!(matches!(rig.app.workflows().enroll.state(), EnrollState::Scan1(_)));

    rig.hw.fingers(1);
    rig.store.fail_reads = 1;
    rig.tick();
    assert!(matches!(rig.app.workflows().enroll.state(), EnrollState::Scan1(_)));
    assert_eq!(rig.hw.count(SensorCall::Capture), 0);

    rig.tick();
    assert!(matches!(rig.app.workflows().enroll.state(), EnrollState::Scan2(_)));
}

#[test]
fn second_enrollment_uses_next_slot() {
    let mut hw = MockHardware::new();
    hw.fingers(2);
    let mut rig = Rig::new(hw);
    post_ali(&mut rig);
    rig.run_to_idle(20);

    // Remote actor consumes the result.
    rig.store.put("Enrollment_Result", serde_json::Value::Null);
    rig.hw.fingers(2);
    rig.post("enroll", json!({ "Name": "Sara", "Roll_No": 17 }));
    rig.run_to_idle(20);

    assert_eq!(rig.store.at("Enrollment_Result/ID"), Some(&json!(1)));
    assert_eq!(
        rig.store.at("Enrollment_Result/Data/Roll_No"),
        Some(&json!("17"))
    );
}
