//! Attendance sessions driven end-to-end through `AppService::tick`.

use biomark::app::events::{AppEvent, Outcome, WorkflowKind};
use biomark::app::ports::{SearchHit, SensorError};
use biomark::workflow::AttendanceState;
use serde_json::json;

use crate::mock_hw::{BOOT_UNIX, MockHardware, Rig, test_config};

fn open_session(rig: &mut Rig) {
    rig.post("attendance", json!({ "Class": "BSCS", "Section": "A" }));
    rig.tick();
    assert!(matches!(
        rig.app.workflows().attendance.state(),
        AttendanceState::WaitFinger(_)
    ));
}

/// Feed one recognised finger and tick until its entry is pending.
fn scan(rig: &mut Rig, slot: u16) {
    rig.hw.fingers(1);
    rig.hw
        .search_results
        .push_back(Ok(SearchHit::Found { slot, confidence: 80 }));
    rig.ticks(2);
    assert!(matches!(
        rig.app.workflows().attendance.state(),
        AttendanceState::VerifyStatus { .. }
    ));
}

fn index(rig: &Rig) -> Option<u32> {
    match rig.app.workflows().attendance.state() {
        AttendanceState::WaitFinger(s) | AttendanceState::CaptureImage(s) => Some(s.index),
        AttendanceState::VerifyStatus { session, .. } => Some(session.index),
        _ => None,
    }
}

#[test]
fn opening_publishes_fresh_record() {
    let mut rig = Rig::new(MockHardware::new());
    rig.store
        .put("Attendance_Record/Students/Student0", json!({ "ID": "old" }));
    open_session(&mut rig);

    let record = rig.store.at("Attendance_Record").cloned();
    let record = record.expect("record published");
    assert_eq!(record["Class"], json!("BSCS"));
    assert_eq!(record["Section"], json!("A"));
    assert_eq!(record["End_Time"], json!(0));
    assert!(record["Start_Time"].as_u64().unwrap() >= BOOT_UNIX);
    assert_eq!(rig.store.at("Attendance_Record/Students/Student0"), None);
    assert!(rig.hw.showed("Started"));
}

#[test]
fn missing_class_rejects_without_result_marker() {
    let mut rig = Rig::new(MockHardware::new());
    rig.post("attendance", json!({ "Section": "A" }));

    rig.run_to_idle(5);

    assert_eq!(rig.store.at("Command/Result"), Some(&json!("none")));
    assert_eq!(rig.store.at("Attendance_Record"), None);
    assert_eq!(rig.status(), Some("idle"));
    assert!(rig.hw.showed("Class Missing"));
    assert!(rig.sink.events.contains(&AppEvent::WorkflowFinished {
        workflow: WorkflowKind::Attendance,
        outcome: Outcome::Rejected,
        slot: None,
    }));
}

#[test]
fn rejected_attendance_does_not_block_enrollment() {
    let mut rig = Rig::new(MockHardware::new());
    rig.post("attendance", json!({ "Section": "A" }));
    rig.run_to_idle(5);

    rig.hw.fingers(2);
    rig.post("enroll", json!({ "Name": "Ali", "Roll_No": "42" }));
    rig.run_to_idle(20);

    assert_eq!(
        rig.store.at("Enrollment_Result/Status"),
        Some(&json!("Success"))
    );
    assert_eq!(rig.store.at("Enrollment_Result/ID"), Some(&json!(0)));
}

#[test]
fn capture_error_keeps_session_open() {
    let mut rig = Rig::new(MockHardware::new());
    open_session(&mut rig);

    rig.hw.captures.push_back(Err(SensorError::new(0x03)));
    rig.tick();

    assert!(rig.app.is_busy());
    assert!(rig.hw.showed("Scan Error"));
    assert_eq!(index(&rig), Some(0));
    assert!(matches!(
        rig.app.workflows().attendance.state(),
        AttendanceState::WaitFinger(_)
    ));

    scan(&mut rig, 3);
    assert_eq!(
        rig.store.at("Attendance_Record/Students/Student0/ID"),
        Some(&json!("3"))
    );
}

#[test]
fn search_error_returns_to_wait_without_entry() {
    let mut rig = Rig::new(MockHardware::new());
    open_session(&mut rig);

    rig.hw.fingers(1);
    rig.hw
        .search_results
        .push_back(Err(SensorError::new(0x01)));
    rig.ticks(2);

    assert!(rig.hw.showed("Search"));
    assert!(matches!(
        rig.app.workflows().attendance.state(),
        AttendanceState::WaitFinger(s) if s.index == 0
    ));
    assert_eq!(rig.store.at("Attendance_Record/Students/Student0"), None);
    assert!(
        !rig.sink
            .events
            .iter()
            .any(|e| matches!(e, AppEvent::AttendanceEntry { .. }))
    );
}

#[test]
fn recognised_finger_writes_pending_entry() {
    let mut rig = Rig::new(MockHardware::new());
    open_session(&mut rig);

    scan(&mut rig, 3);

    assert_eq!(
        rig.store.at("Attendance_Record/Students/Student0/Status"),
        Some(&json!("pending"))
    );
    assert_eq!(
        rig.store.at("Attendance_Record/Students/Student0/ID"),
        Some(&json!("3"))
    );
    assert!(rig.sink.events.contains(&AppEvent::AttendanceEntry {
        index: 0,
        student: "3".into(),
    }));
}

#[test]
fn unknown_finger_is_recorded_as_not_found() {
    let mut rig = Rig::new(MockHardware::new());
    open_session(&mut rig);

    rig.hw.fingers(1);
    rig.ticks(2);

    assert_eq!(
        rig.store.at("Attendance_Record/Students/Student0/ID"),
        Some(&json!("Not_Found"))
    );
}

#[test]
fn resolved_entry_advances_index() {
    let mut rig = Rig::new(MockHardware::new());
    open_session(&mut rig);
    scan(&mut rig, 3);

    // Still pending: the device keeps polling.
    rig.ticks(3);
    assert_eq!(index(&rig), Some(0));
    assert!(matches!(
        rig.app.workflows().attendance.state(),
        AttendanceState::VerifyStatus { .. }
    ));

    rig.store.put(
        "Attendance_Record/Students/Student0/Status",
        json!("Success"),
    );
    rig.store.put(
        "Attendance_Record/Students/Student0/Data",
        json!("{\"Name\":\"Sara\",\"Roll_No\":\"17\"}"),
    );
    rig.tick();

    assert_eq!(index(&rig), Some(1));
    assert!(rig.hw.showed("Name: Sara"));
    assert!(rig.hw.showed("Roll No: 17"));
    assert!(rig.sink.events.contains(&AppEvent::EntryResolved {
        index: 0,
        status: "Success".into(),
    }));

    scan(&mut rig, 4);
    assert_eq!(
        rig.store.at("Attendance_Record/Students/Student1/ID"),
        Some(&json!("4"))
    );
}

#[test]
fn not_in_class_is_shown_and_skipped() {
    let mut rig = Rig::new(MockHardware::new());
    open_session(&mut rig);
    scan(&mut rig, 3);

    rig.store.put(
        "Attendance_Record/Students/Student0/Status",
        json!("Not_in_Class"),
    );
    rig.tick();

    assert!(rig.hw.showed("in Class"));
    assert_eq!(index(&rig), Some(1));
}

#[test]
fn unresolved_entry_times_out() {
    let config = biomark::config::SystemConfig {
        attendance_entry_timeout_secs: 2,
        ..test_config()
    };
    let mut rig = Rig::with_config(config, MockHardware::new());
    open_session(&mut rig);
    scan(&mut rig, 3);

    // 500 ms per tick: three ticks stay under the limit.
    rig.ticks(3);
    assert_eq!(index(&rig), Some(0));

    rig.tick();
    assert_eq!(index(&rig), Some(1));
    assert_eq!(
        rig.store.at("Attendance_Record/Students/Student0/Status"),
        Some(&json!("Timeout"))
    );
    assert!(rig.hw.showed("Timed Out"));
}

#[test]
fn zero_timeout_waits_forever() {
    let config = biomark::config::SystemConfig {
        attendance_entry_timeout_secs: 0,
        ..test_config()
    };
    let mut rig = Rig::with_config(config, MockHardware::new());
    open_session(&mut rig);
    scan(&mut rig, 3);

    rig.ticks(400);

    assert_eq!(index(&rig), Some(0));
    assert_eq!(
        rig.store.at("Attendance_Record/Students/Student0/Status"),
        Some(&json!("pending"))
    );
}

#[test]
fn failed_entry_write_retries_same_index() {
    let mut rig = Rig::new(MockHardware::new());
    open_session(&mut rig);

    rig.hw.fingers(1);
    rig.tick();
    rig.store.fail_writes = 1;
    rig.tick();

    assert!(rig.hw.showed("Firebase"));
    assert!(matches!(
        rig.app.workflows().attendance.state(),
        AttendanceState::WaitFinger(s) if s.index == 0
    ));
    assert_eq!(rig.store.at("Attendance_Record/Students/Student0"), None);

    scan(&mut rig, 3);
    assert_eq!(index(&rig), Some(0));
}

#[test]
fn cancel_stamps_end_time_and_keeps_entries() {
    let mut rig = Rig::new(MockHardware::new());
    open_session(&mut rig);
    scan(&mut rig, 3);
    rig.store.put(
        "Attendance_Record/Students/Student0/Status",
        json!("Success"),
    );
    rig.tick();
    let entry = rig
        .store
        .at("Attendance_Record/Students/Student0")
        .cloned();

    rig.cancel();
    rig.tick();

    assert!(!rig.app.is_busy());
    let start = rig.store.at("Attendance_Record/Start_Time").cloned();
    let end = rig.store.at("Attendance_Record/End_Time").and_then(|v| v.as_u64());
    assert!(end.unwrap() >= start.and_then(|v| v.as_u64()).unwrap());
    assert_ne!(end, Some(0));
    assert_eq!(
        rig.store.at("Attendance_Record/Students/Student0").cloned(),
        entry
    );
    assert_eq!(rig.status(), Some("idle"));
    assert!(rig.sink.events.contains(&AppEvent::WorkflowFinished {
        workflow: WorkflowKind::Attendance,
        outcome: Outcome::Cancelled,
        slot: None,
    }));
}

#[test]
fn cancel_before_open_writes_no_end_time() {
    let mut rig = Rig::new(MockHardware::new());
    rig.post("attendance", json!({ "Class": "BSCS" }));
    rig.cancel();

    rig.run_to_idle(5);

    assert_eq!(rig.store.at("Attendance_Record"), None);
    assert!(rig.hw.showed("Stopped"));
}
