//! Boot, provisioning, liveness and envelope reset.

use biomark::app::events::AppEvent;
use biomark::channel::{CommandChannel, CommandStatus, CommandType};
use serde_json::json;

use crate::mock_hw::{BOOT_UNIX, MockHardware, MockStore, NoopDelay, ROOT, Rig, SensorCall};

#[test]
fn boot_scan_seeds_free_list() {
    let rig = Rig::new(MockHardware::with_occupied(&[0, 1, 3]));
    assert_eq!(rig.app.slots().free_ids(), &[4, 2]);
    assert!(
        rig.sink
            .events
            .contains(&AppEvent::Started { free_slots: 7 })
    );
    assert!(rig.hw.showed("DB Scan Complete!"));
}

#[test]
fn empty_library_starts_at_zero() {
    let rig = Rig::new(MockHardware::new());
    assert_eq!(rig.app.slots().free_ids(), &[0]);
}

#[test]
fn provisioning_writes_idle_node() {
    let rig = Rig::new(MockHardware::new());
    assert_eq!(
        rig.store.at("Command"),
        Some(&json!({
            "Type": "none",
            "Status": "idle",
            "Cancelled": false,
            "Data": {},
            "Result": "none",
        }))
    );
    assert_eq!(rig.store.at("Status"), Some(&json!("offline")));
    assert_eq!(rig.store.at("Last_Seen"), Some(&json!(0)));
}

#[test]
fn heartbeat_writes_last_seen_on_interval() {
    let mut rig = Rig::new(MockHardware::new());
    rig.tick();
    assert_eq!(rig.store.at("Last_Seen"), Some(&json!(BOOT_UNIX)));

    // 20 s default interval at 500 ms per tick.
    rig.ticks(39);
    assert_eq!(rig.store.at("Last_Seen"), Some(&json!(BOOT_UNIX)));
    rig.tick();
    assert_eq!(rig.store.at("Last_Seen"), Some(&json!(BOOT_UNIX + 20)));

    let beats = rig
        .sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::Heartbeat { .. }))
        .count();
    assert_eq!(beats, 2);
}

#[test]
fn heartbeat_waits_for_clock_sync() {
    let mut rig = Rig::new(MockHardware::new());
    rig.clock.unsync();

    rig.ticks(50);

    assert_eq!(rig.store.at("Last_Seen"), Some(&json!(0)));
    assert!(!rig.store.wrote("Last_Seen"));
}

#[test]
fn reset_twice_is_harmless() {
    let mut store = MockStore::new();
    let mut delay = NoopDelay::default();
    {
        let mut ch = CommandChannel::new(&mut store, &mut delay, ROOT);
        ch.provision().unwrap();
        ch.reset_to_idle().unwrap();
        ch.reset_to_idle().unwrap();
        assert_eq!(ch.peek_status(), Ok(CommandStatus::Idle));
        assert_eq!(ch.peek_type(), Ok(CommandType::None));
        assert_eq!(ch.peek_cancelled(), Ok(false));
    }
    assert_eq!(delay.waits, 0);
}

#[test]
fn reset_leaves_command_result_alone() {
    let mut store = MockStore::new();
    store.put("Command/Result", json!("Data_Not_Found"));
    let mut delay = NoopDelay::default();
    let mut ch = CommandChannel::new(&mut store, &mut delay, ROOT);

    ch.reset_to_idle().unwrap();

    assert_eq!(ch.peek_result().unwrap(), "Data_Not_Found");
}

#[test]
fn wipe_templates_empties_sensor_and_pool() {
    let mut rig = Rig::new(MockHardware::with_occupied(&[0, 1, 2]));
    rig.app.wipe_templates(&mut rig.hw).unwrap();
    assert_eq!(rig.hw.count(SensorCall::EraseAll), 1);
    assert!(rig.hw.occupied.is_empty());
    assert_eq!(rig.app.slots().free_ids(), &[0]);
}

#[test]
fn tick_counter_advances() {
    let mut rig = Rig::new(MockHardware::new());
    rig.ticks(4);
    assert_eq!(rig.app.tick_count(), 4);
}
