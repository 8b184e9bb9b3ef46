//! Integration test: BMS faults and firmware faults raised as alerts.

use refloat_common::ride::error::AlertId;
use refloat_common::ride::state::RunState;
use refloat_control::controller::TickEvents;
use refloat_control::host::BmsSample;

use super::{config, rig_with, run, step_on};

fn healthy() -> BmsSample {
    BmsSample {
        cell_lv: 3.70,
        cell_hv: 3.75,
        cell_lt: 20,
        cell_ht: 25,
        bms_ht: 30,
        msg_age: 0.1,
    }
}

fn bms_rig() -> (
    refloat_control::controller::RideController,
    refloat_control::host::sim::SimulatedHost,
) {
    let mut cfg = config();
    cfg.bms.enabled = true;
    let (c, mut host) = rig_with(cfg);
    host.frame.bms = Some(healthy());
    (c, host)
}

#[test]
fn healthy_pack_raises_nothing() {
    let (mut c, mut host) = bms_rig();
    run(&mut c, &mut host, 100);
    assert!(c.alerts().active_mask().is_empty());
    assert_eq!(c.alerts().history_len(), 0);
}

#[test]
fn low_cell_raises_and_clears_error_alerts() {
    let (mut c, mut host) = bms_rig();
    c.tick(&mut host);

    host.frame.bms = Some(BmsSample {
        cell_lv: 2.5,
        ..healthy()
    });
    run(&mut c, &mut host, 10);
    assert!(c.alerts().is_alert_active(AlertId::BmsCellUnderVoltage));
    assert!(c.alerts().is_alert_active(AlertId::BmsCellBalance));
    assert!(!c.alerts().fatal_error());
    // One history entry per activation, not per tick.
    assert_eq!(c.alerts().history_len(), 2);

    // Error alerts do not block riding.
    step_on(&mut host);
    assert!(c.tick(&mut host).events.contains(TickEvents::ENGAGED));

    host.frame.bms = Some(healthy());
    c.tick(&mut host);
    assert!(c.alerts().active_mask().is_empty());
    assert_eq!(c.alerts().history_len(), 4);
    assert_eq!(c.state().state, RunState::Running);
}

#[test]
fn stale_bms_is_a_connection_fault_after_grace() {
    let (mut c, mut host) = bms_rig();
    host.frame.bms = Some(BmsSample {
        msg_age: 10.0,
        ..healthy()
    });
    c.tick(&mut host);
    assert!(!c.alerts().is_alert_active(AlertId::BmsConnection));

    host.advance_seconds(6.0);
    c.tick(&mut host);
    assert!(c.alerts().is_alert_active(AlertId::BmsConnection));
    assert!(!c.alerts().is_alert_active(AlertId::BmsCellUnderVoltage));
}

#[test]
fn firmware_fault_latch_follows_persistence_setting() {
    let mut cfg = config();
    cfg.persistent_fatal_error = false;
    let (mut c, mut host) = rig_with(cfg);
    host.frame.fw_fault_code = 4;
    c.tick(&mut host);
    assert!(c.alerts().fatal_error());
    assert_eq!(c.alerts().fw_fault_code(), 4);

    host.frame.fw_fault_code = 0;
    c.tick(&mut host);
    assert!(!c.alerts().fatal_error());
    assert_eq!(c.alerts().fw_fault_code(), 0);

    let (mut c, mut host) = rig_with(config());
    host.frame.fw_fault_code = 4;
    c.tick(&mut host);
    host.frame.fw_fault_code = 0;
    run(&mut c, &mut host, 10);
    assert!(c.alerts().fatal_error());
    c.clear_fatal();
    assert!(!c.alerts().fatal_error());
}

#[test]
fn new_firmware_fault_code_is_a_new_activation() {
    let (mut c, mut host) = rig_with(config());
    host.frame.fw_fault_code = 4;
    run(&mut c, &mut host, 3);
    host.frame.fw_fault_code = 9;
    run(&mut c, &mut host, 3);
    assert_eq!(c.alerts().history_len(), 2);
    assert_eq!(c.alerts().fw_fault_code(), 9);
}
