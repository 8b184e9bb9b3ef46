//! Integration test: charger reports arriving through the command inbox.

use refloat_common::ride::state::{CompatStatus, RunState};
use refloat_control::controller::TickEvents;
use refloat_control::host::inbox::CommandError;

use super::{ready_rig, run, step_on};

/// `[101, 28, 151, charging, voltage*10 (i16 BE), current*10 (i16 BE)]`.
fn report(charging: bool, voltage: f32, current: f32) -> Vec<u8> {
    let mut raw = vec![101, 28, 151, charging as u8];
    raw.extend_from_slice(&((voltage * 10.0).round() as i16).to_be_bytes());
    raw.extend_from_slice(&((current * 10.0).round() as i16).to_be_bytes());
    raw
}

#[test]
fn charging_blocks_engage_until_report_times_out() {
    let (mut c, mut host) = ready_rig();
    let inbox = c.inbox();
    inbox.submit(&report(true, 84.2, 3.5)).unwrap();
    step_on(&mut host);

    let r = c.tick(&mut host);
    assert_eq!(r.status, CompatStatus::Charging);
    assert!((c.charging().voltage - 84.2).abs() < 0.05);
    assert!((c.charging().current - 3.5).abs() < 0.05);

    let events = run(&mut c, &mut host, 1000);
    assert!(!events.contains(TickEvents::ENGAGED));
    assert_eq!(c.state().state, RunState::Ready);

    // Reports keep the flag alive.
    host.advance_seconds(4.0);
    inbox.submit(&report(true, 84.2, 3.5)).unwrap();
    c.tick(&mut host);
    host.advance_seconds(4.0);
    assert_eq!(c.tick(&mut host).status, CompatStatus::Charging);

    host.advance_seconds(1.5);
    assert!(c.tick(&mut host).events.contains(TickEvents::ENGAGED));
    assert!(!c.state().charging);
}

#[test]
fn charger_off_report_clears_immediately() {
    let (mut c, mut host) = ready_rig();
    let inbox = c.inbox();
    inbox.submit(&report(true, 80.0, 2.0)).unwrap();
    c.tick(&mut host);
    assert!(c.state().charging);

    inbox.submit(&report(false, 0.0, 0.0)).unwrap();
    c.tick(&mut host);
    assert!(!c.state().charging);
    assert_eq!(c.charging().voltage, 0.0);
}

#[test]
fn foreign_and_short_payloads_are_ignored() {
    let (mut c, mut host) = ready_rig();
    let inbox = c.inbox();
    inbox.submit(&[101, 28, 150, 1, 0, 0, 0, 0]).unwrap();
    inbox.submit(&[101, 28, 151, 1]).unwrap();
    c.tick(&mut host);
    assert!(!c.state().charging);
}

#[test]
fn malformed_packets_are_rejected_and_counted() {
    let (c, _host) = ready_rig();
    let inbox = c.inbox();
    assert!(matches!(
        inbox.submit(&[102, 28, 151]),
        Err(CommandError::InvalidPackageId(102))
    ));
    assert!(matches!(inbox.submit(&[101]), Err(CommandError::TooShort(1))));
    assert!(matches!(
        inbox.submit(&[101, 99]),
        Err(CommandError::Unsupported(99))
    ));
    assert_eq!(inbox.rejected(), 3);
}
