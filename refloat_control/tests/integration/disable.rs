//! Integration test: a disabled package never drives the motor.

use refloat_common::ride::state::{CompatStatus, RunState};
use refloat_control::host::sim::MotorCommand;

use super::{config, rig_with, run, step_on};

#[test]
fn disabled_board_releases_motor_once_and_never_engages() {
    let mut cfg = config();
    cfg.disabled = true;
    let (mut c, mut host) = rig_with(cfg);
    step_on(&mut host);

    let r = c.tick(&mut host);
    assert_eq!(r.status, CompatStatus::Disabled);
    assert_eq!(host.commands(), &[MotorCommand::Current(0.0)]);

    let events = run(&mut c, &mut host, 500);
    assert!(events.is_empty());
    assert_eq!(c.state().state, RunState::Disabled);

    let totals = host.totals();
    assert_eq!(totals.current, 1);
    assert_eq!(totals.zero_current, 1);
    assert_eq!(totals.duty + totals.brake + totals.timeout_resets, 0);
}

#[test]
fn disabled_board_ignores_handtest() {
    let mut cfg = config();
    cfg.disabled = true;
    let (mut c, mut host) = rig_with(cfg);
    c.inbox().submit(&[101, 13, 1]).unwrap();
    c.tick(&mut host);
    assert_eq!(c.state().mode, refloat_common::ride::state::Mode::Normal);
}
