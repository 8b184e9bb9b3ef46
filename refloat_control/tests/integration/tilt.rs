//! Integration test: tilt contributors shift the balance setpoint.

use refloat_common::ride::config::RefloatConfig;
use refloat_control::controller::{RideController, TickEvents};
use refloat_control::host::RemoteSample;
use refloat_control::host::sim::SimulatedHost;

use super::{config, rig_with, run, step_on};

/// Engaged at 5000 ERPM pulling `current`.
fn riding(cfg: RefloatConfig, current: f32) -> (RideController, SimulatedHost) {
    let (mut c, mut host) = rig_with(cfg);
    let m = &mut host.frame.motor;
    m.erpm = 5000.0;
    m.duty_cycle = 0.3;
    m.current = current;
    m.dir_current = current;
    c.tick(&mut host);
    step_on(&mut host);
    assert!(c.tick(&mut host).events.contains(TickEvents::ENGAGED));
    (c, host)
}

#[test]
fn stock_config_keeps_setpoint_level() {
    let (mut c, mut host) = riding(config(), 35.0);
    run(&mut c, &mut host, 2000);
    assert_eq!(c.setpoint().setpoint, 0.0);
}

#[test]
fn torque_tilt_lifts_setpoint_under_load() {
    let mut cfg = config();
    cfg.torque_tilt.strength = 0.2;
    let (mut c, mut host) = riding(cfg, 35.0);
    run(&mut c, &mut host, 2000);
    // (35 A - 15 A) * 0.2 deg/A
    let sp = c.setpoint();
    assert!(sp.torque_tilt.setpoint > 3.5, "{}", sp.torque_tilt.setpoint);
    assert!((sp.setpoint - sp.torque_tilt.setpoint).abs() < 1e-4);
}

#[test]
fn remote_throttle_tilts_setpoint() {
    let mut cfg = config();
    cfg.input_tilt.enabled = true;
    let (mut c, mut host) = riding(cfg, 10.0);
    host.frame.remote = Some(RemoteSample {
        input: 0.5,
        age: 0.1,
    });
    run(&mut c, &mut host, 2000);
    assert!((c.setpoint().setpoint - 5.0).abs() < 1e-2);

    // A stale remote drops back to level.
    host.frame.remote = Some(RemoteSample {
        input: 0.5,
        age: 2.0,
    });
    run(&mut c, &mut host, 4000);
    assert!(c.setpoint().setpoint.abs() < 1e-2);
}

#[test]
fn booster_adds_current_past_its_angle() {
    let mut cfg = config();
    cfg.booster.accel.current = 20.0;
    cfg.booster.accel.angle = 2.0;
    cfg.booster.accel.ramp = 1.0;
    let (mut c, mut host) = riding(cfg, 10.0);
    // Nose down 4 degrees, well past the booster angle.
    host.frame.imu.pitch = -4.0;
    let plain = {
        let (mut c2, mut host2) = riding(config(), 10.0);
        host2.frame.imu.pitch = -4.0;
        run(&mut c2, &mut host2, 1000);
        c2.pid().balance_current
    };
    run(&mut c, &mut host, 1000);
    assert!(c.pid().balance_current > plain + 15.0);
}
