//! Integration test: surge takes over from the balance loop under high current.

use refloat_common::ride::config::RefloatConfig;
use refloat_control::control::surge::SurgeExit;
use refloat_control::controller::{RideController, TickEvents};
use refloat_control::host::MotorDriver;
use refloat_control::host::sim::{MotorCommand, SimulatedHost};

use super::{config, rig_with, run, run_until, step_on};

fn surge_config() -> RefloatConfig {
    let mut cfg = config();
    cfg.surge.enabled = true;
    cfg
}

/// Riding forward at 5000 ERPM pulling `current`.
fn cruising(cfg: RefloatConfig, current: f32) -> (RideController, SimulatedHost) {
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
fn high_current_starts_duty_surge_that_times_out() {
    let (mut c, mut host) = cruising(surge_config(), 60.0);

    let started = run_until(&mut c, &mut host, 50, |r| {
        r.events.contains(TickEvents::SURGE_STARTED)
    });
    assert!(started.is_some());
    assert!(c.surge().active);
    assert!(matches!(host.commands(), [MotorCommand::Duty(d)] if *d > 0.0));

    // Duty ramps up while active.
    let first = c.surge().new_duty_cycle;
    run(&mut c, &mut host, 100);
    assert!(c.surge().new_duty_cycle > first);

    let ended = run_until(&mut c, &mut host, 500, |r| r.surge_exit.is_some());
    assert_eq!(ended.and_then(|r| r.surge_exit), Some(SurgeExit::Timeout));
    assert!(ended.is_some_and(|r| r.events.contains(TickEvents::SURGE_ENDED)));
    assert!(matches!(host.commands(), [MotorCommand::Current(_)]));
}

#[test]
fn nose_lift_ends_surge() {
    let (mut c, mut host) = cruising(surge_config(), 60.0);
    run_until(&mut c, &mut host, 50, |r| {
        r.events.contains(TickEvents::SURGE_STARTED)
    })
    .unwrap();

    host.frame.imu.pitch = 3.0;
    let r = c.tick(&mut host);
    assert_eq!(r.surge_exit, Some(SurgeExit::MaxAngle));
    assert!(!c.surge().active);
}

#[test]
fn braking_ends_surge() {
    let (mut c, mut host) = cruising(surge_config(), 60.0);
    run_until(&mut c, &mut host, 50, |r| {
        r.events.contains(TickEvents::SURGE_STARTED)
    })
    .unwrap();

    host.frame.motor.current = -20.0;
    let r = c.tick(&mut host);
    assert_eq!(r.surge_exit, Some(SurgeExit::Braking));
    assert!(r.events.contains(TickEvents::SURGE_ENDED));
    assert!(!c.surge().active);
    assert!(matches!(host.commands(), [MotorCommand::Current(_)]));
}

#[test]
fn surge_exit_primes_integral_with_host_current() {
    let mut cfg = surge_config();
    cfg.pid.ki = 0.0;
    let (mut c, mut host) = cruising(cfg, 30.0);

    // Nose slightly down: the balance loop drives forward and the host's
    // filtered current builds up.
    host.frame.imu.balance_pitch = -0.5;
    run(&mut c, &mut host, 200);

    let m = &mut host.frame.motor;
    m.current = 60.0;
    m.dir_current = 60.0;
    run_until(&mut c, &mut host, 50, |r| {
        r.events.contains(TickEvents::SURGE_STARTED)
    })
    .unwrap();

    // Duty commands leave the host's current filter untouched.
    let handed_back = host.tot_current_directional_filtered();
    assert!(handed_back > 1.0, "{handed_back}");

    host.frame.motor.current = -20.0;
    let r = c.tick(&mut host);
    assert!(r.events.contains(TickEvents::SURGE_ENDED));
    assert_eq!(c.pid().i, handed_back);
}

#[test]
fn disabled_surge_keeps_balance_loop() {
    let (mut c, mut host) = cruising(config(), 60.0);
    let duty_before = host.totals().duty;
    let events = run(&mut c, &mut host, 300);
    assert!(!events.contains(TickEvents::SURGE_STARTED));
    assert_eq!(host.totals().duty, duty_before);
}

#[test]
fn moderate_current_does_not_surge() {
    let (mut c, mut host) = cruising(surge_config(), 30.0);
    let events = run(&mut c, &mut host, 300);
    assert!(!events.intersects(TickEvents::SURGE_STARTED | TickEvents::HIGH_CURRENT));
}
