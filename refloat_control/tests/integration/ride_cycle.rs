//! Integration test: engage, ride and disengage through the full tick.

use refloat_common::ride::config::RefloatConfig;
use refloat_common::ride::state::{CompatStatus, RunState, StopCondition};
use refloat_control::controller::TickEvents;
use refloat_control::host::sim::{MotorCommand, SimulatedHost, demo_ride_script};
use refloat_control::controller::RideController;
use refloat_control::host::VescHost;

use super::{config, ready_rig, rig_with, run, run_until, step_off, step_on};

#[test]
fn demo_ride_engages_once_and_stops_on_step_off() {
    let cfg = RefloatConfig::default();
    let mut host = SimulatedHost::new(cfg.hertz).with_script(demo_ride_script);
    host.wheel_model = true;
    let mut c = RideController::new(&cfg, host.system_time_ticks());

    let mut engages = 0;
    let mut disengages = 0;
    for _ in 0..10 * cfg.hertz as usize {
        let r = c.tick(&mut host);
        engages += r.events.contains(TickEvents::ENGAGED) as u32;
        disengages += r.events.contains(TickEvents::DISENGAGED) as u32;
    }

    assert_eq!(engages, 1);
    assert_eq!(disengages, 1);
    assert_eq!(c.state().state, RunState::Ready);
    assert_eq!(c.state().stop_condition, StopCondition::SwitchFull);
    // Recording ran for the whole ride, longer than the ring holds.
    assert_eq!(c.recorder().len(), cfg.recorder.capacity);
    assert!(!c.recorder().is_recording());
}

#[test]
fn exactly_one_motor_command_per_tick() {
    let (mut c, mut host) = ready_rig();
    step_on(&mut host);
    for _ in 0..200 {
        c.tick(&mut host);
        assert_eq!(host.commands().len(), 1);
    }
    step_off(&mut host);
    for _ in 0..200 {
        c.tick(&mut host);
        assert_eq!(host.commands().len(), 1);
    }
    assert_eq!(c.state().state, RunState::Ready);
}

#[test]
fn quickstop_on_nose_drop_at_standstill() {
    let (mut c, mut host) = ready_rig();
    step_on(&mut host);
    c.tick(&mut host);
    assert_eq!(c.state().state, RunState::Running);

    step_off(&mut host);
    host.frame.imu.pitch = 20.0;
    let r = c.tick(&mut host);
    assert!(r.events.contains(TickEvents::DISENGAGED));
    assert_eq!(c.state().stop_condition, StopCondition::Quickstop);
    assert_eq!(c.tick(&mut host).status, CompatStatus::FaultQuickstop);
}

#[test]
fn roll_fault_after_delay() {
    let (mut c, mut host) = ready_rig();
    step_on(&mut host);
    c.tick(&mut host);

    host.frame.imu.roll = 70.0;
    let events = run(&mut c, &mut host, 200);
    assert!(!events.contains(TickEvents::DISENGAGED));

    let r = run_until(&mut c, &mut host, 200, |r| {
        r.events.contains(TickEvents::DISENGAGED)
    });
    assert!(r.is_some());
    assert_eq!(c.state().stop_condition, StopCondition::Roll);

    // Still rolled over: no re-engage.
    run(&mut c, &mut host, 50);
    assert_eq!(c.state().state, RunState::Ready);
}

#[test]
fn simple_start_on_one_half_then_half_switch_fault() {
    let (mut c, mut host) = ready_rig();
    host.frame.footpad.adc1 = 3.0;
    assert!(c.tick(&mut host).events.contains(TickEvents::ENGAGED));

    // One half keeps the ride alive for a second after engaging.
    run(&mut c, &mut host, 900);
    assert_eq!(c.state().state, RunState::Running);

    let r = run_until(&mut c, &mut host, 400, |r| {
        r.events.contains(TickEvents::DISENGAGED)
    });
    assert!(r.is_some());
    assert_eq!(c.state().stop_condition, StopCondition::SwitchHalf);
    assert_eq!(c.tick(&mut host).status, CompatStatus::FaultSwitchHalf);
}

#[test]
fn single_half_does_not_engage_without_simple_start() {
    let mut cfg = config();
    cfg.startup.simple_start_enabled = false;
    let (mut c, mut host) = rig_with(cfg);
    host.frame.footpad.adc2 = 3.0;
    run(&mut c, &mut host, 100);
    assert_eq!(c.state().state, RunState::Ready);

    host.frame.footpad.adc1 = 3.0;
    assert!(c.tick(&mut host).events.contains(TickEvents::ENGAGED));
}

#[test]
fn darkride_reverse_stop() {
    let mut cfg = config();
    cfg.faults.darkride_enabled = true;
    let (mut c, mut host) = rig_with(cfg);
    c.tick(&mut host);
    step_on(&mut host);
    run(&mut c, &mut host, 5);
    assert_eq!(c.state().state, RunState::Running);

    step_off(&mut host);
    host.frame.imu.roll = 170.0;
    let r = c.tick(&mut host);
    assert!(c.state().darkride);
    assert_eq!(r.status, CompatStatus::RunningUpsideDown);

    host.frame.motor.erpm = 2500.0;
    let r = c.tick(&mut host);
    assert!(r.events.contains(TickEvents::DISENGAGED));
    assert_eq!(c.state().stop_condition, StopCondition::ReverseStop);
}

#[test]
fn running_current_follows_balance_pitch() {
    let (mut c, mut host) = ready_rig();
    step_on(&mut host);
    c.tick(&mut host);

    host.frame.imu.balance_pitch = -1.0;
    host.frame.imu.pitch = -1.0;
    run(&mut c, &mut host, 50);
    let forward = match host.commands() {
        [MotorCommand::Current(a)] => *a,
        other => panic!("unexpected commands {other:?}"),
    };
    assert!(forward > 0.0);

    host.frame.imu.balance_pitch = 1.0;
    host.frame.imu.pitch = 1.0;
    run(&mut c, &mut host, 200);
    assert!(c.pid().balance_current < 0.0);
}
