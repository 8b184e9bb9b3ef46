//! Shared rig for the integration tests.

mod alerts;
mod charging;
mod disable;
mod recorder;
mod ride_cycle;
mod surge;
mod tilt;

use refloat_common::ride::config::RefloatConfig;
use refloat_control::controller::{RideController, TickEvents, TickReport};
use refloat_control::host::VescHost;
use refloat_control::host::sim::SimulatedHost;

pub const HZ: u16 = 1000;

pub fn config() -> RefloatConfig {
    RefloatConfig {
        hertz: HZ,
        ..RefloatConfig::default()
    }
}

pub fn rig_with(cfg: RefloatConfig) -> (RideController, SimulatedHost) {
    let host = SimulatedHost::new(cfg.hertz);
    let controller = RideController::new(&cfg, host.system_time_ticks());
    (controller, host)
}

/// Controller already out of startup.
pub fn ready_rig() -> (RideController, SimulatedHost) {
    let (mut c, mut host) = rig_with(config());
    c.tick(&mut host);
    (c, host)
}

pub fn step_on(host: &mut SimulatedHost) {
    host.frame.footpad.adc1 = 3.0;
    host.frame.footpad.adc2 = 3.0;
}

pub fn step_off(host: &mut SimulatedHost) {
    host.frame.footpad.adc1 = 0.0;
    host.frame.footpad.adc2 = 0.0;
}

/// Run `ticks` ticks and merge the events.
pub fn run(c: &mut RideController, host: &mut SimulatedHost, ticks: usize) -> TickEvents {
    let mut events = TickEvents::empty();
    for _ in 0..ticks {
        events |= c.tick(host).events;
    }
    events
}

/// Tick until `pred` holds for a report, at most `max` ticks.
pub fn run_until(
    c: &mut RideController,
    host: &mut SimulatedHost,
    max: usize,
    mut pred: impl FnMut(&TickReport) -> bool,
) -> Option<TickReport> {
    (0..max).map(|_| c.tick(host)).find(|r| pred(r))
}
