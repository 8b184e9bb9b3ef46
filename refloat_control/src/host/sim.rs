//! Simulated host for tests and the host-side runner.
//!
//! Sensor values come from a mutable [`SensorFrame`], optionally driven by a
//! script called before every sample. A crude wheel model turns commanded
//! current into ERPM so scripted rides produce plausible telemetry. Every
//! motor command is recorded until the next sample.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use refloat_common::consts::SYSTEM_TICK_RATE_HZ;

use super::{MotorDriver, SensorFrame, VescHost};
use crate::time::Ticks;

/// One recorded motor command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    Current(f32),
    Duty(f32),
    BrakeCurrent(f32),
}

/// Counters over the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandTotals {
    pub current: u64,
    pub zero_current: u64,
    pub duty: u64,
    pub brake: u64,
    pub timeout_resets: u64,
    pub tones: u64,
}

/// Scripted sensor source: `(sample_index, frame)`.
pub type SimScript = fn(u64, &mut SensorFrame);

/// In-process host used by tests, benches and the runner binary.
pub struct SimulatedHost {
    /// Sensor values returned by the next `sample()`.
    pub frame: SensorFrame,
    /// Enables the wheel model.
    pub wheel_model: bool,
    script: Option<SimScript>,
    now: Ticks,
    ticks_per_sample: Ticks,
    samples: u64,
    commands: Vec<MotorCommand>,
    totals: CommandTotals,
    sent: Vec<Vec<u8>>,
    tot_current_filtered: f32,
    terminate: Arc<AtomicBool>,
}

impl SimulatedHost {
    /// Host sampled at `hertz`, with the IMU already settled.
    pub fn new(hertz: u16) -> Self {
        let mut frame = SensorFrame::default();
        frame.imu.startup_done = true;
        frame.motor.batt_voltage = 63.0;
        frame.motor.mosfet_temp = 30.0;
        frame.motor.motor_temp = 30.0;
        Self {
            frame,
            wheel_model: false,
            script: None,
            now: 0,
            ticks_per_sample: (SYSTEM_TICK_RATE_HZ / hertz.max(1) as u32).max(1),
            samples: 0,
            commands: Vec::new(),
            totals: CommandTotals::default(),
            sent: Vec::new(),
            tot_current_filtered: 0.0,
            terminate: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Drive the frame from `script` before every sample.
    pub fn with_script(mut self, script: SimScript) -> Self {
        self.script = Some(script);
        self
    }

    /// Shared shutdown flag (e.g. for a signal handler).
    pub fn terminate_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.terminate)
    }

    /// Advance the tick counter without sampling.
    pub fn advance_seconds(&mut self, seconds: f32) {
        let ticks = (seconds * SYSTEM_TICK_RATE_HZ as f32) as Ticks;
        self.now = self.now.wrapping_add(ticks);
    }

    /// Commands issued since the last sample.
    pub fn commands(&self) -> &[MotorCommand] {
        &self.commands
    }

    pub fn totals(&self) -> CommandTotals {
        self.totals
    }

    /// App-data packets sent so far.
    pub fn sent(&self) -> &[Vec<u8>] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.sent)
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    fn record(&mut self, cmd: MotorCommand) {
        self.commands.push(cmd);
        match cmd {
            MotorCommand::Current(c) => {
                self.totals.current += 1;
                if c == 0.0 {
                    self.totals.zero_current += 1;
                }
                self.apply_wheel_model(c);
            }
            MotorCommand::Duty(d) => {
                self.totals.duty += 1;
                if self.wheel_model {
                    self.frame.motor.duty_cycle = d;
                    self.frame.motor.erpm = d * 40_000.0;
                }
            }
            MotorCommand::BrakeCurrent(_) => {
                self.totals.brake += 1;
                self.apply_wheel_model(0.0);
            }
        }
    }

    fn apply_wheel_model(&mut self, current: f32) {
        self.tot_current_filtered = 0.9 * self.tot_current_filtered + 0.1 * current;
        if !self.wheel_model {
            return;
        }
        let m = &mut self.frame.motor;
        m.erpm = (m.erpm + current * 2.0 - m.erpm * 0.001).clamp(-40_000.0, 40_000.0);
        m.duty_cycle = m.erpm / 40_000.0;
        m.current = current;
        m.dir_current = if m.erpm < 0.0 { -current } else { current };
        m.batt_current = current * m.duty_cycle.abs();
        m.speed = m.erpm / 1500.0;
    }
}

impl MotorDriver for SimulatedHost {
    fn set_current(&mut self, current: f32) {
        self.record(MotorCommand::Current(current));
    }

    fn set_current_off_delay(&mut self, _delay: f32) {}

    fn set_duty(&mut self, duty: f32) {
        self.record(MotorCommand::Duty(duty));
    }

    fn set_brake_current(&mut self, current: f32) {
        self.record(MotorCommand::BrakeCurrent(current));
    }

    fn timeout_reset(&mut self) {
        self.totals.timeout_resets += 1;
    }

    fn foc_play_tone(&mut self, _channel: u8, _frequency: f32, voltage: f32) {
        if voltage > 0.0 {
            self.totals.tones += 1;
        }
    }

    fn tot_current_directional_filtered(&self) -> f32 {
        self.tot_current_filtered
    }
}

impl VescHost for SimulatedHost {
    fn system_time_ticks(&self) -> Ticks {
        self.now
    }

    fn sample(&mut self) -> SensorFrame {
        self.now = self.now.wrapping_add(self.ticks_per_sample);
        if let Some(script) = self.script {
            script(self.samples, &mut self.frame);
        }
        self.samples += 1;
        self.commands.clear();
        self.frame
    }

    fn send_app_data(&mut self, data: &[u8]) {
        self.sent.push(data.to_vec());
    }

    fn should_terminate(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }
}

/// Demo ride at 800 Hz: settle, step on, accelerate, cruise, step off.
pub fn demo_ride_script(sample: u64, frame: &mut SensorFrame) {
    const HZ: u64 = 800;
    let t = sample as f32 / HZ as f32;
    let imu = &mut frame.imu;
    imu.startup_done = sample > HZ / 2;
    // Nose lifted to level over the first second.
    imu.pitch = if t < 1.0 { 10.0 * (1.0 - t) } else { 0.5 * (t * 3.0).sin() };
    imu.balance_pitch = imu.pitch;
    imu.roll = 1.0;
    // Slow S-curve.
    imu.yaw = 30.0 * (t * 0.5).sin();
    let on_board = (1.0..8.0).contains(&t);
    frame.footpad.adc1 = if on_board { 3.0 } else { 0.2 };
    frame.footpad.adc2 = if on_board { 3.0 } else { 0.2 };
}
