//! Per-tick motor telemetry derived from the host sample.
//!
//! Raw samples are filtered once here so every consumer in the tick sees the
//! same smoothed values.

use refloat_common::ride::config::CfgMotor;

use super::biquad::Biquad;
use super::filters::{ema, sign};
use crate::host::MotorSample;

/// Samples in the acceleration moving average.
pub const ACCEL_HISTORY_SIZE: usize = 40;

/// Time for the soft erpm sign to swing fully from one side to the other [s].
const ERPM_SIGN_SWING_S: f32 = 0.9984;

/// Derived motor state for the current tick.
#[derive(Debug, Clone)]
pub struct MotorData {
    pub erpm: f32,
    pub abs_erpm: f32,
    /// |erpm| low-passed with 0.9/0.1 weights.
    pub abs_erpm_smooth: f32,
    /// -1, 0 or 1.
    pub erpm_sign: f32,
    /// Direction that follows `erpm_sign` with roughly one second of delay.
    pub erpm_sign_soft: f32,
    erpm_sign_factor: f32,
    last_erpm: f32,

    /// Mean per-tick erpm change over the last [`ACCEL_HISTORY_SIZE`] ticks.
    pub acceleration: f32,
    accel_history: [f32; ACCEL_HISTORY_SIZE],
    accel_idx: usize,

    /// Ground speed [km/h].
    pub speed: f32,
    pub current: f32,
    pub dir_current: f32,
    /// `dir_current` through the optional low-pass, else equal to it.
    pub filt_current: f32,
    current_filter: Option<Biquad>,
    pub braking: bool,
    /// |duty| as sampled.
    pub duty_raw: f32,
    /// |duty| smoothed.
    pub duty_cycle: f32,
    pub batt_current: f32,
    pub batt_voltage: f32,
    pub mosfet_temp: f32,
    pub motor_temp: f32,

    /// Current limits [A], positive. Handtest and flywheel lower them at runtime.
    pub current_max: f32,
    pub current_min: f32,
    pub battery_current_max: f32,
    pub battery_current_min: f32,
}

impl MotorData {
    pub fn new(cfg: &CfgMotor, hertz: u16) -> Self {
        let mut m = Self {
            erpm: 0.0,
            abs_erpm: 0.0,
            abs_erpm_smooth: 0.0,
            erpm_sign: 0.0,
            erpm_sign_soft: 0.0,
            erpm_sign_factor: 0.0,
            last_erpm: 0.0,
            acceleration: 0.0,
            accel_history: [0.0; ACCEL_HISTORY_SIZE],
            accel_idx: 0,
            speed: 0.0,
            current: 0.0,
            dir_current: 0.0,
            filt_current: 0.0,
            current_filter: None,
            braking: false,
            duty_raw: 0.0,
            duty_cycle: 0.0,
            batt_current: 0.0,
            batt_voltage: 0.0,
            mosfet_temp: 0.0,
            motor_temp: 0.0,
            current_max: 0.0,
            current_min: 0.0,
            battery_current_max: 0.0,
            battery_current_min: 0.0,
        };
        m.configure(cfg, hertz);
        m
    }

    /// Take over limits from the config and rescale per-tick factors.
    pub fn configure(&mut self, cfg: &CfgMotor, hertz: u16) {
        self.current_max = cfg.current_max.abs();
        self.current_min = cfg.current_min.abs();
        self.battery_current_max = cfg.battery_current_max.abs();
        self.battery_current_min = cfg.battery_current_min.abs();
        self.erpm_sign_factor = ERPM_SIGN_SWING_S / hertz.max(1) as f32;
        self.current_filter = (cfg.current_filter > 0.0)
            .then(|| Biquad::lowpass(cfg.current_filter / hertz.max(1) as f32));
    }

    /// Clear filter state on engage.
    pub fn reset(&mut self) {
        self.abs_erpm_smooth = 0.0;
        self.duty_raw = 0.0;
        self.erpm_sign_soft = 0.0;
        self.acceleration = 0.0;
        self.accel_history = [0.0; ACCEL_HISTORY_SIZE];
        self.accel_idx = 0;
        if let Some(filter) = self.current_filter.as_mut() {
            filter.reset();
        }
    }

    pub fn update(&mut self, s: &MotorSample) {
        self.erpm = s.erpm;
        self.abs_erpm = s.erpm.abs();
        self.abs_erpm_smooth = self.abs_erpm_smooth * 0.9 + self.abs_erpm * 0.1;
        self.erpm_sign = sign(s.erpm);
        self.erpm_sign_soft =
            (self.erpm_sign_soft + self.erpm_sign_factor * self.erpm_sign).clamp(-1.0, 1.0);

        self.speed = s.speed * 3.6;

        self.current = s.current;
        self.dir_current = s.dir_current;
        self.braking = self.current < 0.0;

        self.duty_raw = s.duty_cycle.abs();
        self.duty_cycle = ema(self.duty_cycle, self.duty_raw, 0.01);

        let accel = self.erpm - self.last_erpm;
        self.last_erpm = self.erpm;
        self.acceleration +=
            (accel - self.accel_history[self.accel_idx]) / ACCEL_HISTORY_SIZE as f32;
        self.accel_history[self.accel_idx] = accel;
        self.accel_idx = (self.accel_idx + 1) % ACCEL_HISTORY_SIZE;

        self.filt_current = match self.current_filter.as_mut() {
            Some(filter) => filter.process(self.dir_current),
            None => self.dir_current,
        };

        self.batt_current = ema(self.batt_current, s.batt_current, 0.01);
        self.batt_voltage = s.batt_voltage;
        self.mosfet_temp = s.mosfet_temp;
        self.motor_temp = s.motor_temp;
    }

    /// Fraction of the applicable motor or battery current limit in use,
    /// whichever is higher.
    pub fn current_saturation(&self) -> f32 {
        let motor_limit = if self.braking {
            self.current_min
        } else {
            self.current_max
        };
        let battery_limit = if self.batt_current < 0.0 {
            self.battery_current_min
        } else {
            self.battery_current_max
        };
        let motor = self.filt_current.abs() / motor_limit;
        let battery = self.batt_current / battery_limit;
        motor.max(battery)
    }

    /// True while the instantaneous and delayed directions agree.
    #[inline]
    pub fn erpm_sign_check(&self) -> bool {
        self.erpm_sign == sign(self.erpm_sign_soft)
    }
}
