//! Setpoint target selection and interpolation while running.
//!
//! Every tick picks one setpoint adjustment (SAT) and its target angle, then
//! moves the interpolated setpoint towards the target at the speed that
//! belongs to that SAT. Priority, highest first: centering after engage,
//! reverse stop, wheelslip, duty pushback, high voltage, temperature, low
//! voltage.
//!
//! The tilt contributors are added on top of the interpolated setpoint:
//!
//! - remote input tilt, also in darkride
//! - nose angling and turn tilt
//! - torque tilt, combined with ATR plus brake tilt so that matching signs
//!   take the larger of the two instead of stacking
//!
//! During wheelslip the torque-driven contributors only decay.

use refloat_common::ride::config::{CfgTiltback, RefloatConfig};
use refloat_common::ride::state::{Mode, SetpointAdjustmentType};
use tracing::debug;

use super::atr::Atr;
use super::brake_tilt::BrakeTilt;
use super::filters::{rate_limit, sign};
use super::motor_data::MotorData;
use super::pid::Pid;
use super::remote::Remote;
use super::torque_tilt::TorqueTilt;
use super::turn_tilt::TurnTilt;
use crate::host::{ImuSample, RemoteSample};
use crate::state::ride::State;
use crate::time::{Ticks, Time};

/// Accumulated reverse erpm before reverse stop starts tilting.
pub const REVERSE_TOLERANCE: f32 = 20_000.0;
/// Degrees of tilt per accumulated erpm beyond the tolerance.
const REVERSE_ERPM_INCREMENT: f32 = 0.000_08;
/// Reverse stop tilt speed [deg/s].
const REVERSE_STOP_SPEED: f32 = 100.0;
/// Reverse erpm that enters reverse stop.
const REVERSE_STOP_ERPM: f32 = -200.0;

/// Firmware duty limit; wheelslip holds the setpoint near it.
const MAX_DUTY: f32 = 0.95;
const MAX_DUTY_WITH_MARGIN: f32 = MAX_DUTY - 0.05;

/// Duty above which voltage pushback applies.
const VOLTAGE_PUSHBACK_MIN_DUTY: f32 = 0.05;

#[derive(Debug, Clone)]
pub struct Setpoint {
    tiltback: CfgTiltback,
    reversestop_enabled: bool,

    startup_step: f32,
    duty_step: f32,
    hv_step: f32,
    lv_step: f32,
    return_step: f32,
    reverse_stop_step: f32,

    /// Angle the setpoint is moving towards [deg].
    pub target: f32,
    /// Rate-limited setpoint [deg].
    pub interpolated: f32,
    /// Final setpoint handed to the PID [deg].
    pub setpoint: f32,

    pub reverse_total_erpm: f32,
    pub reverse_timer: Ticks,
    hv_timer: Ticks,
    wheelslip_timer: Ticks,
    /// Freewheel while traction loss is detected.
    pub traction_control: bool,

    /// Speed-dependent nose lift [deg].
    pub noseangling: f32,
    noseangling_step: f32,
    variable_per_erpm: f32,
    variable_max_erpm: f32,

    pub atr: Atr,
    pub torque_tilt: TorqueTilt,
    pub turn_tilt: TurnTilt,
    pub brake_tilt: BrakeTilt,
    pub remote: Remote,
}

impl Setpoint {
    pub fn new(cfg: &RefloatConfig) -> Self {
        let hz = cfg.hertz;
        let mut sp = Self {
            tiltback: cfg.tiltback.clone(),
            reversestop_enabled: false,
            startup_step: 0.0,
            duty_step: 0.0,
            hv_step: 0.0,
            lv_step: 0.0,
            return_step: 0.0,
            reverse_stop_step: 0.0,
            target: 0.0,
            interpolated: 0.0,
            setpoint: 0.0,
            reverse_total_erpm: 0.0,
            reverse_timer: 0,
            hv_timer: 0,
            wheelslip_timer: 0,
            traction_control: false,
            noseangling: 0.0,
            noseangling_step: 0.0,
            variable_per_erpm: 0.0,
            variable_max_erpm: 0.0,
            atr: Atr::new(&cfg.atr, hz),
            torque_tilt: TorqueTilt::new(&cfg.torque_tilt, hz),
            turn_tilt: TurnTilt::new(&cfg.turn_tilt, hz),
            brake_tilt: BrakeTilt::new(&cfg.brake_tilt),
            remote: Remote::new(&cfg.input_tilt, hz),
        };
        sp.configure(cfg);
        sp
    }

    pub fn configure(&mut self, cfg: &RefloatConfig) {
        let hertz = cfg.hertz;
        let hz = hertz.max(1) as f32;
        let tiltback = &cfg.tiltback;
        self.tiltback = tiltback.clone();
        self.reversestop_enabled = cfg.faults.reversestop_enabled;
        self.startup_step = cfg.startup.speed / hz;
        self.duty_step = tiltback.duty_speed / hz;
        self.hv_step = tiltback.hv_speed / hz;
        self.lv_step = tiltback.lv_speed / hz;
        self.return_step = tiltback.return_speed / hz;
        self.reverse_stop_step = REVERSE_STOP_SPEED / hz;

        self.noseangling_step = tiltback.noseangling_speed / hz;
        self.variable_per_erpm = tiltback.variable / 1000.0;
        self.variable_max_erpm = if self.variable_per_erpm == 0.0 {
            0.0
        } else {
            (tiltback.variable_max / self.variable_per_erpm).abs()
        };

        self.atr.configure(&cfg.atr, hertz);
        self.torque_tilt.configure(&cfg.torque_tilt, hertz);
        self.turn_tilt.configure(&cfg.turn_tilt, hertz);
        self.brake_tilt.configure(&cfg.brake_tilt);
        self.remote.configure(&cfg.input_tilt, hertz);
    }

    /// Start centering from `balance_pitch` towards level.
    pub fn reset(&mut self, balance_pitch: f32) {
        self.setpoint = balance_pitch;
        self.interpolated = balance_pitch;
        self.target = 0.0;
        self.reverse_total_erpm = 0.0;
        self.traction_control = false;
        self.noseangling = 0.0;
        self.atr.reset();
        self.torque_tilt.reset();
        self.turn_tilt.reset();
        self.brake_tilt.reset();
        self.remote.reset();
    }

    /// Inputs tracked every tick regardless of state.
    pub fn sense(&mut self, imu: &ImuSample, remote: Option<&RemoteSample>) {
        self.remote.read(remote);
        self.turn_tilt.aggregate(imu.yaw);
    }

    /// Interpolation speed for `sat` [deg/tick].
    pub fn step_size(&self, sat: SetpointAdjustmentType) -> f32 {
        match sat {
            SetpointAdjustmentType::None => self.return_step,
            SetpointAdjustmentType::Centering => self.startup_step,
            SetpointAdjustmentType::ReverseStop => self.reverse_stop_step,
            SetpointAdjustmentType::PbDuty => self.duty_step,
            SetpointAdjustmentType::PbHighVoltage | SetpointAdjustmentType::PbTemperature => {
                self.hv_step
            }
            SetpointAdjustmentType::PbLowVoltage => self.lv_step,
        }
    }

    /// Pick this tick's SAT and target, interpolate, then add the tilts.
    pub fn update(
        &mut self,
        state: &mut State,
        md: &MotorData,
        imu: &ImuSample,
        pid: &mut Pid,
        time: &Time,
    ) {
        self.select_target(state, md, pid, time);
        let step = self.step_size(state.sat);
        rate_limit(&mut self.interpolated, self.target, step);
        self.setpoint = self.interpolated;

        self.remote.update(state.darkride);
        self.setpoint += self.remote.setpoint;

        if state.darkride {
            return;
        }

        if state.wheelslip {
            self.torque_tilt.winddown();
            self.atr.winddown();
            self.brake_tilt.winddown();
        } else {
            self.update_noseangling(md);
            self.setpoint += self.noseangling;

            self.turn_tilt.update(md);
            self.setpoint += self.turn_tilt.setpoint;

            self.torque_tilt.update(md);
            self.atr.update(md);
            self.brake_tilt
                .update(md, &self.atr, self.setpoint - imu.balance_pitch);
        }

        let ab = self.atr.setpoint + self.brake_tilt.setpoint;
        let torque = self.torque_tilt.setpoint;
        if sign(ab) == sign(torque) {
            self.setpoint += sign(ab) * ab.abs().max(torque.abs());
        } else {
            self.setpoint += ab + torque;
        }
    }

    fn update_noseangling(&mut self, md: &MotorData) {
        let tb = &self.tiltback;
        let variable_erpm =
            (md.abs_erpm - tb.variable_erpm).clamp(0.0, self.variable_max_erpm);
        let mut target = self.variable_per_erpm * variable_erpm * md.erpm_sign;
        if md.abs_erpm > tb.constant_erpm {
            target += tb.constant * md.erpm_sign;
        }
        rate_limit(&mut self.noseangling, target, self.noseangling_step);
    }

    fn select_target(&mut self, state: &mut State, md: &MotorData, pid: &mut Pid, time: &Time) {
        let tb = &self.tiltback;
        let hv_enabled = tb.hv > 0.0;
        let lv_enabled = tb.lv > 0.0;

        if !hv_enabled || md.batt_voltage < tb.hv {
            time.refresh(&mut self.hv_timer);
        }

        let toward = |angle: f32| if md.erpm > 0.0 { angle } else { -angle };

        if state.sat == SetpointAdjustmentType::Centering {
            if self.interpolated == self.target {
                state.sat = SetpointAdjustmentType::None;
                debug!("Centering done");
            }
        } else if state.sat == SetpointAdjustmentType::ReverseStop {
            self.reverse_total_erpm += md.erpm;
            if self.reverse_total_erpm.abs() > REVERSE_TOLERANCE {
                self.target =
                    (self.reverse_total_erpm.abs() - REVERSE_TOLERANCE) * REVERSE_ERPM_INCREMENT;
            } else if self.reverse_total_erpm.abs() <= REVERSE_TOLERANCE * 0.5 && md.erpm >= 0.0 {
                state.sat = SetpointAdjustmentType::None;
                self.reverse_total_erpm = 0.0;
                self.target = 0.0;
                pid.reset_integral();
            }
        } else if self.reversestop_enabled && md.erpm < REVERSE_STOP_ERPM && !state.darkride {
            self.reverse_total_erpm = if state.sat.is_error_pushback() {
                -(REVERSE_TOLERANCE + self.interpolated / REVERSE_ERPM_INCREMENT)
            } else {
                0.0
            };
            state.sat = SetpointAdjustmentType::ReverseStop;
            time.refresh(&mut self.reverse_timer);
        } else if state.mode != Mode::Flywheel
            && md.acceleration.abs() > 15.0
            && sign(md.acceleration) == md.erpm_sign
            && md.duty_cycle > 0.3
            && md.abs_erpm > 2000.0
        {
            if !state.wheelslip {
                debug!("Wheelslip detected");
            }
            state.wheelslip = true;
            state.sat = SetpointAdjustmentType::None;
            time.refresh(&mut self.wheelslip_timer);
            if state.darkride {
                self.traction_control = true;
            }
        } else if state.wheelslip {
            if md.acceleration.abs() < 10.0 {
                self.traction_control = false;
            }
            if md.duty_cycle > MAX_DUTY_WITH_MARGIN {
                time.refresh(&mut self.wheelslip_timer);
            } else if time.older(self.wheelslip_timer, 0.2) && md.duty_raw < 0.85 {
                self.traction_control = false;
                state.wheelslip = false;
            }
        } else if md.duty_cycle > tb.duty {
            self.target = toward(tb.duty_angle);
            if state.mode != Mode::Flywheel {
                state.sat = SetpointAdjustmentType::PbDuty;
            }
        } else if hv_enabled
            && md.duty_cycle > VOLTAGE_PUSHBACK_MIN_DUTY
            && md.batt_voltage > tb.hv
        {
            if time.older(self.hv_timer, 0.5) || md.batt_voltage > tb.hv + 1.0 {
                self.target = toward(tb.hv_angle);
                state.sat = SetpointAdjustmentType::PbHighVoltage;
            } else {
                state.sat = SetpointAdjustmentType::None;
            }
        } else if tb.mosfet_temp > 0.0 && md.mosfet_temp > tb.mosfet_temp {
            if md.mosfet_temp > tb.mosfet_temp + 1.0 {
                self.target = toward(tb.lv_angle);
                state.sat = SetpointAdjustmentType::PbTemperature;
            } else {
                state.sat = SetpointAdjustmentType::None;
            }
        } else if tb.motor_temp > 0.0 && md.motor_temp > tb.motor_temp {
            if md.motor_temp > tb.motor_temp + 1.0 {
                self.target = toward(tb.lv_angle);
                state.sat = SetpointAdjustmentType::PbTemperature;
            } else {
                state.sat = SetpointAdjustmentType::None;
            }
        } else if lv_enabled
            && md.duty_cycle > VOLTAGE_PUSHBACK_MIN_DUTY
            && md.batt_voltage < tb.lv
        {
            // Tolerate sag under load: tilt only 2 V below the threshold, at
            // low current, or beyond 20 A per volt of difference.
            let abs_current = md.dir_current.abs();
            let vdelta = tb.lv - md.batt_voltage;
            let ratio = vdelta * 20.0 / abs_current;
            if vdelta > 2.0 || abs_current < 5.0 || ratio > 1.0 {
                self.target = toward(tb.lv_angle);
                state.sat = SetpointAdjustmentType::PbLowVoltage;
            } else {
                state.sat = SetpointAdjustmentType::None;
                self.target = 0.0;
            }
        } else {
            state.sat = SetpointAdjustmentType::None;
            self.target = 0.0;
        }

        if state.wheelslip && md.duty_cycle > MAX_DUTY_WITH_MARGIN {
            self.target = 0.0;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
