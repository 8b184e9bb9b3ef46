//! Balance PID: angle P with brake-side scaling, clamped I, and rate P.
//!
//! Output current is composed from the three terms, limited to the motor
//! current limit for the current direction, then smoothed 0.8/0.2 into the
//! balance current. Rate P and the booster current are pitch based rather
//! than balance-pitch based and are faded in after engage by a soft-start
//! limit.

use refloat_common::ride::config::CfgPid;
use refloat_common::ride::state::SetpointAdjustmentType;

use super::filters::sign;
use super::motor_data::MotorData;
use crate::host::ImuSample;

/// Below this |erpm| all brake scales return towards 1.
const SCALE_RESET_ERPM: f32 = 500.0;

/// Soft-start ramp for the pitch-based terms [A/s].
const SOFTSTART_RAMP_A_PER_S: f32 = 100.0;

#[derive(Debug, Clone)]
pub struct Pid {
    cfg: CfgPid,
    pub p: f32,
    pub i: f32,
    pub rate_p: f32,
    kp_brake_scale: f32,
    kp2_brake_scale: f32,
    kp_accel_scale: f32,
    kp2_accel_scale: f32,
    softstart_limit: f32,
    softstart_step: f32,
    /// Smoothed output [A].
    pub balance_current: f32,
}

impl Pid {
    pub fn new(cfg: &CfgPid, hertz: u16) -> Self {
        let mut pid = Self {
            cfg: cfg.clone(),
            p: 0.0,
            i: 0.0,
            rate_p: 0.0,
            kp_brake_scale: 1.0,
            kp2_brake_scale: 1.0,
            kp_accel_scale: 1.0,
            kp2_accel_scale: 1.0,
            softstart_limit: 0.0,
            softstart_step: 0.0,
            balance_current: 0.0,
        };
        pid.configure(cfg, hertz);
        pid
    }

    pub fn configure(&mut self, cfg: &CfgPid, hertz: u16) {
        self.cfg = cfg.clone();
        self.softstart_step = SOFTSTART_RAMP_A_PER_S / hertz.max(1) as f32;
    }

    /// Zero all terms and restart the soft start.
    pub fn reset(&mut self) {
        self.p = 0.0;
        self.i = 0.0;
        self.rate_p = 0.0;
        self.kp_brake_scale = 1.0;
        self.kp2_brake_scale = 1.0;
        self.kp_accel_scale = 1.0;
        self.kp2_accel_scale = 1.0;
        self.softstart_limit = 0.0;
        self.balance_current = 0.0;
    }

    #[inline]
    pub fn reset_integral(&mut self) {
        self.i = 0.0;
    }

    /// Hand control back from an open-loop phase at `current` [A].
    pub fn prime(&mut self, current: f32) {
        self.i = current;
        self.balance_current = current;
    }

    /// Update P, I and rate P for `setpoint`.
    pub fn update(
        &mut self,
        setpoint: f32,
        md: &MotorData,
        imu: &ImuSample,
        sat: SetpointAdjustmentType,
    ) {
        self.p = setpoint - imu.balance_pitch;
        self.i += self.p * self.cfg.ki;
        if self.cfg.ki_limit > 0.0 && self.i.abs() > self.cfg.ki_limit {
            self.i = self.cfg.ki_limit * sign(self.i);
        }
        if sat == SetpointAdjustmentType::ReverseStop {
            self.i *= 0.9;
        }

        let smooth = |scale: &mut f32, target: f32| *scale = 0.01 * target + 0.99 * *scale;
        if md.abs_erpm < SCALE_RESET_ERPM {
            smooth(&mut self.kp_brake_scale, 1.0);
            smooth(&mut self.kp2_brake_scale, 1.0);
            smooth(&mut self.kp_accel_scale, 1.0);
            smooth(&mut self.kp2_accel_scale, 1.0);
        } else if md.erpm > 0.0 {
            smooth(&mut self.kp_brake_scale, self.cfg.kp_brake);
            smooth(&mut self.kp2_brake_scale, self.cfg.kp2_brake);
            smooth(&mut self.kp_accel_scale, 1.0);
            smooth(&mut self.kp2_accel_scale, 1.0);
        } else {
            smooth(&mut self.kp_brake_scale, 1.0);
            smooth(&mut self.kp2_brake_scale, 1.0);
            smooth(&mut self.kp_accel_scale, self.cfg.kp_brake);
            smooth(&mut self.kp2_accel_scale, self.cfg.kp2_brake);
        }

        let kp_scale = if self.p > 0.0 {
            self.kp_accel_scale
        } else {
            self.kp_brake_scale
        };
        self.p *= self.cfg.kp * kp_scale;

        self.rate_p = -imu.pitch_rate * self.cfg.kp2;
        self.rate_p *= if self.rate_p > 0.0 {
            self.kp2_accel_scale
        } else {
            self.kp2_brake_scale
        };
    }

    /// Compose, limit and smooth the output. `freewheel` forces zero.
    pub fn output(&mut self, md: &MotorData, booster: f32, freewheel: bool) -> f32 {
        let mut pitch_based = self.rate_p + booster;
        if self.softstart_limit < md.current_max {
            pitch_based = pitch_based.abs().min(self.softstart_limit) * sign(pitch_based);
            self.softstart_limit += self.softstart_step;
        }

        let mut new_current = self.p + self.i + pitch_based;
        let limit = if md.braking {
            md.current_min
        } else {
            md.current_max
        };
        if new_current.abs() > limit {
            new_current = sign(new_current) * limit;
        }

        self.balance_current = if freewheel {
            0.0
        } else {
            self.balance_current * 0.8 + new_current * 0.2
        };
        self.balance_current
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
