//! Adaptive torque response.
//!
//! The motor current predicts how hard the board should accelerate. When the
//! measured acceleration falls short (uphill, soft ground) the nose lifts;
//! when it overshoots (downhill) the nose drops. The gap is smoothed per
//! speed band and turned into a tilt target behind a dead band.

use refloat_common::ride::config::CfgAtr;

use super::filters::{rate_limit, sign};
use super::motor_data::MotorData;

/// Current needed to hold speed [A].
const TORQUE_OFFSET: f32 = 8.0;
/// Above this current the torque/acceleration slope flattens [A].
const LINEAR_TORQUE: f32 = 25.0;
/// Target reversal that earns the transition boost [deg].
const TRANSITION_MARGIN: f32 = 2.0;

#[derive(Debug, Clone, Default)]
pub struct Atr {
    cfg: CfgAtr,
    on_step: f32,
    off_step: f32,
    speed_boost_mult: f32,

    /// Smoothed expected minus measured acceleration [erpm/tick].
    pub accel_diff: f32,
    pub speed_boost: f32,
    pub target: f32,
    /// Current contribution [deg].
    pub setpoint: f32,
}

impl Atr {
    pub fn new(cfg: &CfgAtr, hertz: u16) -> Self {
        let mut atr = Self::default();
        atr.configure(cfg, hertz);
        atr
    }

    pub fn configure(&mut self, cfg: &CfgAtr, hertz: u16) {
        let hz = hertz.max(1) as f32;
        self.cfg = cfg.clone();
        self.on_step = cfg.on_speed / hz;
        self.off_step = cfg.off_speed / hz;

        // Full speed boost at 6000 erpm above the start, later for stronger
        // settings.
        self.speed_boost_mult = if cfg.speed_boost.abs() > 0.4 {
            1.0 / ((cfg.speed_boost.abs() - 0.4) * 5000.0 + 3000.0)
        } else {
            1.0 / 3000.0
        };
    }

    pub fn reset(&mut self) {
        self.accel_diff = 0.0;
        self.speed_boost = 0.0;
        self.target = 0.0;
        self.setpoint = 0.0;
    }

    /// Step sizes used by brake tilt.
    pub fn on_step(&self) -> f32 {
        self.on_step
    }

    pub fn off_step(&self) -> f32 {
        self.off_step
    }

    pub fn update(&mut self, md: &MotorData) {
        let cfg = &self.cfg;
        let torque = md.filt_current;
        let abs_torque = torque.abs();
        let (threshold, accel_factor) = if md.braking {
            (cfg.threshold_down, cfg.amps_decel_ratio)
        } else {
            (cfg.threshold_up, cfg.amps_accel_ratio)
        };

        let measured = md.acceleration.clamp(-5.0, 5.0);
        let expected = if abs_torque < LINEAR_TORQUE {
            (torque - md.erpm_sign * TORQUE_OFFSET) / accel_factor
        } else {
            let torque_sign = sign(torque);
            (torque_sign * LINEAR_TORQUE - md.erpm_sign * TORQUE_OFFSET) / accel_factor
                + torque_sign * (abs_torque - LINEAR_TORQUE) / (accel_factor * 1.3)
        };

        let forward = if md.abs_erpm < 250.0 && abs_torque > 30.0 {
            expected > 0.0
        } else {
            md.erpm > 0.0
        };

        let diff = expected - measured;
        self.accel_diff = if md.abs_erpm > 2000.0 {
            0.9 * self.accel_diff + 0.1 * diff
        } else if md.abs_erpm > 1000.0 {
            0.95 * self.accel_diff + 0.05 * diff
        } else if md.abs_erpm > 250.0 {
            0.98 * self.accel_diff + 0.02 * diff
        } else {
            0.0
        };

        let mut strength = if forward == (self.accel_diff > 0.0) {
            cfg.strength_up
        } else {
            cfg.strength_down
        };

        if md.abs_erpm > 3000.0 && !md.braking {
            let mult = (md.abs_erpm - 3000.0) * self.speed_boost_mult;
            self.speed_boost = mult.min(1.0) * cfg.speed_boost;
            strength += strength * self.speed_boost;
        } else {
            self.speed_boost = 0.0;
        }

        let mut new_target = strength * self.accel_diff;
        if new_target.abs() < threshold {
            new_target = 0.0;
        } else {
            new_target -= sign(new_target) * threshold;
        }

        self.target = (0.95 * self.target + 0.05 * new_target)
            .clamp(-cfg.angle_limit, cfg.angle_limit);

        let mut response_boost = 1.0;
        if md.abs_erpm > 2500.0 {
            response_boost = cfg.response_boost;
        }
        if md.abs_erpm > 6000.0 {
            response_boost *= cfg.response_boost;
        }

        let mut step = self.step_size(forward, response_boost, md.abs_erpm);
        if md.abs_erpm < 500.0 {
            step /= 2.0;
        }
        rate_limit(&mut self.setpoint, self.target, step);
    }

    /// Winding down is slower than winding up so the board does not
    /// oscillate, except when the target swings across level at speed.
    fn step_size(&self, forward: bool, response_boost: f32, abs_erpm: f32) -> f32 {
        // Mirror the reverse direction onto forward.
        let dir = if forward { 1.0 } else { -1.0 };
        let offset = self.setpoint * dir;
        let target = self.target * dir;
        let rising = self.on_step * response_boost;

        if offset < 0.0 {
            if offset < target {
                if target > 0.0 && target - offset > TRANSITION_MARGIN && abs_erpm > 2000.0 {
                    self.off_step * self.cfg.transition_boost
                } else {
                    self.off_step
                }
            } else {
                rising
            }
        } else if target > -3.0 && offset > target {
            self.off_step
        } else {
            rising
        }
    }

    pub fn winddown(&mut self) {
        self.setpoint *= 0.995;
        self.target *= 0.99;
    }
}
