//! Extra current once the rider leans past the booster angle.

use refloat_common::ride::config::{CfgBoost, CfgBooster};

use super::filters::sign;
use super::motor_data::MotorData;

/// Above this |erpm| the booster stiffens with speed.
const BOOST_MIN_ERPM: f32 = 3000.0;

#[derive(Debug, Clone, Default)]
pub struct Booster {
    cfg: CfgBooster,
    /// Smoothed boost current [A].
    pub current: f32,
}

impl Booster {
    pub fn new(cfg: &CfgBooster) -> Self {
        let mut b = Self::default();
        b.configure(cfg);
        b
    }

    pub fn configure(&mut self, cfg: &CfgBooster) {
        self.cfg = cfg.clone();
    }

    pub fn reset(&mut self) {
        self.current = 0.0;
    }

    /// `proportional` is the lean beyond the setpoint [deg].
    pub fn update(&mut self, md: &MotorData, proportional: f32) {
        let CfgBoost {
            mut angle,
            ramp,
            mut current,
        } = if md.braking {
            self.cfg.brake
        } else {
            self.cfg.accel
        };

        if md.abs_erpm > BOOST_MIN_ERPM {
            let stiffness = ((md.abs_erpm - BOOST_MIN_ERPM) / 10_000.0).min(1.0);
            if md.braking {
                current += current * stiffness;
            } else {
                angle /= 1.0 + stiffness;
            }
        }

        let lean = proportional.abs();
        let target = if lean > angle {
            if lean - angle < ramp {
                current * sign(proportional) * (lean - angle) / ramp
            } else {
                current * sign(proportional)
            }
        } else {
            0.0
        };

        self.current = 0.01 * target + 0.99 * self.current;
    }
}
