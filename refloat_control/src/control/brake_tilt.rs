//! Lingering nose lift after hard braking.
//!
//! While braking above 2000 erpm the board's lean against the direction of
//! travel is mirrored into a small setpoint lift that decays slowly once the
//! rider lets off. Steep downhills, seen through the ATR acceleration gap,
//! suppress it.

use refloat_common::ride::config::CfgBrakeTilt;

use super::atr::Atr;
use super::filters::{sign, smooth_ramp};
use super::motor_data::MotorData;

#[derive(Debug, Clone, Default)]
pub struct BrakeTilt {
    /// Negative divisor of the balance offset; 0 disables.
    factor: f32,
    lingering: f32,
    ramped_step: f32,
    pub target: f32,
    /// Current contribution [deg].
    pub setpoint: f32,
}

impl BrakeTilt {
    pub fn new(cfg: &CfgBrakeTilt) -> Self {
        let mut bt = Self::default();
        bt.configure(cfg);
        bt
    }

    pub fn configure(&mut self, cfg: &CfgBrakeTilt) {
        self.factor = if cfg.strength == 0.0 {
            0.0
        } else {
            -(0.5 + (20.0 - cfg.strength) / 5.0)
        };
        self.lingering = cfg.lingering.max(1.0);
    }

    pub fn reset(&mut self) {
        self.ramped_step = 0.0;
        self.target = 0.0;
        self.setpoint = 0.0;
    }

    /// `balance_offset` is the setpoint minus the balance pitch [deg].
    pub fn update(&mut self, md: &MotorData, atr: &Atr, balance_offset: f32) {
        if self.factor < 0.0 && md.braking && md.abs_erpm > 2000.0 {
            // Negative current alone is not braking: the lean has to oppose
            // the direction of travel.
            if sign(balance_offset) != md.erpm_sign {
                let mut downhill_damper = 1.0;
                if (md.erpm > 1000.0 && atr.accel_diff < -1.0)
                    || (md.erpm < -1000.0 && atr.accel_diff > 1.0)
                {
                    downhill_damper += atr.accel_diff.abs() / 2.0;
                }
                self.target = if downhill_damper > 2.0 {
                    0.0
                } else {
                    balance_offset / self.factor / downhill_damper
                };
            }
        } else {
            self.target = 0.0;
        }

        let mut step = if self.target.abs() > self.setpoint.abs() {
            atr.on_step() * 1.5
        } else if md.abs_erpm < 800.0 {
            atr.on_step()
        } else {
            atr.off_step() / self.lingering
        };
        if md.abs_erpm < 500.0 {
            step /= 2.0;
        }

        smooth_ramp(
            &mut self.setpoint,
            &mut self.ramped_step,
            self.target,
            step,
            0.05,
            1.5,
        );
    }

    pub fn winddown(&mut self) {
        self.setpoint *= 0.995;
        self.target *= 0.99;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refloat_common::ride::config::{CfgAtr, CfgMotor};

    fn braking_at(erpm: f32) -> MotorData {
        let mut md = MotorData::new(&CfgMotor::default(), 1000);
        md.erpm = erpm;
        md.abs_erpm = erpm.abs();
        md.erpm_sign = sign(erpm);
        md.braking = true;
        md
    }

    #[test]
    fn off_by_default() {
        let mut bt = BrakeTilt::new(&CfgBrakeTilt::default());
        let atr = Atr::new(&CfgAtr::default(), 1000);
        bt.update(&braking_at(5000.0), &atr, -4.0);
        assert_eq!(bt.target, 0.0);
        assert_eq!(bt.setpoint, 0.0);
    }

    #[test]
    fn hard_braking_lifts_nose() {
        let mut bt = BrakeTilt::new(&CfgBrakeTilt {
            strength: 10.0,
            lingering: 2.0,
        });
        let atr = Atr::new(&CfgAtr::default(), 1000);
        // factor = -(0.5 + 10 / 5) = -2.5
        bt.update(&braking_at(5000.0), &atr, -5.0);
        assert!((bt.target - 2.0).abs() < 1e-5);
        assert!(bt.setpoint > 0.0);
    }

    #[test]
    fn lean_with_travel_is_not_braking() {
        let mut bt = BrakeTilt::new(&CfgBrakeTilt {
            strength: 10.0,
            lingering: 2.0,
        });
        let atr = Atr::new(&CfgAtr::default(), 1000);
        bt.update(&braking_at(5000.0), &atr, 3.0);
        assert_eq!(bt.target, 0.0);
    }

    #[test]
    fn steep_downhill_suppresses() {
        let mut bt = BrakeTilt::new(&CfgBrakeTilt {
            strength: 10.0,
            lingering: 2.0,
        });
        let mut atr = Atr::new(&CfgAtr::default(), 1000);
        atr.accel_diff = -2.5;
        bt.update(&braking_at(5000.0), &atr, -5.0);
        assert_eq!(bt.target, 0.0);

        // A milder slope only damps it: 1 + 1.5 / 2.
        atr.accel_diff = -1.5;
        bt.update(&braking_at(5000.0), &atr, -5.0);
        assert!((bt.target - 2.0 / 1.75).abs() < 1e-5);
    }

    #[test]
    fn target_drops_when_braking_ends() {
        let mut bt = BrakeTilt::new(&CfgBrakeTilt {
            strength: 10.0,
            lingering: 2.0,
        });
        let atr = Atr::new(&CfgAtr::default(), 1000);
        bt.update(&braking_at(5000.0), &atr, -5.0);
        let mut md = braking_at(5000.0);
        md.braking = false;
        bt.update(&md, &atr, -5.0);
        assert_eq!(bt.target, 0.0);
    }
}
