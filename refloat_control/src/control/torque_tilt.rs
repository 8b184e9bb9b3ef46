//! Nose lift proportional to the filtered motor current.

use refloat_common::ride::config::CfgTorqueTilt;

use super::filters::{sign, smooth_ramp};
use super::motor_data::MotorData;

#[derive(Debug, Clone, Default)]
pub struct TorqueTilt {
    cfg: CfgTorqueTilt,
    on_step: f32,
    off_step: f32,
    ramped_step: f32,
    pub target: f32,
    /// Current contribution [deg].
    pub setpoint: f32,
}

impl TorqueTilt {
    pub fn new(cfg: &CfgTorqueTilt, hertz: u16) -> Self {
        let mut tt = Self::default();
        tt.configure(cfg, hertz);
        tt
    }

    pub fn configure(&mut self, cfg: &CfgTorqueTilt, hertz: u16) {
        let hz = hertz.max(1) as f32;
        self.cfg = cfg.clone();
        self.on_step = cfg.on_speed / hz;
        self.off_step = cfg.off_speed / hz;
    }

    pub fn reset(&mut self) {
        self.ramped_step = 0.0;
        self.target = 0.0;
        self.setpoint = 0.0;
    }

    pub fn update(&mut self, md: &MotorData) {
        let strength = if md.braking {
            self.cfg.strength_regen
        } else {
            self.cfg.strength
        };

        let excess = (md.filt_current.abs() - self.cfg.start_current).max(0.0);
        self.target = (excess * strength).min(self.cfg.angle_limit) * sign(md.filt_current);

        // Moving back towards level uses the off speed.
        let diff = self.setpoint - self.target;
        let mut step = if (diff > 0.0 && self.target > 0.0) || (diff < 0.0 && self.target < 0.0) {
            self.off_step
        } else {
            self.on_step
        };
        if md.abs_erpm < 500.0 {
            step /= 2.0;
        }

        smooth_ramp(
            &mut self.setpoint,
            &mut self.ramped_step,
            self.target,
            step,
            0.04,
            1.5,
        );
    }

    /// Decay towards level while the contribution is suspended.
    pub fn winddown(&mut self) {
        self.setpoint *= 0.995;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MotorSample;
    use refloat_common::ride::config::CfgMotor;

    fn motor(current: f32, erpm: f32) -> MotorData {
        let mut md = MotorData::new(&CfgMotor::default(), 1000);
        md.update(&MotorSample {
            erpm,
            current,
            dir_current: current,
            ..MotorSample::default()
        });
        md
    }

    fn enabled() -> CfgTorqueTilt {
        CfgTorqueTilt {
            strength: 0.2,
            strength_regen: 0.1,
            ..CfgTorqueTilt::default()
        }
    }

    #[test]
    fn zero_strength_stays_level() {
        let mut tt = TorqueTilt::new(&CfgTorqueTilt::default(), 1000);
        let md = motor(60.0, 5000.0);
        for _ in 0..1000 {
            tt.update(&md);
        }
        assert_eq!(tt.setpoint, 0.0);
    }

    #[test]
    fn lifts_nose_above_start_current() {
        let mut tt = TorqueTilt::new(&enabled(), 1000);
        let md = motor(35.0, 5000.0);
        tt.update(&md);
        // (35 - 15) * 0.2
        assert!((tt.target - 4.0).abs() < 1e-5);
        for _ in 0..5000 {
            tt.update(&md);
        }
        assert!((tt.setpoint - 4.0).abs() < 1e-2, "{}", tt.setpoint);
    }

    #[test]
    fn target_capped_by_angle_limit() {
        let mut tt = TorqueTilt::new(&enabled(), 1000);
        tt.update(&motor(200.0, 5000.0));
        assert_eq!(tt.target, 8.0);
    }

    #[test]
    fn below_start_current_no_target() {
        let mut tt = TorqueTilt::new(&enabled(), 1000);
        tt.update(&motor(10.0, 5000.0));
        assert_eq!(tt.target, 0.0);
    }

    #[test]
    fn braking_uses_regen_strength() {
        let mut tt = TorqueTilt::new(&enabled(), 1000);
        tt.update(&motor(-35.0, 5000.0));
        assert!((tt.target + 2.0).abs() < 1e-5);
    }

    #[test]
    fn winddown_decays() {
        let mut tt = TorqueTilt::new(&enabled(), 1000);
        tt.setpoint = 2.0;
        tt.winddown();
        assert!((tt.setpoint - 1.99).abs() < 1e-5);
    }
}
