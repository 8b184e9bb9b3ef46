//! Nose lift while carving.
//!
//! The yaw rate is tracked every tick, also outside of RUNNING, so the
//! aggregate is warm when a turn starts. The tilt grows with yaw rate, speed
//! and the yaw accumulated in the current turn direction.

use refloat_common::ride::config::CfgTurnTilt;

use super::filters::{sign, smooth_ramp};
use super::motor_data::MotorData;

/// Largest per-tick yaw change that counts [deg].
const MAX_YAW_CHANGE: f32 = 0.1;
/// Yaw changes at or below this are wiggle, not turning [deg].
const MIN_YAW_CHANGE: f32 = 0.04;

#[derive(Debug, Clone, Default)]
pub struct TurnTilt {
    cfg: CfgTurnTilt,
    step: f32,
    boost_per_erpm: f32,

    last_yaw: f32,
    last_yaw_change: f32,
    /// Smoothed per-tick yaw change [deg].
    pub yaw_change: f32,
    pub abs_yaw_change: f32,
    /// Yaw turned since the last change of direction [deg].
    pub yaw_aggregate: f32,

    ramped_step: f32,
    pub target: f32,
    /// Current contribution [deg].
    pub setpoint: f32,
}

impl TurnTilt {
    pub fn new(cfg: &CfgTurnTilt, hertz: u16) -> Self {
        let mut tt = Self::default();
        tt.configure(cfg, hertz);
        tt
    }

    pub fn configure(&mut self, cfg: &CfgTurnTilt, hertz: u16) {
        self.cfg = cfg.clone();
        self.step = cfg.speed / hertz.max(1) as f32;
        self.boost_per_erpm = cfg.erpm_boost / 100.0 / cfg.erpm_boost_end;
    }

    pub fn reset(&mut self) {
        self.last_yaw = 0.0;
        self.last_yaw_change = 0.0;
        self.yaw_change = 0.0;
        self.abs_yaw_change = 0.0;
        self.yaw_aggregate = 0.0;
        self.ramped_step = 0.0;
        self.target = 0.0;
        self.setpoint = 0.0;
    }

    /// Track the yaw reading [deg].
    pub fn aggregate(&mut self, yaw: f32) {
        let mut change = yaw - self.last_yaw;
        // An exact repeat means the IMU did not update; jumps are the
        // +/-180 wrap.
        let stale = change == 0.0 || change.abs() > 100.0;
        if stale {
            change = self.last_yaw_change;
        }
        self.last_yaw_change = change;
        self.last_yaw = yaw;

        self.yaw_change =
            0.8 * self.yaw_change + 0.2 * change.clamp(-MAX_YAW_CHANGE, MAX_YAW_CHANGE);

        if sign(self.yaw_change) != sign(self.yaw_aggregate) {
            self.yaw_aggregate = 0.0;
        }

        self.abs_yaw_change = self.yaw_change.abs();
        if self.abs_yaw_change > MIN_YAW_CHANGE && !stale {
            self.yaw_aggregate += self.yaw_change;
        }
    }

    pub fn update(&mut self, md: &MotorData) {
        let cfg = &self.cfg;
        if cfg.strength == 0.0 {
            return;
        }

        let abs_aggregate = self.yaw_aggregate.abs();
        if abs_aggregate < cfg.start_angle || self.abs_yaw_change < MIN_YAW_CHANGE {
            self.target = 0.0;
        } else {
            let speed_boost = if md.abs_erpm < cfg.erpm_boost_end {
                1.0 + md.abs_erpm * self.boost_per_erpm
            } else {
                1.0 + cfg.erpm_boost / 100.0
            };
            let damper = if md.abs_erpm < 2000.0 { 0.5 } else { 1.0 };
            let aggregate_boost = (1.0 + damper * abs_aggregate / cfg.yaw_aggregate).min(2.0);

            let target = (self.abs_yaw_change * cfg.strength * speed_boost * aggregate_boost)
                .min(cfg.angle_limit);
            self.target = if md.abs_erpm < cfg.start_erpm {
                0.0
            } else {
                target * md.erpm_sign
            };
        }

        smooth_ramp(
            &mut self.setpoint,
            &mut self.ramped_step,
            self.target,
            self.step,
            0.04,
            1.5,
        );
    }

    pub fn winddown(&mut self) {
        self.setpoint *= 0.995;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use refloat_common::ride::config::CfgMotor;

    fn rolling(erpm: f32) -> MotorData {
        let mut md = MotorData::new(&CfgMotor::default(), 1000);
        md.erpm = erpm;
        md.abs_erpm = erpm.abs();
        md.erpm_sign = sign(erpm);
        md
    }

    fn carve(tt: &mut TurnTilt, md: &MotorData, rate: f32, ticks: usize) {
        let mut yaw = tt.last_yaw;
        for _ in 0..ticks {
            yaw += rate;
            tt.aggregate(yaw);
            tt.update(md);
        }
    }

    fn enabled() -> CfgTurnTilt {
        CfgTurnTilt {
            strength: 10.0,
            ..CfgTurnTilt::default()
        }
    }

    #[test]
    fn aggregate_follows_turn_direction() {
        let mut tt = TurnTilt::new(&CfgTurnTilt::default(), 1000);
        let md = rolling(0.0);
        carve(&mut tt, &md, 0.08, 100);
        assert!(tt.yaw_aggregate > 5.0, "{}", tt.yaw_aggregate);
        // Reversing clears the aggregate before it builds the other way.
        carve(&mut tt, &md, -0.08, 100);
        assert!(tt.yaw_aggregate < 0.0);
    }

    #[test]
    fn small_wiggle_not_aggregated() {
        let mut tt = TurnTilt::new(&CfgTurnTilt::default(), 1000);
        carve(&mut tt, &rolling(0.0), 0.03, 200);
        assert_eq!(tt.yaw_aggregate, 0.0);
    }

    #[test]
    fn heading_wrap_ignored() {
        let mut tt = TurnTilt::new(&CfgTurnTilt::default(), 1000);
        let mut yaw = 178.0;
        tt.aggregate(yaw);
        for _ in 0..20 {
            yaw += 0.08;
            tt.aggregate(yaw);
        }
        let (change, aggregate) = (tt.yaw_change, tt.yaw_aggregate);
        tt.aggregate(-179.92);
        // The wrap repeats the previous change and adds nothing.
        assert!(tt.yaw_change > change);
        assert!(tt.yaw_change < MAX_YAW_CHANGE);
        assert_eq!(tt.yaw_aggregate, aggregate);
    }

    #[test]
    fn carving_lifts_nose_in_travel_direction() {
        let mut tt = TurnTilt::new(&enabled(), 1000);
        carve(&mut tt, &rolling(-3000.0), 0.08, 3000);
        assert!(tt.target < 0.0);
        assert!(tt.target >= -3.0);
        assert!(tt.setpoint < -1.0, "{}", tt.setpoint);
    }

    #[test]
    fn below_start_erpm_no_tilt() {
        let mut tt = TurnTilt::new(&enabled(), 1000);
        carve(&mut tt, &rolling(800.0), 0.08, 500);
        assert_eq!(tt.target, 0.0);
        assert_eq!(tt.setpoint, 0.0);
    }

    #[test]
    fn zero_strength_skips_update() {
        let mut tt = TurnTilt::new(&CfgTurnTilt::default(), 1000);
        carve(&mut tt, &rolling(5000.0), 0.08, 500);
        assert_eq!(tt.target, 0.0);
        assert_eq!(tt.setpoint, 0.0);
    }
}
