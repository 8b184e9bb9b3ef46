//! Setpoint tilt from the remote's throttle axis.

use refloat_common::ride::config::CfgInputTilt;

use super::filters::{sign, smooth_ramp};
use crate::host::RemoteSample;

/// Remote readings older than this count as disconnected [s].
const REMOTE_TIMEOUT_S: f32 = 1.0;

#[derive(Debug, Clone, Default)]
pub struct Remote {
    cfg: CfgInputTilt,
    step: f32,
    ramped_step: f32,
    /// Throttle after dead band and inversion [-1..1].
    pub input: f32,
    /// Current contribution [deg].
    pub setpoint: f32,
}

impl Remote {
    pub fn new(cfg: &CfgInputTilt, hertz: u16) -> Self {
        let mut r = Self::default();
        r.configure(cfg, hertz);
        r
    }

    pub fn configure(&mut self, cfg: &CfgInputTilt, hertz: u16) {
        self.cfg = cfg.clone();
        self.step = cfg.speed / hertz.max(1) as f32;
    }

    pub fn reset(&mut self) {
        self.input = 0.0;
        self.ramped_step = 0.0;
        self.setpoint = 0.0;
    }

    /// Read the throttle for this tick.
    pub fn read(&mut self, sample: Option<&RemoteSample>) {
        let value = match sample {
            Some(s) if self.cfg.enabled && s.age < REMOTE_TIMEOUT_S => s.input.clamp(-1.0, 1.0),
            _ => {
                self.input = 0.0;
                return;
            }
        };

        let deadband = self.cfg.deadband;
        let value = if value.abs() < deadband {
            0.0
        } else {
            sign(value) * (value.abs() - deadband) / (1.0 - deadband)
        };

        self.input = if self.cfg.invert_throttle { -value } else { value };
    }

    /// Tilt towards the throttle; reversed in darkride.
    pub fn update(&mut self, darkride: bool) {
        let mut target = self.input * self.cfg.angle_limit;
        if darkride {
            target = -target;
        }
        smooth_ramp(
            &mut self.setpoint,
            &mut self.ramped_step,
            target,
            self.step,
            0.02,
            2.0,
        );
    }
}
