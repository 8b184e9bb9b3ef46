//! Haptic feedback: pushback and saturation conditions mapped to tone patterns.
//!
//! A pattern is a sequence of 0.1 s beats. The tone sounds on even beats; for
//! patterns longer than two beats the second-to-last beat stays silent, so the
//! rider hears a count of beeps followed by a pause.

use refloat_common::ride::config::{CfgHaptic, CfgHapticTone};
use refloat_common::ride::state::{Mode, RunState, SetpointAdjustmentType};

use super::motor::MotorControl;
use super::motor_data::MotorData;
use crate::host::MotorDriver;
use crate::state::ride::State;
use crate::time::{Ticks, Time};

/// Length of one beat [s].
const TONE_LENGTH_S: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HapticFeedbackType {
    #[default]
    None,
    Duty,
    DutyContinuous,
    ErrorTemperature,
    ErrorVoltage,
}

impl HapticFeedbackType {
    /// Beats per pattern period; 0 plays continuously.
    pub const fn beats(self) -> u8 {
        match self {
            Self::Duty => 2,
            Self::DutyContinuous | Self::None => 0,
            Self::ErrorTemperature => 6,
            Self::ErrorVoltage => 8,
        }
    }
}

pub struct HapticFeedback {
    cfg: CfgHaptic,
    duty_solid_threshold: f32,
    str_poly_b: f32,
    str_poly_c: f32,
    type_playing: HapticFeedbackType,
    tone_timer: Ticks,
    is_playing: bool,
}

impl HapticFeedback {
    pub fn new(cfg: &CfgHaptic, tiltback_duty: f32) -> Self {
        let mut hf = Self {
            cfg: cfg.clone(),
            duty_solid_threshold: 0.0,
            str_poly_b: 0.0,
            str_poly_c: 0.0,
            type_playing: HapticFeedbackType::None,
            tone_timer: 0,
            is_playing: false,
        };
        hf.configure(cfg, tiltback_duty);
        hf
    }

    /// Precompute the strength polynomial for the configured max strength speed.
    pub fn configure(&mut self, cfg: &CfgHaptic, tiltback_duty: f32) {
        self.cfg = cfg.clone();
        self.duty_solid_threshold = tiltback_duty + cfg.duty_solid_offset;

        let m = if cfg.max_strength_speed > 0.0 {
            cfg.max_strength_speed
        } else {
            1.0
        };
        let a = cfg.min_strength;
        self.str_poly_b = (1.0 - cfg.strength_curvature) * (1.0 - a) / m;
        self.str_poly_c = (1.0 - a - self.str_poly_b * m) / (m * m);
    }

    #[inline]
    pub fn type_playing(&self) -> HapticFeedbackType {
        self.type_playing
    }

    #[inline]
    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Tone strength multiplier at `speed` [km/h], capped at 1.
    pub fn strength_scale(&self, speed: f32) -> f32 {
        let v = speed.abs();
        (self.cfg.min_strength + self.str_poly_b * v + self.str_poly_c * v * v).min(1.0)
    }

    fn select_type(&self, state: &State, md: &MotorData) -> HapticFeedbackType {
        if state.state != RunState::Running || state.mode == Mode::Handtest {
            return HapticFeedbackType::None;
        }

        match state.sat {
            SetpointAdjustmentType::PbDuty => {
                return if md.duty_cycle > self.duty_solid_threshold {
                    HapticFeedbackType::DutyContinuous
                } else {
                    HapticFeedbackType::Duty
                };
            }
            SetpointAdjustmentType::PbTemperature => return HapticFeedbackType::ErrorTemperature,
            SetpointAdjustmentType::PbLowVoltage | SetpointAdjustmentType::PbHighVoltage => {
                return HapticFeedbackType::ErrorVoltage;
            }
            _ => {}
        }

        if self.cfg.current_threshold > 0.0
            && md.current_saturation() > self.cfg.current_threshold
        {
            return HapticFeedbackType::DutyContinuous;
        }
        HapticFeedbackType::None
    }

    fn tone(&self) -> Option<CfgHapticTone> {
        match self.type_playing {
            HapticFeedbackType::Duty | HapticFeedbackType::DutyContinuous => Some(self.cfg.duty),
            HapticFeedbackType::ErrorTemperature | HapticFeedbackType::ErrorVoltage => {
                Some(self.cfg.error)
            }
            HapticFeedbackType::None => None,
        }
    }

    pub fn update<M: MotorDriver + ?Sized>(
        &mut self,
        motor: &mut M,
        mc: &mut MotorControl,
        state: &State,
        md: &MotorData,
        time: &Time,
    ) {
        let wanted = self.select_type(state, md);
        if wanted != self.type_playing && time.older(self.tone_timer, TONE_LENGTH_S) {
            self.type_playing = wanted;
            time.refresh(&mut self.tone_timer);
        }

        let should_be_playing = match self.type_playing {
            HapticFeedbackType::None => false,
            t if t.beats() == 0 => true,
            t => {
                let beats = t.beats();
                let period = TONE_LENGTH_S * beats as f32;
                let tone_time = time.age(self.tone_timer) % period;
                let beat = (tone_time / TONE_LENGTH_S).floor() as u8;
                let off_beat = if beats > 2 { beats - 2 } else { 0 };
                beat % 2 == 0 && (off_beat == 0 || beat != off_beat)
            }
        };

        if self.is_playing && !should_be_playing {
            motor.foc_stop_tone();
            mc.stop_tone();
            self.is_playing = false;
        } else if should_be_playing {
            let scale = self.strength_scale(md.speed);
            if let Some(tone) = self.tone().filter(|t| t.strength > 0.0) {
                motor.foc_play_tone(0, tone.frequency, tone.strength * scale);
            }
            if self.cfg.vibrate.strength > 0.0 {
                mc.play_tone(
                    self.cfg.vibrate.frequency as u16,
                    self.cfg.vibrate.strength * scale,
                );
            }
            self.is_playing = true;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
