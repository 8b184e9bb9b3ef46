//! Surge: short open-loop duty excursions under high current.
//!
//! When the rider demands more current than the start threshold, the balance
//! loop is bypassed for up to 0.5 s and the duty cycle ramps up from its
//! current value. The excursion ends early when the nose lifts more than
//! `max_angle` above the setpoint captured at the start, when braking, or on
//! wheelslip. Another surge may start 0.7 s after the previous one started.

use std::fmt;

use refloat_common::ride::config::CfgSurge;
use refloat_common::ride::state::SetpointAdjustmentType;

use super::filters::lerp;
use super::motor_data::MotorData;
use crate::state::ride::State;
use crate::time::{Ticks, Time};

/// Maximum surge duration [s].
const SURGE_CYCLE_S: f32 = 0.5;
/// Minimum time between surge starts [s].
const SURGE_PERIOD_S: f32 = 0.7;
/// No surge at or above this duty.
const SURGE_MAX_DUTY: f32 = 0.8;
/// Duty at which the start current reaches the high-duty value.
const HIGH_DUTY: f32 = 0.95;

/// Why a surge ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurgeExit {
    Timeout,
    MaxAngle,
    Braking,
    Wheelslip,
}

impl fmt::Display for SurgeExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Timeout => "timeout",
            Self::MaxAngle => "max angle",
            Self::Braking => "braking",
            Self::Wheelslip => "wheelslip",
        };
        f.write_str(s)
    }
}

/// Surge edge reported by [`Surge::check_surge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurgeEvent {
    Started,
    Ended(SurgeExit),
}

#[derive(Debug, Clone)]
pub struct Surge {
    cfg: CfgSurge,
    /// Duty-scaled start threshold [A], recomputed every tick.
    pub start_current: f32,
    /// Duty added per tick while active.
    ramp_rate: f32,
    pub high_current: bool,
    pub active: bool,
    /// Set on the tick a surge ends; the caller hands control back to the PID.
    pub deactivate: bool,
    timer: Option<Ticks>,
    setpoint: f32,
    pub new_duty_cycle: f32,
}

impl Surge {
    pub fn new(cfg: &CfgSurge, hertz: u16) -> Self {
        let mut s = Self {
            cfg: cfg.clone(),
            start_current: cfg.start_current,
            ramp_rate: 0.0,
            high_current: false,
            active: false,
            deactivate: false,
            timer: None,
            setpoint: 0.0,
            new_duty_cycle: 0.0,
        };
        s.configure(cfg, hertz);
        s
    }

    pub fn configure(&mut self, cfg: &CfgSurge, hertz: u16) {
        self.cfg = cfg.clone();
        self.ramp_rate = cfg.duty / 100.0 / hertz.max(1) as f32;
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.cfg.enabled
    }

    pub fn reset(&mut self) {
        self.high_current = false;
        self.active = false;
        self.deactivate = false;
        self.new_duty_cycle = 0.0;
    }

    /// Update the high-current flag. Returns true on its rising edge.
    pub fn check_current(&mut self, md: &MotorData, state: &State) -> bool {
        let scaled = lerp(
            self.cfg.scale_duty / 100.0,
            HIGH_DUTY,
            self.cfg.start_current,
            self.cfg.start_hd_current,
            md.duty_cycle,
        );
        self.start_current = self.cfg.start_current.min(scaled);

        let was_high = self.high_current;
        self.high_current = md.filt_current * md.erpm_sign
            > self.start_current - self.cfg.overcurrent_margin
            && !md.braking
            && !state.wheelslip
            && md.abs_erpm > self.cfg.min_erpm
            && md.erpm_sign_check()
            && state.sat != SetpointAdjustmentType::Centering;
        self.high_current && !was_high
    }

    /// Start, advance or end a surge.
    ///
    /// `setpoint` is the balance setpoint and `pitch` the measured pitch of
    /// this tick.
    pub fn check_surge(
        &mut self,
        md: &MotorData,
        state: &State,
        setpoint: f32,
        pitch: f32,
        time: &Time,
    ) -> Option<SurgeEvent> {
        self.deactivate = false;
        let mut event = None;

        let period_over = self.timer.is_none_or(|t| time.older(t, SURGE_PERIOD_S));
        if !self.active
            && md.filt_current * md.erpm_sign > self.start_current
            && self.high_current
            && md.duty_cycle < SURGE_MAX_DUTY
            && period_over
        {
            self.timer = Some(time.now);
            self.active = true;
            self.setpoint = setpoint;
            self.new_duty_cycle = md.erpm_sign * md.duty_cycle;
            event = Some(SurgeEvent::Started);
        }

        if self.active {
            self.new_duty_cycle += md.erpm_sign * self.ramp_rate;

            let started = self.timer.unwrap_or(time.now);
            let exit = if time.older(started, SURGE_CYCLE_S) {
                Some(SurgeExit::Timeout)
            } else if -(self.setpoint - pitch) * md.erpm_sign > self.cfg.max_angle {
                Some(SurgeExit::MaxAngle)
            } else if md.braking {
                Some(SurgeExit::Braking)
            } else if state.wheelslip {
                Some(SurgeExit::Wheelslip)
            } else {
                None
            };

            if let Some(exit) = exit {
                self.active = false;
                self.deactivate = true;
                event = Some(SurgeEvent::Ended(exit));
            }
        }
        event
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
