//! Motor command arbitration.
//!
//! Components request a current or a duty cycle during the tick;
//! [`MotorControl::apply`] turns the request (or its absence) into exactly one
//! host command at the end of the tick. Without a request the board holds
//! with a brake current, the parking brake, or releases once it has been
//! standing still for a second.

use refloat_common::consts::ERPM_MOVING_THRESHOLD;
use refloat_common::ride::config::{CfgMotor, ParkingBrakeMode};
use refloat_common::ride::state::RunState;
use tracing::debug;

use crate::host::MotorDriver;
use crate::time::{Ticks, Time};

/// Below this |erpm| the parking brake may hold with duty zero.
const PARKING_BRAKE_MAX_ERPM: f32 = 2000.0;

/// Below this |erpm| the idle parking brake engages.
const PARKING_BRAKE_IDLE_ERPM: f32 = 50.0;

/// Standstill time after which the brake is released [s].
const BRAKE_RELEASE_S: f32 = 1.0;

/// Current-off delay sent with every current command [s].
const CURRENT_OFF_DELAY_S: f32 = 0.05;

const CLICK_FREQUENCY: u16 = 350;
const CLICK_HALF_PERIODS: u8 = 3;

/// What the tick asked the motor to do.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Request {
    None,
    Current(f32),
    Duty(f32),
}

/// Square-wave current offset used for clicks and vibration.
#[derive(Debug, Clone, Copy, Default)]
struct Tone {
    /// Half period [ticks]; 0 = no tone.
    ticks: u16,
    counter: u16,
    high: bool,
    intensity: f32,
    /// Remaining half periods for a bounded tone; 0 = unbounded.
    clicks: u8,
}

pub struct MotorControl {
    disabled: bool,
    request: Request,
    parking_brake_active: bool,
    brake_timer: Ticks,
    tone: Tone,

    brake_current: f32,
    click_current: f32,
    parking_brake_mode: ParkingBrakeMode,
    /// Tone base frequency [Hz], half the loop frequency.
    main_freq: u16,
}

impl MotorControl {
    pub fn new(cfg: &CfgMotor, hertz: u16) -> Self {
        let mut mc = Self {
            disabled: false,
            request: Request::None,
            parking_brake_active: false,
            brake_timer: 0,
            tone: Tone::default(),
            brake_current: 0.0,
            click_current: 0.0,
            parking_brake_mode: ParkingBrakeMode::default(),
            main_freq: 1,
        };
        mc.configure(cfg, hertz);
        mc
    }

    pub fn configure(&mut self, cfg: &CfgMotor, hertz: u16) {
        self.brake_current = cfg.brake_current;
        self.click_current = cfg.click_current;
        self.parking_brake_mode = cfg.parking_brake_mode;
        self.main_freq = (hertz / 2).max(1);
    }

    /// Request a motor current for this tick.
    #[inline]
    pub fn request_current(&mut self, current: f32) {
        self.request = Request::Current(current);
    }

    /// Request a duty cycle for this tick. Takes precedence over a current request.
    #[inline]
    pub fn request_duty(&mut self, duty: f32) {
        self.request = Request::Duty(duty);
    }

    /// Start a tone at `frequency` [Hz] with `intensity` [A] of current offset.
    pub fn play_tone(&mut self, frequency: u16, intensity: f32) {
        let ticks = (self.main_freq / frequency.max(1)).max(1);
        if self.tone.ticks != ticks {
            self.tone.counter = ticks;
        }
        self.tone.ticks = ticks;
        self.tone.intensity = intensity;
        self.tone.clicks = 0;
    }

    pub fn stop_tone(&mut self) {
        self.tone = Tone::default();
    }

    /// Short audible click, when configured.
    pub fn play_click(&mut self) {
        if self.click_current <= 0.0 {
            return;
        }
        self.play_tone(CLICK_FREQUENCY, self.click_current);
        self.tone.clicks = CLICK_HALF_PERIODS;
    }

    #[inline]
    pub fn is_tone_playing(&self) -> bool {
        self.tone.ticks > 0
    }

    #[inline]
    pub fn parking_brake_active(&self) -> bool {
        self.parking_brake_active
    }

    /// Issue this tick's motor command and clear the request.
    pub fn apply<M: MotorDriver + ?Sized>(
        &mut self,
        motor: &mut M,
        abs_erpm: f32,
        state: RunState,
        time: &Time,
    ) {
        let request = std::mem::replace(&mut self.request, Request::None);

        if state == RunState::Disabled {
            if !self.disabled {
                motor.set_current(0.0);
                self.disabled = true;
                debug!("Motor released, package disabled");
            }
            return;
        }
        self.disabled = false;

        // The idle brake latches once the board stood still and only lets go
        // when riding resumes.
        self.parking_brake_active = match self.parking_brake_mode {
            ParkingBrakeMode::Always => true,
            ParkingBrakeMode::Never => false,
            ParkingBrakeMode::Idle if state == RunState::Running => false,
            ParkingBrakeMode::Idle => {
                self.parking_brake_active || abs_erpm < PARKING_BRAKE_IDLE_ERPM
            }
        };

        let request = match (request, self.tone_offset()) {
            (Request::Current(c), Some(offset)) => Request::Current(c + offset),
            (Request::None, Some(offset)) => Request::Current(offset),
            (r, _) => r,
        };

        motor.timeout_reset();

        match request {
            Request::Current(current) => {
                motor.set_current_off_delay(CURRENT_OFF_DELAY_S);
                motor.set_current(current);
            }
            Request::Duty(duty) => motor.set_duty(duty),
            Request::None => {
                if abs_erpm > ERPM_MOVING_THRESHOLD {
                    time.refresh(&mut self.brake_timer);
                }
                if time.older(self.brake_timer, BRAKE_RELEASE_S) {
                    motor.set_current(0.0);
                } else if self.parking_brake_active && abs_erpm < PARKING_BRAKE_MAX_ERPM {
                    motor.set_duty(0.0);
                } else {
                    motor.set_brake_current(self.brake_current);
                }
            }
        }
    }

    /// Advance the tone by one tick and return its current offset.
    ///
    /// The half period flips before the offset is taken; a click that ends
    /// this tick still contributes its low half.
    fn tone_offset(&mut self) -> Option<f32> {
        if self.tone.ticks == 0 {
            return None;
        }
        let intensity = self.tone.intensity;

        self.tone.counter = self.tone.counter.saturating_sub(1);
        if self.tone.counter == 0 {
            self.tone.counter = self.tone.ticks;
            self.tone.high = !self.tone.high;
            if self.tone.clicks > 0 {
                self.tone.clicks -= 1;
                if self.tone.clicks == 0 {
                    self.stop_tone();
                }
            }
        }
        Some(if self.tone.high { intensity } else { -intensity })
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
