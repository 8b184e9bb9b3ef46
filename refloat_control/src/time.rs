//! Tick-based time source and named timers.
//!
//! `now` is a snapshot of the host's monotonic tick counter taken once per
//! control tick. Timers are plain tick stamps compared against `now` with
//! wrapping arithmetic, so the counter rolling over is harmless as long as no
//! single interval exceeds `u32::MAX` ticks.

use refloat_common::consts::{DISENGAGE_TIMER_INITIAL_AGE_S, SYSTEM_TICK_RATE_HZ};
use refloat_common::ride::state::RunState;

/// Raw host tick count.
pub type Ticks = u32;

/// Per-tick time snapshot plus the timers shared across components.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Time {
    /// Tick count at the start of the current control tick.
    pub now: Ticks,
    /// Refreshed on engage.
    pub engage_timer: Ticks,
    /// Refreshed every tick while running; marks the last disengage.
    pub disengage_timer: Ticks,
    /// Refreshed every tick while running; marks the start of idling.
    pub idle_timer: Ticks,
    /// Package start.
    pub start_timer: Ticks,
    tick_rate: u32,
}

impl Time {
    /// Create a time source at `now` using the host tick rate.
    pub fn new(now: Ticks) -> Self {
        Self::with_tick_rate(now, SYSTEM_TICK_RATE_HZ)
    }

    /// Create a time source with an explicit tick rate [Hz].
    pub fn with_tick_rate(now: Ticks, tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            now,
            engage_timer: now,
            // Nothing should believe a disengage just happened at boot.
            disengage_timer: now.wrapping_sub(DISENGAGE_TIMER_INITIAL_AGE_S * tick_rate),
            idle_timer: now,
            start_timer: now,
            tick_rate,
        }
    }

    /// Ticks per second.
    #[inline]
    pub const fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    /// Take a new snapshot. While running, disengage and idle timers follow `now`.
    pub fn update(&mut self, now: Ticks, state: RunState) {
        self.now = now;
        if state == RunState::Running {
            self.disengage_timer = now;
            self.idle_timer = now;
        }
    }

    /// Stamp `timer` with the current tick.
    #[inline]
    pub fn refresh(&self, timer: &mut Ticks) {
        *timer = self.now;
    }

    /// Ticks elapsed since `timer`.
    #[inline]
    pub fn elapsed(&self, timer: Ticks) -> Ticks {
        self.now.wrapping_sub(timer)
    }

    /// True if more than `seconds` elapsed since `timer`.
    #[inline]
    pub fn older(&self, timer: Ticks, seconds: f32) -> bool {
        self.elapsed(timer) as f32 > seconds * self.tick_rate as f32
    }

    /// True if more than `ms` milliseconds elapsed since `timer`.
    #[inline]
    pub fn older_ms(&self, timer: Ticks, ms: f32) -> bool {
        self.older(timer, ms / 1000.0)
    }

    /// Seconds elapsed since `timer`.
    #[inline]
    pub fn age(&self, timer: Ticks) -> f32 {
        self.elapsed(timer) as f32 / self.tick_rate as f32
    }

    /// Convert a duration [s] to ticks, rounding down.
    #[inline]
    pub fn seconds_to_ticks(&self, seconds: f32) -> Ticks {
        (seconds.max(0.0) * self.tick_rate as f32) as Ticks
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
