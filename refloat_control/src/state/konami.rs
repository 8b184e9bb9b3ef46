//! Footpad gesture ("konami code") detection.
//!
//! A gesture is a fixed sequence of footpad states. Each step must be held
//! for 0.15 s before the next one counts, and the whole gesture resets when
//! more than 0.5 s pass without progress or an unexpected state shows up.

use refloat_common::ride::state::FootpadSensorState;

use crate::time::{Ticks, Time};

use FootpadSensorState::{Left as L, None as N, Right as R};

/// Left, right, left, right with releases in between.
pub const FLYWHEEL_SEQUENCE: &[FootpadSensorState] = &[L, N, R, N, L, N, R];
pub const HEADLIGHTS_ON_SEQUENCE: &[FootpadSensorState] = &[L, N, L, N, R];
pub const HEADLIGHTS_OFF_SEQUENCE: &[FootpadSensorState] = &[R, N, R, N, L];

/// Max pause between steps [s].
const STEP_TIMEOUT_S: f32 = 0.5;
/// Min dwell on a step before the next one counts [s].
const STEP_DWELL_S: f32 = 0.15;

#[derive(Debug, Clone)]
pub struct Konami {
    sequence: &'static [FootpadSensorState],
    index: usize,
    timer: Ticks,
}

impl Konami {
    pub const fn new(sequence: &'static [FootpadSensorState]) -> Self {
        Self {
            sequence,
            index: 0,
            timer: 0,
        }
    }

    #[inline]
    pub fn progress(&self) -> usize {
        self.index
    }

    #[inline]
    fn reset(&mut self) {
        self.index = 0;
    }

    /// Feed the current footpad state. Returns true once the whole sequence
    /// has been entered. An empty sequence never completes.
    pub fn check(&mut self, fs: FootpadSensorState, time: &Time) -> bool {
        if self.index > 0 && time.older(self.timer, STEP_TIMEOUT_S) {
            self.reset();
            return false;
        }

        let Some(&expected) = self.sequence.get(self.index) else {
            return false;
        };

        if fs == expected {
            if time.older(self.timer, STEP_DWELL_S) {
                self.index += 1;
                if self.index == self.sequence.len() {
                    self.reset();
                    return true;
                }
                time.refresh(&mut self.timer);
            }
        } else if self.index > 0 && fs != self.sequence[self.index - 1] {
            self.reset();
        }
        false
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
