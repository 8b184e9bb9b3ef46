//! Ride state: primary state, mode, setpoint adjustment and stop reason.
//!
//! `sat` is only meaningful while running and `stop_condition` only while
//! ready. The legacy status code packed into telemetry is derived on demand
//! by [`State::compat`].

use refloat_common::ride::state::{
    CompatSat, CompatStatus, Mode, RunState, SetpointAdjustmentType, StopCondition,
};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub state: RunState,
    pub mode: Mode,
    pub sat: SetpointAdjustmentType,
    pub stop_condition: StopCondition,
    pub charging: bool,
    pub wheelslip: bool,
    /// Riding upside down.
    pub darkride: bool,
}

impl State {
    pub fn new(disabled: bool) -> Self {
        Self {
            state: if disabled {
                RunState::Disabled
            } else {
                RunState::Startup
            },
            mode: Mode::Normal,
            sat: SetpointAdjustmentType::None,
            stop_condition: StopCondition::None,
            charging: false,
            wheelslip: false,
            darkride: false,
        }
    }

    /// IMU settled: leave startup.
    pub fn mark_ready(&mut self) {
        if self.state == RunState::Startup {
            self.state = RunState::Ready;
            info!("Ready");
        }
    }

    /// Stop riding for `reason`. No effect while disabled.
    pub fn stop(&mut self, reason: StopCondition) {
        if self.state == RunState::Disabled {
            return;
        }
        if self.state == RunState::Running {
            info!("Disengaged: {reason:?}");
        }
        self.state = RunState::Ready;
        self.stop_condition = reason;
        self.wheelslip = false;
    }

    /// Start riding. Only possible from ready and while not charging.
    pub fn engage(&mut self) -> bool {
        if self.state != RunState::Ready || self.charging {
            debug!(state = ?self.state, charging = self.charging, "Engage refused");
            return false;
        }
        self.state = RunState::Running;
        self.sat = SetpointAdjustmentType::Centering;
        self.stop_condition = StopCondition::None;
        info!("Engaged");
        true
    }

    /// Legacy 4-bit status code.
    pub fn compat(&self) -> CompatStatus {
        if self.charging {
            return CompatStatus::Charging;
        }
        match self.state {
            RunState::Disabled => CompatStatus::Disabled,
            RunState::Startup => CompatStatus::Startup,
            RunState::Ready => match self.stop_condition {
                StopCondition::None => CompatStatus::FaultStartup,
                StopCondition::Pitch => CompatStatus::FaultAnglePitch,
                StopCondition::Roll => CompatStatus::FaultAngleRoll,
                StopCondition::SwitchHalf => CompatStatus::FaultSwitchHalf,
                StopCondition::SwitchFull => CompatStatus::FaultSwitchFull,
                StopCondition::ReverseStop => CompatStatus::FaultReverse,
                StopCondition::Quickstop => CompatStatus::FaultQuickstop,
            },
            RunState::Running => {
                if self.sat > SetpointAdjustmentType::PbDuty {
                    CompatStatus::RunningTiltback
                } else if self.wheelslip {
                    CompatStatus::RunningWheelslip
                } else if self.darkride {
                    CompatStatus::RunningUpsideDown
                } else if self.mode == Mode::Flywheel {
                    CompatStatus::RunningFlywheel
                } else {
                    CompatStatus::Running
                }
            }
        }
    }

    /// Legacy 4-bit SAT code.
    #[inline]
    pub fn sat_compat(&self) -> CompatSat {
        CompatSat::from(self.sat)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(false)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
