//! Ride state enums.
//!
//! All enums use `#[repr(u8)]` so their discriminants double as the values
//! packed into status bytes and data-recorder flags. Discriminant values are
//! an external contract and must not be renumbered.

use serde::{Deserialize, Serialize};

// ─── Primary State ──────────────────────────────────────────────────

/// Primary ride state.
///
/// `Disabled` is only ever selected at construction; nothing transitions
/// into it at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum RunState {
    /// Package configured disabled. Motor is held at zero current.
    Disabled = 0,
    /// Waiting for the IMU to finish its startup sequence.
    Startup = 1,
    /// Idle, ready to engage.
    Ready = 2,
    /// Balancing.
    Running = 3,
}

impl RunState {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Disabled),
            1 => Some(Self::Startup),
            2 => Some(Self::Ready),
            3 => Some(Self::Running),
            _ => None,
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::Startup
    }
}

/// Ride mode, orthogonal to [`RunState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Mode {
    Normal = 0,
    /// Board held in the hand, reduced current.
    Handtest = 1,
    /// Wheel spun up for flywheel tricks, footpad checks inverted.
    Flywheel = 2,
}

impl Mode {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Normal),
            1 => Some(Self::Handtest),
            2 => Some(Self::Flywheel),
            _ => None,
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::Normal
    }
}

// ─── Saturation ─────────────────────────────────────────────────────

/// Setpoint adjustment type (SAT): why the setpoint is currently being moved.
///
/// Only meaningful while [`RunState::Running`]. Values above `PbDuty` are
/// pushback caused by an error condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SetpointAdjustmentType {
    None = 0,
    /// Setpoint returning to zero right after engage.
    Centering = 1,
    /// Reverse stop tilting the nose up.
    ReverseStop = 2,
    /// Duty-cycle pushback.
    PbDuty = 6,
    /// High battery voltage pushback.
    PbHighVoltage = 10,
    /// Low battery voltage pushback.
    PbLowVoltage = 11,
    /// Mosfet or motor temperature pushback.
    PbTemperature = 12,
}

impl SetpointAdjustmentType {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Centering),
            2 => Some(Self::ReverseStop),
            6 => Some(Self::PbDuty),
            10 => Some(Self::PbHighVoltage),
            11 => Some(Self::PbLowVoltage),
            12 => Some(Self::PbTemperature),
            _ => None,
        }
    }

    /// True for pushback caused by a voltage or temperature error.
    #[inline]
    pub fn is_error_pushback(&self) -> bool {
        *self > Self::PbDuty
    }
}

impl Default for SetpointAdjustmentType {
    fn default() -> Self {
        Self::None
    }
}

// ─── Stop Condition ─────────────────────────────────────────────────

/// Reason the board last left [`RunState::Running`].
///
/// Only meaningful while [`RunState::Ready`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StopCondition {
    None = 0,
    Pitch = 1,
    Roll = 2,
    SwitchHalf = 3,
    SwitchFull = 4,
    ReverseStop = 5,
    Quickstop = 6,
}

impl StopCondition {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Pitch),
            2 => Some(Self::Roll),
            3 => Some(Self::SwitchHalf),
            4 => Some(Self::SwitchFull),
            5 => Some(Self::ReverseStop),
            6 => Some(Self::Quickstop),
            _ => None,
        }
    }
}

impl Default for StopCondition {
    fn default() -> Self {
        Self::None
    }
}

// ─── Footpad ────────────────────────────────────────────────────────

/// Which halves of the footpad sensor are pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FootpadSensorState {
    None = 0,
    Left = 1,
    Right = 2,
    Both = 3,
}

impl FootpadSensorState {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Left),
            2 => Some(Self::Right),
            3 => Some(Self::Both),
            _ => None,
        }
    }

    /// Combine the two half-sensor readings.
    #[inline]
    pub const fn from_halves(left: bool, right: bool) -> Self {
        match (left, right) {
            (false, false) => Self::None,
            (true, false) => Self::Left,
            (false, true) => Self::Right,
            (true, true) => Self::Both,
        }
    }
}

impl Default for FootpadSensorState {
    fn default() -> Self {
        Self::None
    }
}

// ─── Compatibility Status ───────────────────────────────────────────

/// Externally visible status code consumed by companion apps.
///
/// Values are fixed; 10 is retired and never produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompatStatus {
    Startup = 0,
    Running = 1,
    RunningTiltback = 2,
    RunningWheelslip = 3,
    RunningUpsideDown = 4,
    RunningFlywheel = 5,
    FaultAnglePitch = 6,
    FaultAngleRoll = 7,
    FaultSwitchHalf = 8,
    FaultSwitchFull = 9,
    FaultStartup = 11,
    FaultReverse = 12,
    FaultQuickstop = 13,
    Charging = 14,
    Disabled = 15,
}

impl CompatStatus {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Startup),
            1 => Some(Self::Running),
            2 => Some(Self::RunningTiltback),
            3 => Some(Self::RunningWheelslip),
            4 => Some(Self::RunningUpsideDown),
            5 => Some(Self::RunningFlywheel),
            6 => Some(Self::FaultAnglePitch),
            7 => Some(Self::FaultAngleRoll),
            8 => Some(Self::FaultSwitchHalf),
            9 => Some(Self::FaultSwitchFull),
            11 => Some(Self::FaultStartup),
            12 => Some(Self::FaultReverse),
            13 => Some(Self::FaultQuickstop),
            14 => Some(Self::Charging),
            15 => Some(Self::Disabled),
            _ => None,
        }
    }
}

/// Saturation code reported next to [`CompatStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum CompatSat {
    Centering = 0,
    ReverseStop = 1,
    None = 2,
    PbDuty = 3,
    PbHighVoltage = 4,
    PbLowVoltage = 5,
    PbTemperature = 6,
}

impl From<SetpointAdjustmentType> for CompatSat {
    fn from(sat: SetpointAdjustmentType) -> Self {
        match sat {
            SetpointAdjustmentType::Centering => Self::Centering,
            SetpointAdjustmentType::ReverseStop => Self::ReverseStop,
            SetpointAdjustmentType::None => Self::None,
            SetpointAdjustmentType::PbDuty => Self::PbDuty,
            SetpointAdjustmentType::PbHighVoltage => Self::PbHighVoltage,
            SetpointAdjustmentType::PbLowVoltage => Self::PbLowVoltage,
            SetpointAdjustmentType::PbTemperature => Self::PbTemperature,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
