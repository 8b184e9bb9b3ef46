//! Ride tuning configuration.
//!
//! All config types use `serde::Deserialize` for TOML loading. Every section
//! carries `#[serde(default)]` so partial files are accepted; numeric
//! parameters with hard limits have const `MIN`/`MAX` bounds checked by
//! [`RefloatConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_LOOP_HERTZ;

// ─── Bounds ─────────────────────────────────────────────────────────

/// Control loop frequency bounds [Hz].
pub const HERTZ_MIN: u16 = 100;
pub const HERTZ_MAX: u16 = 5000;

/// Maximum fault angle [deg].
pub const FAULT_ANGLE_MAX: f32 = 180.0;

/// Maximum data recorder capacity [samples].
pub const RECORDER_CAPACITY_MAX: usize = 100_000;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete ride configuration.
///
/// Loaded once at package start. The ride controller copies what it needs
/// during construction; nothing reads the config from the tick path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefloatConfig {
    /// Start in `RunState::Disabled` and never drive the motor.
    #[serde(default)]
    pub disabled: bool,

    /// Control loop frequency [Hz] (default: 800).
    #[serde(default = "default_hertz")]
    pub hertz: u16,

    /// Fatal alerts stay latched until explicitly cleared (default: true).
    #[serde(default = "default_true")]
    pub persistent_fatal_error: bool,

    #[serde(default)]
    pub startup: CfgStartup,
    #[serde(default)]
    pub faults: CfgFaults,
    #[serde(default)]
    pub tiltback: CfgTiltback,
    #[serde(default)]
    pub atr: CfgAtr,
    #[serde(default)]
    pub torque_tilt: CfgTorqueTilt,
    #[serde(default)]
    pub turn_tilt: CfgTurnTilt,
    #[serde(default)]
    pub brake_tilt: CfgBrakeTilt,
    #[serde(default)]
    pub input_tilt: CfgInputTilt,
    #[serde(default)]
    pub pid: CfgPid,
    #[serde(default)]
    pub booster: CfgBooster,
    #[serde(default)]
    pub motor: CfgMotor,
    #[serde(default)]
    pub haptic: CfgHaptic,
    #[serde(default)]
    pub surge: CfgSurge,
    #[serde(default)]
    pub bms: CfgBms,
    #[serde(default)]
    pub recorder: CfgRecorder,
}

fn default_hertz() -> u16 {
    DEFAULT_LOOP_HERTZ
}
fn default_true() -> bool {
    true
}

impl Default for RefloatConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            hertz: DEFAULT_LOOP_HERTZ,
            persistent_fatal_error: true,
            startup: CfgStartup::default(),
            faults: CfgFaults::default(),
            tiltback: CfgTiltback::default(),
            atr: CfgAtr::default(),
            torque_tilt: CfgTorqueTilt::default(),
            turn_tilt: CfgTurnTilt::default(),
            brake_tilt: CfgBrakeTilt::default(),
            input_tilt: CfgInputTilt::default(),
            pid: CfgPid::default(),
            booster: CfgBooster::default(),
            motor: CfgMotor::default(),
            haptic: CfgHaptic::default(),
            surge: CfgSurge::default(),
            bms: CfgBms::default(),
            recorder: CfgRecorder::default(),
        }
    }
}

impl RefloatConfig {
    /// Validate parameter bounds.
    pub fn validate(&self) -> Result<(), String> {
        if self.hertz < HERTZ_MIN || self.hertz > HERTZ_MAX {
            return Err(format!(
                "hertz {} out of range [{}, {}]",
                self.hertz, HERTZ_MIN, HERTZ_MAX
            ));
        }
        self.startup.validate()?;
        self.faults.validate()?;
        self.tiltback.validate()?;
        self.atr.validate()?;
        self.torque_tilt.validate()?;
        self.turn_tilt.validate()?;
        self.brake_tilt.validate()?;
        self.input_tilt.validate()?;
        self.pid.validate()?;
        self.booster.validate()?;
        self.motor.validate()?;
        self.haptic.validate()?;
        self.surge.validate()?;
        self.bms.validate()?;
        if self.recorder.capacity > RECORDER_CAPACITY_MAX {
            return Err(format!(
                "recorder.capacity {} exceeds {}",
                self.recorder.capacity, RECORDER_CAPACITY_MAX
            ));
        }
        Ok(())
    }

    /// Seconds per control loop tick.
    #[inline]
    pub fn dt(&self) -> f32 {
        1.0 / self.hertz as f32
    }
}

// ─── Startup ────────────────────────────────────────────────────────

/// Engage conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgStartup {
    /// Max |pitch| to engage [deg].
    pub pitch_tolerance: f32,
    /// Max |roll| to engage [deg].
    pub roll_tolerance: f32,
    /// Setpoint centering speed after engage [deg/s].
    pub speed: f32,
    /// Allow engaging with a single footpad half pressed.
    pub simple_start_enabled: bool,
}

impl Default for CfgStartup {
    fn default() -> Self {
        Self {
            pitch_tolerance: 8.0,
            roll_tolerance: 45.0,
            speed: 30.0,
            simple_start_enabled: true,
        }
    }
}

impl CfgStartup {
    fn validate(&self) -> Result<(), String> {
        if self.pitch_tolerance <= 0.0 || self.roll_tolerance <= 0.0 {
            return Err("startup tolerances must be positive".to_string());
        }
        if self.speed <= 0.0 {
            return Err(format!("startup.speed {} must be positive", self.speed));
        }
        Ok(())
    }
}

// ─── Faults ─────────────────────────────────────────────────────────

/// Disengage conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgFaults {
    /// Pitch fault angle [deg].
    pub pitch: f32,
    /// Roll fault angle [deg].
    pub roll: f32,
    /// Footpad half thresholds [V].
    pub adc1: f32,
    pub adc2: f32,
    /// Fault delays [ms].
    pub delay_pitch: u16,
    pub delay_roll: u16,
    pub delay_switch_half: u16,
    pub delay_switch_full: u16,
    /// Half-switch faults only fire below this |ERPM|.
    pub adc_half_erpm: u16,
    /// Footpad halves are wired as one switch.
    pub is_dual_switch: bool,
    /// Ignore footpad faults while moving.
    pub moving_fault_disabled: bool,
    /// Allow riding upside down.
    pub darkride_enabled: bool,
    /// Reverse stop instead of a plain switch fault when rolling backwards.
    pub reversestop_enabled: bool,
}

impl Default for CfgFaults {
    fn default() -> Self {
        Self {
            pitch: 60.0,
            roll: 60.0,
            adc1: 2.0,
            adc2: 2.0,
            delay_pitch: 250,
            delay_roll: 250,
            delay_switch_half: 100,
            delay_switch_full: 250,
            adc_half_erpm: 400,
            is_dual_switch: false,
            moving_fault_disabled: false,
            darkride_enabled: false,
            reversestop_enabled: false,
        }
    }
}

impl CfgFaults {
    fn validate(&self) -> Result<(), String> {
        for (name, angle) in [("pitch", self.pitch), ("roll", self.roll)] {
            if angle <= 0.0 || angle > FAULT_ANGLE_MAX {
                return Err(format!(
                    "faults.{name} {angle} out of range (0, {FAULT_ANGLE_MAX}]"
                ));
            }
        }
        if self.adc1 < 0.0 || self.adc2 < 0.0 {
            return Err("faults.adc thresholds must not be negative".to_string());
        }
        Ok(())
    }
}

// ─── Tiltback ───────────────────────────────────────────────────────

/// Pushback (setpoint tilt) limits.
///
/// A voltage or temperature threshold of 0 disables that pushback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgTiltback {
    /// Duty cycle that starts duty pushback [0..1].
    pub duty: f32,
    pub duty_angle: f32,
    pub duty_speed: f32,
    /// High battery voltage threshold [V].
    pub hv: f32,
    pub hv_angle: f32,
    pub hv_speed: f32,
    /// Low battery voltage threshold [V].
    pub lv: f32,
    pub lv_angle: f32,
    pub lv_speed: f32,
    /// Mosfet temperature threshold [°C].
    pub mosfet_temp: f32,
    /// Motor temperature threshold [°C].
    pub motor_temp: f32,
    /// Setpoint return speed once pushback ends [deg/s].
    pub return_speed: f32,
    /// Constant nose lift above `constant_erpm` [deg].
    pub constant: f32,
    pub constant_erpm: f32,
    /// Speed-proportional nose lift [deg per 1000 ERPM].
    pub variable: f32,
    /// Cap on the speed-proportional lift [deg].
    pub variable_max: f32,
    /// Speed-proportional lift starts above this |ERPM|.
    pub variable_erpm: f32,
    /// Nose angling speed [deg/s].
    pub noseangling_speed: f32,
}

impl Default for CfgTiltback {
    fn default() -> Self {
        Self {
            duty: 0.8,
            duty_angle: 10.0,
            duty_speed: 3.0,
            hv: 0.0,
            hv_angle: 10.0,
            hv_speed: 3.0,
            lv: 0.0,
            lv_angle: 10.0,
            lv_speed: 3.0,
            mosfet_temp: 85.0,
            motor_temp: 0.0,
            return_speed: 5.0,
            constant: 0.0,
            constant_erpm: 500.0,
            variable: 0.0,
            variable_max: 1.0,
            variable_erpm: 0.0,
            noseangling_speed: 5.0,
        }
    }
}

impl CfgTiltback {
    fn validate(&self) -> Result<(), String> {
        if self.duty <= 0.0 || self.duty > 1.0 {
            return Err(format!("tiltback.duty {} out of range (0, 1]", self.duty));
        }
        if self.hv > 0.0 && self.lv > 0.0 && self.hv <= self.lv {
            return Err(format!(
                "tiltback.hv {} must be above tiltback.lv {}",
                self.hv, self.lv
            ));
        }
        if self.duty_speed <= 0.0
            || self.hv_speed <= 0.0
            || self.lv_speed <= 0.0
            || self.return_speed <= 0.0
        {
            return Err("tiltback speeds must be positive".to_string());
        }
        if self.noseangling_speed <= 0.0 {
            return Err("tiltback.noseangling_speed must be positive".to_string());
        }
        if self.variable_max < 0.0 {
            return Err("tiltback.variable_max must not be negative".to_string());
        }
        Ok(())
    }
}

// ─── Tilt Contributors ──────────────────────────────────────────────
//
// Each contributor adds an offset on top of the pushback setpoint while
// running. Every contributor defaults to zero strength (off).

/// Adaptive torque response: nose lift from the gap between the
/// acceleration the motor current should produce and the measured one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgAtr {
    /// Tilt per unit of acceleration gap, uphill [deg].
    pub strength_up: f32,
    /// Tilt per unit of acceleration gap, downhill [deg].
    pub strength_down: f32,
    /// Dead band on the tilt target while accelerating [deg].
    pub threshold_up: f32,
    /// Dead band on the tilt target while braking [deg].
    pub threshold_down: f32,
    pub angle_limit: f32,
    /// Tilt speeds [deg/s].
    pub on_speed: f32,
    pub off_speed: f32,
    /// Step multiplier above 2500 ERPM (squared above 6000 ERPM).
    pub response_boost: f32,
    /// Step multiplier when the target reverses direction.
    pub transition_boost: f32,
    /// Current per unit of acceleration [A].
    pub amps_accel_ratio: f32,
    pub amps_decel_ratio: f32,
    /// Extra strength at speed [-1..1].
    pub speed_boost: f32,
}

impl Default for CfgAtr {
    fn default() -> Self {
        Self {
            strength_up: 0.0,
            strength_down: 0.0,
            threshold_up: 0.5,
            threshold_down: 0.5,
            angle_limit: 10.0,
            on_speed: 4.0,
            off_speed: 3.0,
            response_boost: 1.5,
            transition_boost: 3.0,
            amps_accel_ratio: 10.0,
            amps_decel_ratio: 10.0,
            speed_boost: 0.3,
        }
    }
}

impl CfgAtr {
    fn validate(&self) -> Result<(), String> {
        if self.strength_up < 0.0 || self.strength_down < 0.0 {
            return Err("atr strengths must not be negative".to_string());
        }
        if self.on_speed <= 0.0 || self.off_speed <= 0.0 {
            return Err("atr speeds must be positive".to_string());
        }
        if self.amps_accel_ratio <= 0.0 || self.amps_decel_ratio <= 0.0 {
            return Err("atr amps ratios must be positive".to_string());
        }
        if !(-1.0..=1.0).contains(&self.speed_boost) {
            return Err(format!(
                "atr.speed_boost {} out of range [-1, 1]",
                self.speed_boost
            ));
        }
        Ok(())
    }
}

/// Nose lift proportional to motor current.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgTorqueTilt {
    /// Tilt per amp above `start_current` [deg/A].
    pub strength: f32,
    /// Same while braking [deg/A].
    pub strength_regen: f32,
    pub start_current: f32,
    pub angle_limit: f32,
    /// Tilt speeds [deg/s].
    pub on_speed: f32,
    pub off_speed: f32,
}

impl Default for CfgTorqueTilt {
    fn default() -> Self {
        Self {
            strength: 0.0,
            strength_regen: 0.0,
            start_current: 15.0,
            angle_limit: 8.0,
            on_speed: 5.0,
            off_speed: 3.0,
        }
    }
}

impl CfgTorqueTilt {
    fn validate(&self) -> Result<(), String> {
        if self.strength < 0.0 || self.strength_regen < 0.0 {
            return Err("torque_tilt strengths must not be negative".to_string());
        }
        if self.on_speed <= 0.0 || self.off_speed <= 0.0 {
            return Err("torque_tilt speeds must be positive".to_string());
        }
        Ok(())
    }
}

/// Nose lift while carving, from the yaw rate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgTurnTilt {
    /// Tilt per degree of yaw change per tick (0 = off).
    pub strength: f32,
    pub angle_limit: f32,
    /// Minimum aggregated yaw before tilting [deg].
    pub start_angle: f32,
    pub start_erpm: f32,
    /// Tilt speed [deg/s].
    pub speed: f32,
    /// Extra strength at `erpm_boost_end` [%].
    pub erpm_boost: f32,
    pub erpm_boost_end: f32,
    /// Aggregated yaw that doubles the tilt [deg].
    pub yaw_aggregate: f32,
}

impl Default for CfgTurnTilt {
    fn default() -> Self {
        Self {
            strength: 0.0,
            angle_limit: 3.0,
            start_angle: 2.0,
            start_erpm: 1000.0,
            speed: 5.0,
            erpm_boost: 200.0,
            erpm_boost_end: 5000.0,
            yaw_aggregate: 90.0,
        }
    }
}

impl CfgTurnTilt {
    fn validate(&self) -> Result<(), String> {
        if self.strength < 0.0 {
            return Err("turn_tilt.strength must not be negative".to_string());
        }
        if self.speed <= 0.0 || self.erpm_boost_end <= 0.0 || self.yaw_aggregate <= 0.0 {
            return Err("turn_tilt speed, erpm_boost_end and yaw_aggregate must be positive".to_string());
        }
        Ok(())
    }
}

/// Lingering nose lift after hard braking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgBrakeTilt {
    /// 0 = off, up to 20 = strongest.
    pub strength: f32,
    /// Slows the return to level (1 = ATR off speed).
    pub lingering: f32,
}

impl Default for CfgBrakeTilt {
    fn default() -> Self {
        Self {
            strength: 0.0,
            lingering: 2.0,
        }
    }
}

impl CfgBrakeTilt {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..=20.0).contains(&self.strength) {
            return Err(format!(
                "brake_tilt.strength {} out of range [0, 20]",
                self.strength
            ));
        }
        Ok(())
    }
}

/// Setpoint tilt from the remote's throttle axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgInputTilt {
    pub enabled: bool,
    /// Tilt at full throttle [deg].
    pub angle_limit: f32,
    /// Tilt speed [deg/s].
    pub speed: f32,
    /// Throttle dead band [0..1).
    pub deadband: f32,
    pub invert_throttle: bool,
}

impl Default for CfgInputTilt {
    fn default() -> Self {
        Self {
            enabled: false,
            angle_limit: 10.0,
            speed: 25.0,
            deadband: 0.0,
            invert_throttle: false,
        }
    }
}

impl CfgInputTilt {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.deadband) {
            return Err(format!(
                "input_tilt.deadband {} out of range [0, 1)",
                self.deadband
            ));
        }
        if self.speed <= 0.0 {
            return Err("input_tilt.speed must be positive".to_string());
        }
        Ok(())
    }
}

// ─── Booster ────────────────────────────────────────────────────────

/// Extra current once the board leans past an angle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CfgBoost {
    /// Lean beyond the setpoint that starts the boost [deg].
    pub angle: f32,
    /// Lean over which the boost ramps to full [deg].
    pub ramp: f32,
    /// Full boost [A] (0 = off).
    pub current: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgBooster {
    pub accel: CfgBoost,
    pub brake: CfgBoost,
}

impl Default for CfgBooster {
    fn default() -> Self {
        let off = CfgBoost {
            angle: 8.0,
            ramp: 4.0,
            current: 0.0,
        };
        Self {
            accel: off,
            brake: off,
        }
    }
}

impl CfgBooster {
    fn validate(&self) -> Result<(), String> {
        for (name, b) in [("accel", self.accel), ("brake", self.brake)] {
            if b.ramp <= 0.0 || b.current < 0.0 {
                return Err(format!(
                    "booster.{name}: ramp must be positive and current not negative"
                ));
            }
        }
        Ok(())
    }
}

// ─── Balance PID ────────────────────────────────────────────────────

/// Balance controller gains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgPid {
    /// Angle P [A/deg].
    pub kp: f32,
    /// Angle I [A/deg/tick].
    pub ki: f32,
    /// Rate P [A/(deg/s)].
    pub kp2: f32,
    /// Angle P scale while braking.
    pub kp_brake: f32,
    /// Rate P scale while braking.
    pub kp2_brake: f32,
    /// Integrator clamp [A] (0 = unlimited).
    pub ki_limit: f32,
}

impl Default for CfgPid {
    fn default() -> Self {
        Self {
            kp: 20.0,
            ki: 0.005,
            kp2: 0.6,
            kp_brake: 1.0,
            kp2_brake: 1.0,
            ki_limit: 30.0,
        }
    }
}

impl CfgPid {
    fn validate(&self) -> Result<(), String> {
        if self.kp < 0.0 || self.ki < 0.0 || self.kp2 < 0.0 {
            return Err("pid gains must not be negative".to_string());
        }
        if self.kp_brake <= 0.0 || self.kp2_brake <= 0.0 {
            return Err("pid brake scales must be positive".to_string());
        }
        if self.ki_limit < 0.0 {
            return Err(format!("pid.ki_limit {} must not be negative", self.ki_limit));
        }
        Ok(())
    }
}

// ─── Motor ──────────────────────────────────────────────────────────

/// When the parking brake may hold the board with duty-cycle zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ParkingBrakeMode {
    Always,
    /// Only when not running and nearly stopped.
    #[default]
    Idle,
    Never,
}

/// Motor command limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgMotor {
    /// Holding brake current while stopped [A].
    pub brake_current: f32,
    /// Engage/disengage click strength [A] (0 = off).
    pub click_current: f32,
    pub parking_brake_mode: ParkingBrakeMode,
    /// Motor current limits [A], both positive.
    pub current_max: f32,
    pub current_min: f32,
    /// Battery current limits [A], both positive.
    pub battery_current_max: f32,
    pub battery_current_min: f32,
    /// Motor current low-pass cutoff [Hz] (0 = unfiltered).
    pub current_filter: f32,
}

impl Default for CfgMotor {
    fn default() -> Self {
        Self {
            brake_current: 5.0,
            click_current: 0.0,
            parking_brake_mode: ParkingBrakeMode::Idle,
            current_max: 80.0,
            current_min: 80.0,
            battery_current_max: 60.0,
            battery_current_min: 30.0,
            current_filter: 0.0,
        }
    }
}

impl CfgMotor {
    fn validate(&self) -> Result<(), String> {
        if self.brake_current < 0.0 || self.click_current < 0.0 {
            return Err("motor brake/click currents must not be negative".to_string());
        }
        if self.current_max <= 0.0
            || self.current_min <= 0.0
            || self.battery_current_max <= 0.0
            || self.battery_current_min <= 0.0
        {
            return Err("motor current limits must be positive".to_string());
        }
        if self.current_filter < 0.0 {
            return Err("motor.current_filter must not be negative".to_string());
        }
        Ok(())
    }
}

// ─── Haptic Feedback ────────────────────────────────────────────────

/// A single tone: frequency [Hz] and strength (0 = silent).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CfgHapticTone {
    pub frequency: f32,
    pub strength: f32,
}

/// Haptic buzz settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgHaptic {
    /// Audible tone for duty pushback [V].
    pub duty: CfgHapticTone,
    /// Audible tone for error pushback [V].
    pub error: CfgHapticTone,
    /// Vibration injected into the motor current [A].
    pub vibrate: CfgHapticTone,
    /// Duty above `tiltback.duty + duty_solid_offset` buzzes continuously.
    pub duty_solid_offset: f32,
    /// Current saturation that buzzes continuously (0 = off).
    pub current_threshold: f32,
    /// Strength scale at standstill [0..1].
    pub min_strength: f32,
    /// 0 = linear ramp, 1 = all curvature.
    pub strength_curvature: f32,
    /// Speed where full strength is reached [km/h].
    pub max_strength_speed: f32,
}

impl Default for CfgHaptic {
    fn default() -> Self {
        Self {
            duty: CfgHapticTone {
                frequency: 1000.0,
                strength: 1.5,
            },
            error: CfgHapticTone {
                frequency: 1600.0,
                strength: 1.5,
            },
            vibrate: CfgHapticTone {
                frequency: 300.0,
                strength: 2.0,
            },
            duty_solid_offset: 0.05,
            current_threshold: 0.0,
            min_strength: 0.3,
            strength_curvature: 0.5,
            max_strength_speed: 30.0,
        }
    }
}

impl CfgHaptic {
    fn validate(&self) -> Result<(), String> {
        for (name, tone) in [
            ("duty", self.duty),
            ("error", self.error),
            ("vibrate", self.vibrate),
        ] {
            if tone.strength > 0.0 && tone.frequency <= 0.0 {
                return Err(format!("haptic.{name}.frequency must be positive"));
            }
        }
        if !(0.0..=1.0).contains(&self.min_strength) {
            return Err(format!(
                "haptic.min_strength {} out of range [0, 1]",
                self.min_strength
            ));
        }
        if !(0.0..=1.0).contains(&self.strength_curvature) {
            return Err(format!(
                "haptic.strength_curvature {} out of range [0, 1]",
                self.strength_curvature
            ));
        }
        Ok(())
    }
}

// ─── Surge ──────────────────────────────────────────────────────────

/// Surge (open-loop duty burst) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgSurge {
    pub enabled: bool,
    /// Current that starts a surge at low duty [A].
    pub start_current: f32,
    /// Current that starts a surge at 95% duty [A].
    pub start_hd_current: f32,
    /// Duty [%] where the start current begins scaling down.
    pub scale_duty: f32,
    /// High-current detection fires this far below the start current [A].
    pub overcurrent_margin: f32,
    /// Minimum |ERPM| for surge.
    pub min_erpm: f32,
    /// Duty ramp during a surge [%/s].
    pub duty: f32,
    /// Max nose drop during a surge [deg].
    pub max_angle: f32,
}

impl Default for CfgSurge {
    fn default() -> Self {
        Self {
            enabled: false,
            start_current: 50.0,
            start_hd_current: 35.0,
            scale_duty: 50.0,
            overcurrent_margin: 5.0,
            min_erpm: 1000.0,
            duty: 20.0,
            max_angle: 1.5,
        }
    }
}

impl CfgSurge {
    fn validate(&self) -> Result<(), String> {
        if !(0.0..95.0).contains(&self.scale_duty) {
            return Err(format!(
                "surge.scale_duty {} out of range [0, 95)",
                self.scale_duty
            ));
        }
        if self.start_current <= 0.0 || self.start_hd_current <= 0.0 {
            return Err("surge start currents must be positive".to_string());
        }
        if self.duty <= 0.0 || self.max_angle <= 0.0 {
            return Err("surge duty ramp and max_angle must be positive".to_string());
        }
        Ok(())
    }
}

// ─── BMS ────────────────────────────────────────────────────────────

/// BMS fault thresholds.
///
/// Temperature thresholds of 0 disable the matching check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgBms {
    pub enabled: bool,
    /// Lowest cell voltage [V].
    pub cell_lv_threshold: f32,
    /// Highest cell voltage [V].
    pub cell_hv_threshold: f32,
    /// Lowest cell temperature [°C].
    pub cell_lt_threshold: i16,
    /// Highest cell temperature [°C].
    pub cell_ht_threshold: i16,
    /// BMS board temperature [°C].
    pub bms_ht_threshold: i16,
    /// Max spread between highest and lowest cell [V].
    pub cell_balance_threshold: f32,
}

impl Default for CfgBms {
    fn default() -> Self {
        Self {
            enabled: false,
            cell_lv_threshold: 2.8,
            cell_hv_threshold: 4.3,
            cell_lt_threshold: -10,
            cell_ht_threshold: 50,
            bms_ht_threshold: 60,
            cell_balance_threshold: 0.5,
        }
    }
}

impl CfgBms {
    fn validate(&self) -> Result<(), String> {
        if self.cell_lv_threshold >= self.cell_hv_threshold {
            return Err(format!(
                "bms.cell_lv_threshold {} must be below cell_hv_threshold {}",
                self.cell_lv_threshold, self.cell_hv_threshold
            ));
        }
        if self.cell_balance_threshold <= 0.0 {
            return Err("bms.cell_balance_threshold must be positive".to_string());
        }
        Ok(())
    }
}

// ─── Data Recorder ──────────────────────────────────────────────────

/// Data recorder buffer and trigger defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgRecorder {
    /// Ring capacity [samples] (0 = recorder unavailable).
    pub capacity: usize,
    /// Start recording on engage.
    pub autostart: bool,
    /// Stop recording on disengage.
    pub autostop: bool,
}

impl Default for CfgRecorder {
    fn default() -> Self {
        Self {
            capacity: 2000,
            autostart: true,
            autostop: true,
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = RefloatConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.hertz, 800);
        assert!(cfg.persistent_fatal_error);
        assert!((cfg.dt() - 0.00125).abs() < 1e-9);
    }

    #[test]
    fn empty_document_uses_defaults() {
        let cfg: RefloatConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.hertz, DEFAULT_LOOP_HERTZ);
        assert_eq!(cfg.motor.parking_brake_mode, ParkingBrakeMode::Idle);
        assert_eq!(cfg.faults.delay_switch_full, 250);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg: RefloatConfig = toml::from_str(
            r#"
[motor]
parking_brake_mode = "always"
"#,
        )
        .unwrap();
        assert_eq!(cfg.motor.parking_brake_mode, ParkingBrakeMode::Always);
        assert_eq!(cfg.motor.brake_current, 5.0);
    }

    #[test]
    fn hertz_out_of_range_rejected() {
        let cfg = RefloatConfig {
            hertz: 50,
            ..Default::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("hertz"));
    }

    #[test]
    fn inverted_voltage_thresholds_rejected() {
        let mut cfg = RefloatConfig::default();
        cfg.tiltback.hv = 40.0;
        cfg.tiltback.lv = 50.0;
        assert!(cfg.validate().unwrap_err().contains("tiltback.hv"));
    }

    #[test]
    fn haptic_strength_bounds() {
        let mut cfg = RefloatConfig::default();
        cfg.haptic.min_strength = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tilt_sections_default_off() {
        let cfg: RefloatConfig = toml::from_str(
            r#"
[atr]
strength_up = 1.5

[booster.accel]
angle = 6.0
ramp = 2.0
current = 10.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.atr.strength_up, 1.5);
        assert_eq!(cfg.atr.strength_down, 0.0);
        assert_eq!(cfg.booster.accel.current, 10.0);
        assert_eq!(cfg.booster.brake.current, 0.0);
        assert_eq!(cfg.torque_tilt.strength, 0.0);
        assert!(!cfg.input_tilt.enabled);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn tilt_bounds_rejected() {
        let mut cfg = RefloatConfig::default();
        cfg.brake_tilt.strength = 25.0;
        assert!(cfg.validate().unwrap_err().contains("brake_tilt"));

        let mut cfg = RefloatConfig::default();
        cfg.input_tilt.deadband = 1.0;
        assert!(cfg.validate().unwrap_err().contains("input_tilt"));
    }

    #[test]
    fn bms_threshold_order() {
        let mut cfg = RefloatConfig::default();
        cfg.bms.cell_lv_threshold = 4.5;
        assert!(cfg.validate().unwrap_err().contains("bms"));
    }
}
