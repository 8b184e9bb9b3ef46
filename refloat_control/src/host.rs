//! Host runtime interface.
//!
//! The ride core never touches hardware. Everything it needs from the motor
//! controller runtime is injected through two traits:
//!
//! - [`MotorDriver`] - the motor command setters and the safety timeout
//! - [`VescHost`] - tick counter, sensor snapshot, app-data sink and the
//!   shutdown flag, on top of [`MotorDriver`]
//!
//! Commands arriving from the app/CAN side are handed to the tick through the
//! [`inbox::CommandInbox`].

pub mod inbox;
pub mod sim;

use crate::time::Ticks;

// ─── Sensor Snapshot ────────────────────────────────────────────────

/// Motor telemetry sampled at the start of a tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotorSample {
    /// Electrical RPM, signed by direction.
    pub erpm: f32,
    /// Ground speed [m/s], signed.
    pub speed: f32,
    /// Motor current [A], negative while braking.
    pub current: f32,
    /// Motor current signed by direction of travel [A].
    pub dir_current: f32,
    /// Duty cycle [-1..1].
    pub duty_cycle: f32,
    pub batt_voltage: f32,
    pub batt_current: f32,
    /// Mosfet temperature [°C].
    pub mosfet_temp: f32,
    /// Motor temperature [°C].
    pub motor_temp: f32,
}

/// IMU angles as delivered by the host's attitude filter.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuSample {
    /// True pitch [deg].
    pub pitch: f32,
    /// Pitch used for balancing [deg].
    pub balance_pitch: f32,
    /// Roll [deg].
    pub roll: f32,
    /// Pitch rate [deg/s].
    pub pitch_rate: f32,
    /// Heading [deg], wraps at +/-180.
    pub yaw: f32,
    /// Attitude filter converged.
    pub startup_done: bool,
}

/// Footpad sensor voltages [V].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FootpadSample {
    pub adc1: f32,
    pub adc2: f32,
}

/// Latest BMS values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BmsSample {
    /// Lowest cell voltage [V].
    pub cell_lv: f32,
    /// Highest cell voltage [V].
    pub cell_hv: f32,
    /// Lowest cell temperature [°C].
    pub cell_lt: i16,
    /// Highest cell temperature [°C].
    pub cell_ht: i16,
    /// BMS board temperature [°C].
    pub bms_ht: i16,
    /// Seconds since the last BMS message.
    pub msg_age: f32,
}

/// Remote throttle axis.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RemoteSample {
    /// [-1..1]
    pub input: f32,
    /// Time since the remote last reported [s].
    pub age: f32,
}

/// Everything the tick reads from the host in one go.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorFrame {
    pub motor: MotorSample,
    pub imu: ImuSample,
    pub footpad: FootpadSample,
    /// `None` until the BMS reports for the first time.
    pub bms: Option<BmsSample>,
    /// `None` when no remote is paired.
    pub remote: Option<RemoteSample>,
    /// Active firmware fault code (0 = none).
    pub fw_fault_code: u8,
}

// ─── Traits ─────────────────────────────────────────────────────────

/// Motor command interface of the host runtime.
///
/// Exactly one of `set_current`, `set_duty` or `set_brake_current` is issued
/// per tick by [`crate::control::motor::MotorControl`], always after
/// `timeout_reset` (except for the single disable command).
pub trait MotorDriver {
    /// Command motor current [A].
    fn set_current(&mut self, current: f32);

    /// Delay before the controller switches off after a zero current [s].
    fn set_current_off_delay(&mut self, delay: f32);

    /// Command duty cycle [-1..1].
    fn set_duty(&mut self, duty: f32);

    /// Command brake current [A].
    fn set_brake_current(&mut self, current: f32);

    /// Reset the firmware command timeout.
    fn timeout_reset(&mut self);

    /// Play an audible tone through the motor windings.
    ///
    /// Default implementation does nothing (hosts without tone support).
    fn foc_play_tone(&mut self, _channel: u8, _frequency: f32, _voltage: f32) {}

    /// Stop any audible tone.
    fn foc_stop_tone(&mut self) {
        self.foc_play_tone(0, 1.0, 0.0);
    }

    /// Total filtered motor current, signed by direction [A].
    fn tot_current_directional_filtered(&self) -> f32;
}

/// Full host runtime as seen by the ride controller.
///
/// # Lifecycle
///
/// 1. `RideController::new()`: called once with the loaded config
/// 2. `RideController::tick()`: called every `1 / hertz` seconds
/// 3. The runner stops once `should_terminate()` returns true
pub trait VescHost: MotorDriver {
    /// Monotonic tick counter (wraps).
    fn system_time_ticks(&self) -> Ticks;

    /// Sensor snapshot for the current tick.
    fn sample(&mut self) -> SensorFrame;

    /// Send an app-data packet to the connected app.
    fn send_app_data(&mut self, data: &[u8]);

    /// Polled once per loop iteration.
    fn should_terminate(&self) -> bool;
}
