//! Ride controller: the owned context behind one control tick.
//!
//! [`RideController::tick`] runs once per control period:
//!
//! 1. time snapshot, IMU and motor data, remote and yaw tracking
//! 2. queued app commands, charging timeout, footpad, BMS and alerts, darkride
//! 3. haptic feedback
//! 4. the ride state machine (faults, setpoint, surge, PID and booster while running;
//!    gestures and engage checks while ready)
//! 5. the single motor command, alert finalize and the recorder sample
//!
//! Handtest and flywheel modes edit a working copy of the config; leaving
//! them restores the loaded one.

use std::sync::Arc;

use bitflags::bitflags;
use refloat_common::ride::config::RefloatConfig;
use refloat_common::ride::error::AlertId;
use refloat_common::ride::state::{
    CompatSat, CompatStatus, FootpadSensorState, Mode, RunState, SetpointAdjustmentType,
    StopCondition,
};
use tracing::{debug, info, warn};

use crate::control::booster::Booster;
use crate::control::haptic::HapticFeedback;
use crate::control::motor::MotorControl;
use crate::control::motor_data::MotorData;
use crate::control::pid::Pid;
use crate::control::setpoint::{REVERSE_TOLERANCE, Setpoint};
use crate::control::surge::{Surge, SurgeEvent, SurgeExit};
use crate::host::inbox::{AppCommand, CommandId, CommandInbox};
use crate::host::{ImuSample, SensorFrame, VescHost};
use crate::record::recorder::{DataRecorder, Sample};
use crate::record::rt_data::RtData;
use crate::safety::alert_tracker::AlertTracker;
use crate::safety::bms::Bms;
use crate::state::charging::Charging;
use crate::state::footpad::FootpadSensor;
use crate::state::konami::{
    FLYWHEEL_SEQUENCE, HEADLIGHTS_OFF_SEQUENCE, HEADLIGHTS_ON_SEQUENCE, Konami,
};
use crate::state::ride::State;
use crate::time::{Ticks, Time};

// ─── Constants ──────────────────────────────────────────────────────

/// Darkride starts above this |roll| [deg].
const DARKRIDE_ENTER_ROLL: f32 = 150.0;
/// Darkride ends below this |roll| [deg].
const DARKRIDE_EXIT_ROLL: f32 = 120.0;
/// Darkride is forgotten this long after a disengage [s].
const DARKRIDE_GRACE_S: f32 = 10.0;

/// Current limit while handtesting [A].
const HANDTEST_CURRENT: f32 = 7.0;
/// Current limit in flywheel mode [A].
const FLYWHEEL_CURRENT: f32 = 40.0;
/// Fault delays in handtest and flywheel modes [ms].
const TIGHT_FAULT_DELAY_MS: u16 = 50;
/// Flywheel mode needs the board standing on its tail [deg].
const FLYWHEEL_MIN_PITCH: f32 = 70.0;

/// Idle time before the rider is reminded the board is on [s].
const IDLE_WARNING_S: f32 = 1800.0;
const IDLE_WARNING_INTERVAL_S: f32 = 60.0;

// ─── Tick Report ────────────────────────────────────────────────────

bitflags! {
    /// Noteworthy things that happened during one tick.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TickEvents: u16 {
        const READY            = 1 << 0;
        const ENGAGED          = 1 << 1;
        const DISENGAGED       = 1 << 2;
        /// Rising edge of the surge high-current detection.
        const HIGH_CURRENT     = 1 << 3;
        const SURGE_STARTED    = 1 << 4;
        const SURGE_ENDED      = 1 << 5;
        const FLYWHEEL_STARTED = 1 << 6;
        const FLYWHEEL_STOPPED = 1 << 7;
        const HEADLIGHTS_ON    = 1 << 8;
        const HEADLIGHTS_OFF   = 1 << 9;
        const IDLE_WARNING     = 1 << 10;
    }
}

impl Default for TickEvents {
    fn default() -> Self {
        Self::empty()
    }
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub status: CompatStatus,
    pub sat: CompatSat,
    pub events: TickEvents,
    /// Why a surge ended, on the tick it ended.
    pub surge_exit: Option<SurgeExit>,
}

impl TickReport {
    /// Legacy telemetry byte: `sat << 4 | status`.
    #[inline]
    pub fn status_byte(&self) -> u8 {
        (self.sat as u8) << 4 | (self.status as u8 & 0x0f)
    }
}

// ─── Controller ─────────────────────────────────────────────────────

pub struct RideController {
    /// Config as loaded; restored when handtest or flywheel ends.
    base_cfg: RefloatConfig,
    /// Working copy that handtest and flywheel modes edit.
    cfg: RefloatConfig,

    time: Time,
    state: State,
    imu: ImuSample,
    motor_data: MotorData,
    motor: MotorControl,
    haptic: HapticFeedback,
    pid: Pid,
    booster: Booster,
    setpoint: Setpoint,
    surge: Surge,
    footpad: FootpadSensor,
    charging: Charging,
    bms: Bms,
    alerts: AlertTracker,
    recorder: DataRecorder,
    inbox: Arc<CommandInbox>,

    flywheel_konami: Konami,
    headlights_on_konami: Konami,
    headlights_off_konami: Konami,
    headlights_on: bool,
    flywheel_abort: bool,
    enable_upside_down: bool,

    fault_switch_timer: Ticks,
    fault_switch_half_timer: Ticks,
    fault_angle_pitch_timer: Ticks,
    fault_angle_roll_timer: Ticks,
    upside_down_fault_timer: Ticks,
    idle_warning_timer: Ticks,
    idle_voltage: f32,
}

impl RideController {
    /// Build every component from `cfg`. `now` is the host tick count.
    pub fn new(cfg: &RefloatConfig, now: Ticks) -> Self {
        let hz = cfg.hertz;
        let time = Time::new(now);
        let mut alerts = AlertTracker::new();
        alerts.configure(cfg.persistent_fatal_error);

        info!(
            hertz = hz,
            disabled = cfg.disabled,
            "Ride controller configured"
        );

        Self {
            base_cfg: cfg.clone(),
            cfg: cfg.clone(),
            time,
            state: State::new(cfg.disabled),
            imu: ImuSample::default(),
            motor_data: MotorData::new(&cfg.motor, hz),
            motor: MotorControl::new(&cfg.motor, hz),
            haptic: HapticFeedback::new(&cfg.haptic, cfg.tiltback.duty),
            pid: Pid::new(&cfg.pid, hz),
            booster: Booster::new(&cfg.booster),
            setpoint: Setpoint::new(cfg),
            surge: Surge::new(&cfg.surge, hz),
            footpad: FootpadSensor::default(),
            charging: Charging::new(&time),
            bms: Bms::new(&cfg.bms),
            alerts,
            recorder: DataRecorder::new(&cfg.recorder),
            inbox: Arc::new(CommandInbox::new()),
            flywheel_konami: Konami::new(FLYWHEEL_SEQUENCE),
            headlights_on_konami: Konami::new(HEADLIGHTS_ON_SEQUENCE),
            headlights_off_konami: Konami::new(HEADLIGHTS_OFF_SEQUENCE),
            headlights_on: false,
            flywheel_abort: false,
            enable_upside_down: false,
            fault_switch_timer: now,
            fault_switch_half_timer: now,
            fault_angle_pitch_timer: now,
            fault_angle_roll_timer: now,
            upside_down_fault_timer: now,
            idle_warning_timer: now,
            idle_voltage: 0.0,
        }
    }

    // ── Accessors ──

    /// Handle for the command-handler side.
    pub fn inbox(&self) -> Arc<CommandInbox> {
        Arc::clone(&self.inbox)
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn time(&self) -> &Time {
        &self.time
    }

    pub fn motor_data(&self) -> &MotorData {
        &self.motor_data
    }

    pub fn setpoint(&self) -> &Setpoint {
        &self.setpoint
    }

    pub fn pid(&self) -> &Pid {
        &self.pid
    }

    pub fn surge(&self) -> &Surge {
        &self.surge
    }

    pub fn footpad(&self) -> &FootpadSensor {
        &self.footpad
    }

    pub fn charging(&self) -> &Charging {
        &self.charging
    }

    pub fn bms(&self) -> &Bms {
        &self.bms
    }

    pub fn alerts(&self) -> &AlertTracker {
        &self.alerts
    }

    pub fn recorder(&self) -> &DataRecorder {
        &self.recorder
    }

    pub fn haptic(&self) -> &HapticFeedback {
        &self.haptic
    }

    /// Working config, including handtest/flywheel overrides.
    pub fn config(&self) -> &RefloatConfig {
        &self.cfg
    }

    pub fn headlights_on(&self) -> bool {
        self.headlights_on
    }

    /// Acknowledge a latched fatal alert.
    pub fn clear_fatal(&mut self) {
        self.alerts.clear_fatal();
    }

    /// Realtime values of the current tick.
    pub fn rt_data(&self) -> RtData {
        RtData::capture(
            &self.motor_data,
            &self.imu,
            &self.footpad,
            self.setpoint.setpoint,
            self.pid.balance_current,
        )
    }

    // ── Tick ──

    /// Run one control period against `host`.
    pub fn tick<H: VescHost + ?Sized>(&mut self, host: &mut H) -> TickReport {
        let frame = host.sample();
        self.time.update(host.system_time_ticks(), self.state.state);

        let mut events = TickEvents::empty();
        let mut surge_exit = None;

        self.imu = frame.imu;
        self.motor_data.update(&frame.motor);
        self.setpoint.sense(&self.imu, frame.remote.as_ref());

        self.drain_commands(host, &mut events);
        self.charging.timeout(&mut self.state, &self.time);

        self.footpad.update(&frame.footpad, &self.cfg.faults);
        self.raise_alerts(&frame);
        self.update_darkride();

        self.haptic.update(
            host,
            &mut self.motor,
            &self.state,
            &self.motor_data,
            &self.time,
        );

        match self.state.state {
            RunState::Startup => {
                if self.imu.startup_done {
                    self.reset_runtime_vars();
                    self.state.mark_ready();
                    events.insert(TickEvents::READY);
                }
            }
            RunState::Running => surge_exit = self.running(host, &mut events),
            RunState::Ready => self.ready(&mut events),
            RunState::Disabled => {}
        }

        self.motor.apply(
            host,
            self.motor_data.abs_erpm_smooth,
            self.state.state,
            &self.time,
        );
        self.alerts.finalize(self.time.now);

        let flags = Sample::flags(&self.state, self.footpad.state);
        let data = self.rt_data();
        self.recorder.sample(self.time.now, flags, &data);

        TickReport {
            status: self.state.compat(),
            sat: self.state.sat_compat(),
            events,
            surge_exit,
        }
    }

    fn running<H: VescHost + ?Sized>(
        &mut self,
        host: &mut H,
        events: &mut TickEvents,
    ) -> Option<SurgeExit> {
        if self.check_faults().is_some() {
            self.motor.play_click();
            self.recorder.trigger(false);
            self.surge.reset();
            events.insert(TickEvents::DISENGAGED);
            return None;
        }

        self.enable_upside_down = true;

        self.setpoint.update(
            &mut self.state,
            &self.motor_data,
            &self.imu,
            &mut self.pid,
            &self.time,
        );

        let mut exit = None;
        if self.surge.enabled() {
            if self.surge.check_current(&self.motor_data, &self.state) {
                self.motor.play_click();
                events.insert(TickEvents::HIGH_CURRENT);
            }
            match self.surge.check_surge(
                &self.motor_data,
                &self.state,
                self.setpoint.setpoint,
                self.imu.pitch,
                &self.time,
            ) {
                Some(SurgeEvent::Started) => {
                    debug!(duty = self.surge.new_duty_cycle, "Surge started");
                    events.insert(TickEvents::SURGE_STARTED);
                }
                Some(SurgeEvent::Ended(reason)) => {
                    debug!("Surge ended: {reason}");
                    self.pid.prime(host.tot_current_directional_filtered());
                    events.insert(TickEvents::SURGE_ENDED);
                    exit = Some(reason);
                }
                None => {}
            }
            if self.surge.active {
                self.motor.request_duty(self.surge.new_duty_cycle);
                return exit;
            }
        }

        self.pid.update(
            self.setpoint.setpoint,
            &self.motor_data,
            &self.imu,
            self.state.sat,
        );
        let proportional =
            self.setpoint.setpoint - self.setpoint.brake_tilt.setpoint - self.imu.pitch;
        self.booster.update(&self.motor_data, proportional);
        let current = self.pid.output(
            &self.motor_data,
            self.booster.current,
            self.setpoint.traction_control,
        );
        self.motor.request_current(current);
        exit
    }

    fn ready(&mut self, events: &mut TickEvents) {
        let fs = self.footpad.state;

        if self.state.mode == Mode::Flywheel
            && (self.flywheel_abort || fs == FootpadSensorState::Both)
        {
            self.flywheel_stop();
            events.insert(TickEvents::FLYWHEEL_STOPPED);
            return;
        }

        if self.state.mode != Mode::Flywheel
            && self.imu.pitch > 75.0
            && self.imu.pitch < 105.0
            && self.flywheel_konami.check(fs, &self.time)
            && self.flywheel_toggle(&[0x82, 0, 0, 0, 0, 1])
        {
            events.insert(TickEvents::FLYWHEEL_STARTED);
        }

        if !self.headlights_on && self.headlights_on_konami.check(fs, &self.time) {
            self.headlights_on = true;
            info!("Headlights on");
            events.insert(TickEvents::HEADLIGHTS_ON);
        } else if self.headlights_on && self.headlights_off_konami.check(fs, &self.time) {
            self.headlights_on = false;
            info!("Headlights off");
            events.insert(TickEvents::HEADLIGHTS_OFF);
        }

        if self.time.older(self.time.disengage_timer, DARKRIDE_GRACE_S) {
            if self.state.darkride {
                info!("Darkride ended");
            }
            self.enable_upside_down = false;
            self.state.darkride = false;
        }

        if self.idle_warning() {
            events.insert(TickEvents::IDLE_WARNING);
        }

        let tolerance = self.cfg.startup.pitch_tolerance;
        if self.imu.balance_pitch.abs() < tolerance
            && self.imu.roll.abs() < self.cfg.startup.roll_tolerance
            && self.can_engage()
        {
            self.engage(events);
            return;
        }

        // Upside down: ignore roll for the first second so kick flips engage.
        if self.state.darkride && self.imu.balance_pitch.abs() < tolerance {
            if self.time.older(self.time.disengage_timer, 1.0) {
                if (self.imu.roll.abs() - 180.0).abs() < self.cfg.startup.roll_tolerance {
                    self.engage(events);
                }
            } else if self.state.stop_condition != StopCondition::ReverseStop {
                self.engage(events);
            }
        }
    }

    fn engage(&mut self, events: &mut TickEvents) {
        if !self.state.engage() {
            return;
        }
        self.reset_runtime_vars();
        self.motor.play_click();
        let now = self.time.now;
        self.time.engage_timer = now;
        self.fault_switch_timer = now;
        self.fault_switch_half_timer = now;
        self.fault_angle_pitch_timer = now;
        self.fault_angle_roll_timer = now;
        self.recorder.trigger(true);
        events.insert(TickEvents::ENGAGED);
    }

    fn reset_runtime_vars(&mut self) {
        self.motor_data.reset();
        self.pid.reset();
        self.booster.reset();
        self.setpoint.reset(self.imu.balance_pitch);
        self.surge.reset();
    }

    /// Single-sensor engage rules: simple start, dual switch, flywheel.
    fn can_engage(&self) -> bool {
        if self.state.charging {
            return false;
        }
        match self.footpad.state {
            FootpadSensorState::Both => return true,
            FootpadSensorState::Left | FootpadSensorState::Right => {
                // 2 s after a stop a single sensor may start (jump starts), and
                // up to 1 s after engaging a single sensor keeps it going.
                let simple_start = self.cfg.startup.simple_start_enabled
                    && (self.time.older(self.time.disengage_timer, 2.0)
                        || !self.time.older(self.time.engage_timer, 1.0));
                if self.cfg.faults.is_dual_switch || simple_start {
                    return true;
                }
            }
            FootpadSensorState::None => {}
        }
        self.state.mode == Mode::Flywheel
    }

    // ── Faults ──

    /// Stop the ride on the first fault found. Returns the stop reason.
    fn check_faults(&mut self) -> Option<StopCondition> {
        let reason = self.detect_fault()?;
        self.state.stop(reason);
        Some(reason)
    }

    fn detect_fault(&mut self) -> Option<StopCondition> {
        let md = &self.motor_data;
        let imu = self.imu;
        let faults = &self.cfg.faults;
        let time = &self.time;
        let fs = self.footpad.state;

        if self.state.darkride {
            // Erpm is reversed when upside down.
            if md.erpm > 1000.0 {
                if time.older(self.fault_switch_timer, 0.1)
                    || md.erpm > 2000.0
                    || (self.state.wheelslip
                        && time.older(self.upside_down_fault_timer, 1.0)
                        && time.older(self.fault_switch_timer, 0.03))
                {
                    return Some(StopCondition::ReverseStop);
                }
            } else {
                time.refresh(&mut self.fault_switch_timer);
                if md.erpm > 300.0 {
                    if time.older(self.fault_angle_roll_timer, 0.5) {
                        return Some(StopCondition::ReverseStop);
                    }
                } else {
                    time.refresh(&mut self.fault_angle_roll_timer);
                }
            }
            // Engaging the footpad turns a darkride off.
            if self.can_engage() {
                return Some(StopCondition::SwitchHalf);
            }
        } else {
            let half_erpm = faults.adc_half_erpm as f32;
            let switch_faults_disabled =
                faults.moving_fault_disabled && md.erpm > half_erpm * 2.0 && imu.roll.abs() < 40.0;

            if fs == FootpadSensorState::None && self.state.mode != Mode::Flywheel {
                if !switch_faults_disabled {
                    if time.older_ms(self.fault_switch_timer, faults.delay_switch_full as f32) {
                        return Some(StopCondition::SwitchFull);
                    }
                    if md.abs_erpm < half_erpm * 6.0
                        && time.older_ms(self.fault_switch_timer, faults.delay_switch_half as f32)
                    {
                        return Some(StopCondition::SwitchFull);
                    }
                }

                // Nose or tail dropped in the direction of travel at a standstill.
                if md.abs_erpm < 200.0
                    && imu.pitch.abs() > 14.0
                    && (imu.pitch > 0.0) == (md.erpm >= 0.0)
                {
                    return Some(StopCondition::Quickstop);
                }
            } else {
                time.refresh(&mut self.fault_switch_timer);
            }

            if self.state.sat == SetpointAdjustmentType::ReverseStop {
                let pitch = imu.pitch.abs();
                let reverse_timer = self.setpoint.reverse_timer;
                if fs == FootpadSensorState::None {
                    return Some(StopCondition::SwitchFull);
                }
                if pitch > 18.0
                    || (pitch > 10.0 && time.older(reverse_timer, 1.0))
                    || (pitch > 5.0 && time.older(reverse_timer, 2.0))
                    || self.setpoint.reverse_total_erpm.abs() > REVERSE_TOLERANCE * 10.0
                {
                    return Some(StopCondition::ReverseStop);
                }
                if pitch < 5.0 {
                    time.refresh(&mut self.setpoint.reverse_timer);
                }
            }

            if !faults.is_dual_switch {
                if !self.can_engage() && md.abs_erpm < half_erpm {
                    if time.older_ms(self.fault_switch_half_timer, faults.delay_switch_half as f32)
                    {
                        return Some(StopCondition::SwitchHalf);
                    }
                } else {
                    time.refresh(&mut self.fault_switch_half_timer);
                }
            }

            let roll = imu.roll.abs();
            if roll > faults.roll {
                if time.older_ms(self.fault_angle_roll_timer, faults.delay_roll as f32) {
                    return Some(StopCondition::Roll);
                }
            } else {
                time.refresh(&mut self.fault_angle_roll_timer);
                if faults.darkride_enabled && roll > 100.0 && roll < 135.0 {
                    return Some(StopCondition::Roll);
                }
            }

            if self.state.mode == Mode::Flywheel && fs == FootpadSensorState::Both {
                self.flywheel_abort = true;
                return Some(StopCondition::SwitchHalf);
            }
        }

        if imu.pitch.abs() > faults.pitch {
            if time.older_ms(self.fault_angle_pitch_timer, faults.delay_pitch as f32) {
                return Some(StopCondition::Pitch);
            }
        } else {
            time.refresh(&mut self.fault_angle_pitch_timer);
        }

        None
    }

    // ── Per-tick helpers ──

    fn raise_alerts(&mut self, frame: &SensorFrame) {
        let now = self.time.now;
        self.bms.ingest(frame.bms.as_ref());
        self.bms.update(&self.time);
        for fault in self.bms.fault_mask().iter() {
            if let Some(id) = AlertId::from_bms_fault(fault) {
                self.alerts.add(now, id, 0);
            }
        }
        if frame.fw_fault_code > 0 {
            self.alerts.add(now, AlertId::FwFault, frame.fw_fault_code);
        }
    }

    fn update_darkride(&mut self) {
        if !self.cfg.faults.darkride_enabled {
            return;
        }
        let roll = self.imu.roll.abs();
        if self.state.darkride {
            if roll < DARKRIDE_EXIT_ROLL {
                self.state.darkride = false;
                debug!("Darkride ended, right side up");
            }
        } else if self.enable_upside_down && roll > DARKRIDE_ENTER_ROLL {
            self.state.darkride = true;
            self.time.refresh(&mut self.upside_down_fault_timer);
            info!("Darkride started");
        }
    }

    /// Remind the rider every minute once the board idled for 30 minutes.
    /// A rising battery voltage means it is charging and stays quiet.
    fn idle_warning(&mut self) -> bool {
        if !self.time.older(self.time.idle_timer, IDLE_WARNING_S) {
            self.time.refresh(&mut self.idle_warning_timer);
            self.idle_voltage = 0.0;
            return false;
        }
        if !self.time.older(self.idle_warning_timer, IDLE_WARNING_INTERVAL_S) {
            return false;
        }
        self.time.refresh(&mut self.idle_warning_timer);
        if self.motor_data.batt_voltage > self.idle_voltage {
            self.idle_voltage = self.motor_data.batt_voltage;
            return false;
        }
        warn!(
            idle_s = self.time.age(self.time.idle_timer),
            "Board idle and powered on"
        );
        true
    }

    // ── Commands ──

    fn drain_commands<H: VescHost + ?Sized>(&mut self, host: &mut H, events: &mut TickEvents) {
        let inbox = Arc::clone(&self.inbox);
        inbox.drain(|cmd| self.handle_command(cmd, &mut *host, events));
    }

    fn handle_command<H: VescHost + ?Sized>(
        &mut self,
        cmd: AppCommand,
        host: &mut H,
        events: &mut TickEvents,
    ) {
        let payload = &cmd.payload[..];
        match cmd.id {
            CommandId::ChargingState => {
                self.charging
                    .state_request(payload, &mut self.state, &self.time);
            }
            CommandId::DataRecordRequest => {
                if let Some(packet) = self.recorder.request(payload) {
                    host.send_app_data(&packet);
                }
            }
            CommandId::Handtest => match payload.first() {
                Some(&on) => self.handtest(on > 0),
                None => debug!("Handtest command without payload"),
            },
            CommandId::Flywheel => {
                let was_flywheel = self.state.mode == Mode::Flywheel;
                self.flywheel_toggle(payload);
                match (was_flywheel, self.state.mode == Mode::Flywheel) {
                    (false, true) => events.insert(TickEvents::FLYWHEEL_STARTED),
                    (true, false) => events.insert(TickEvents::FLYWHEEL_STOPPED),
                    _ => {}
                }
            }
        }
    }

    /// Reduced currents and no I term for testing the board in hand.
    fn handtest(&mut self, on: bool) {
        if self.state.state != RunState::Ready {
            debug!(state = ?self.state.state, "Handtest refused");
            return;
        }
        if !matches!(self.state.mode, Mode::Normal | Mode::Handtest) {
            return;
        }

        if on {
            self.state.mode = Mode::Handtest;
            self.cfg.pid.ki = 0.0;
            self.cfg.pid.kp_brake = 1.0;
            self.cfg.pid.kp2_brake = 1.0;
            self.cfg.faults.delay_pitch = TIGHT_FAULT_DELAY_MS;
            self.cfg.faults.delay_roll = TIGHT_FAULT_DELAY_MS;
            self.apply_config();
            self.motor_data.current_max = HANDTEST_CURRENT;
            self.motor_data.current_min = HANDTEST_CURRENT;
            info!("Handtest started");
        } else {
            self.state.mode = Mode::Normal;
            self.restore_config();
            info!("Handtest ended");
        }
    }

    /// Start or stop flywheel mode.
    ///
    /// `payload[0]`: `0x80 | command` (0 stop, otherwise start; bit 2 relaxes
    /// the roll fault). Optional tuning: `[1]` kp·10, `[2]` kp2·100,
    /// `[3]` duty tiltback angle·10, `[4]` duty tiltback %, `[6]` tiltback
    /// speed·2. Zero keeps the flywheel default. Returns true if flywheel
    /// mode is active afterwards.
    fn flywheel_toggle(&mut self, payload: &[u8]) -> bool {
        let Some(&first) = payload.first() else {
            return false;
        };
        if first & 0x80 == 0 {
            return false;
        }
        if !matches!(self.state.mode, Mode::Normal | Mode::Flywheel) {
            return false;
        }
        if self.state.state != RunState::Ready && self.state.mode != Mode::Flywheel {
            return false;
        }

        let command = first & 0x7f;
        if command == 0 {
            if self.state.mode == Mode::Flywheel {
                self.flywheel_stop();
            }
            return false;
        }

        if self.imu.pitch.abs() < FLYWHEEL_MIN_PITCH {
            debug!(pitch = self.imu.pitch, "Flywheel refused, board not upright");
            return false;
        }

        let arg = |i: usize| payload.get(i).copied().unwrap_or(0);
        let cfg = &mut self.cfg;

        cfg.startup.pitch_tolerance = 0.2;
        cfg.startup.roll_tolerance = 25.0;
        cfg.faults.pitch = 6.0;
        cfg.faults.roll = if command & 0x4 != 0 { 90.0 } else { 35.0 };
        cfg.faults.delay_pitch = TIGHT_FAULT_DELAY_MS;
        cfg.faults.delay_roll = TIGHT_FAULT_DELAY_MS;
        cfg.faults.darkride_enabled = false;
        cfg.faults.reversestop_enabled = false;

        cfg.pid.kp = if arg(1) > 0 { arg(1) as f32 * 0.1 } else { 8.0 };
        cfg.pid.kp2 = if arg(2) > 0 { arg(2) as f32 * 0.01 } else { 0.3 };
        cfg.pid.ki = 0.0;
        cfg.pid.kp_brake = 1.0;
        cfg.pid.kp2_brake = 1.0;

        cfg.tiltback.duty_angle = if arg(3) > 0 { arg(3) as f32 * 0.1 } else { 2.0 };
        cfg.tiltback.duty = if arg(4) > 0 { arg(4) as f32 * 0.01 } else { 0.1 };
        let speed = arg(6);
        let speed = if (2..100).contains(&speed) { speed as f32 * 0.5 } else { 5.0 };
        cfg.tiltback.duty_speed = speed;
        cfg.tiltback.return_speed = speed;

        cfg.motor.brake_current = 0.0;

        self.state.mode = Mode::Flywheel;
        self.flywheel_abort = false;
        self.apply_config();
        self.motor_data.current_max = FLYWHEEL_CURRENT;
        self.motor_data.current_min = FLYWHEEL_CURRENT;
        info!(kp = self.cfg.pid.kp, kp2 = self.cfg.pid.kp2, "Flywheel started");
        true
    }

    fn flywheel_stop(&mut self) {
        self.state.mode = Mode::Normal;
        self.restore_config();
        info!("Flywheel stopped");
    }

    fn restore_config(&mut self) {
        self.cfg = self.base_cfg.clone();
        self.apply_config();
    }

    /// Push the working config into every component.
    fn apply_config(&mut self) {
        let cfg = &self.cfg;
        let hz = cfg.hertz;
        self.motor_data.configure(&cfg.motor, hz);
        self.motor.configure(&cfg.motor, hz);
        self.haptic.configure(&cfg.haptic, cfg.tiltback.duty);
        self.pid.configure(&cfg.pid, hz);
        self.booster.configure(&cfg.booster);
        self.setpoint.configure(cfg);
        self.surge.configure(&cfg.surge, hz);
        self.alerts.configure(cfg.persistent_fatal_error);
    }
}

impl core::fmt::Debug for RideController {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RideController")
            .field("state", &self.state)
            .field("now", &self.time.now)
            .field("recorder", &self.recorder)
            .finish_non_exhaustive()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::{MotorCommand, SimulatedHost};

    const HZ: u16 = 1000;

    fn config() -> RefloatConfig {
        RefloatConfig {
            hertz: HZ,
            ..RefloatConfig::default()
        }
    }

    fn rig() -> (RideController, SimulatedHost) {
        let host = SimulatedHost::new(HZ);
        (RideController::new(&config(), host.system_time_ticks()), host)
    }

    fn step_on(host: &mut SimulatedHost) {
        host.frame.footpad.adc1 = 3.0;
        host.frame.footpad.adc2 = 3.0;
    }

    fn run(c: &mut RideController, host: &mut SimulatedHost, ticks: usize) -> TickEvents {
        let mut events = TickEvents::empty();
        for _ in 0..ticks {
            events |= c.tick(host).events;
        }
        events
    }

    #[test]
    fn startup_to_ready_to_running() {
        let (mut c, mut host) = rig();
        let r = c.tick(&mut host);
        assert!(r.events.contains(TickEvents::READY));
        assert_eq!(r.status, CompatStatus::FaultStartup);

        step_on(&mut host);
        let r = c.tick(&mut host);
        assert!(r.events.contains(TickEvents::ENGAGED));
        assert_eq!(c.state().state, RunState::Running);
        assert_eq!(r.sat, CompatSat::Centering);
    }

    #[test]
    fn stays_in_startup_until_imu_settles() {
        let (mut c, mut host) = rig();
        host.frame.imu.startup_done = false;
        run(&mut c, &mut host, 10);
        assert_eq!(c.state().state, RunState::Startup);
        assert_eq!(c.tick(&mut host).status, CompatStatus::Startup);
    }

    #[test]
    fn engage_needs_level_board() {
        let (mut c, mut host) = rig();
        c.tick(&mut host);
        step_on(&mut host);
        host.frame.imu.balance_pitch = 20.0;
        run(&mut c, &mut host, 5);
        assert_eq!(c.state().state, RunState::Ready);
        host.frame.imu.balance_pitch = 1.0;
        assert!(c.tick(&mut host).events.contains(TickEvents::ENGAGED));
    }

    #[test]
    fn footpad_release_stops_after_delay() {
        let (mut c, mut host) = rig();
        c.tick(&mut host);
        step_on(&mut host);
        c.tick(&mut host);

        host.frame.footpad.adc1 = 0.0;
        host.frame.footpad.adc2 = 0.0;
        // Standing still: the half delay (100 ms) applies.
        let events = run(&mut c, &mut host, 150);
        assert!(events.contains(TickEvents::DISENGAGED));
        assert_eq!(c.state().stop_condition, StopCondition::SwitchFull);
        assert_eq!(c.tick(&mut host).status, CompatStatus::FaultSwitchFull);
    }

    #[test]
    fn pitch_fault() {
        let (mut c, mut host) = rig();
        c.tick(&mut host);
        step_on(&mut host);
        c.tick(&mut host);
        host.frame.imu.pitch = 70.0;
        host.frame.imu.balance_pitch = 70.0;
        run(&mut c, &mut host, 300);
        assert_eq!(c.state().state, RunState::Ready);
        assert_eq!(c.state().stop_condition, StopCondition::Pitch);
    }

    #[test]
    fn running_requests_balance_current() {
        let (mut c, mut host) = rig();
        c.tick(&mut host);
        step_on(&mut host);
        c.tick(&mut host);
        host.frame.imu.balance_pitch = -2.0;
        run(&mut c, &mut host, 20);
        assert!(matches!(host.commands(), [MotorCommand::Current(a)] if *a > 0.0));
        assert!(c.pid().balance_current > 0.0);
    }

    #[test]
    fn charging_blocks_engage_and_times_out() {
        let (mut c, mut host) = rig();
        c.tick(&mut host);
        c.inbox().submit(&[101, 28, 151, 1, 0x03, 0x48, 0, 0x19]).unwrap();
        step_on(&mut host);
        let r = c.tick(&mut host);
        assert_eq!(r.status, CompatStatus::Charging);
        assert_eq!(c.state().state, RunState::Ready);
        assert!((c.charging().voltage - 84.0).abs() < 1e-4);

        host.advance_seconds(5.1);
        assert!(c.tick(&mut host).events.contains(TickEvents::ENGAGED));
    }

    #[test]
    fn handtest_limits_current_only_when_ready() {
        let (mut c, mut host) = rig();
        c.inbox().submit(&[101, 13, 1]).unwrap();
        host.frame.imu.startup_done = false;
        c.tick(&mut host);
        assert_eq!(c.state().mode, Mode::Normal);

        host.frame.imu.startup_done = true;
        c.tick(&mut host);
        c.inbox().submit(&[101, 13, 1]).unwrap();
        c.tick(&mut host);
        assert_eq!(c.state().mode, Mode::Handtest);
        assert_eq!(c.motor_data().current_max, HANDTEST_CURRENT);
        assert_eq!(c.config().pid.ki, 0.0);

        c.inbox().submit(&[101, 13, 0]).unwrap();
        c.tick(&mut host);
        assert_eq!(c.state().mode, Mode::Normal);
        assert_eq!(c.config().pid.ki, config().pid.ki);
        assert_eq!(c.motor_data().current_max, config().motor.current_max);
    }

    #[test]
    fn flywheel_needs_upright_board() {
        let (mut c, mut host) = rig();
        c.tick(&mut host);
        c.inbox().submit(&[101, 22, 0x81, 0, 0, 0, 0, 1]).unwrap();
        c.tick(&mut host);
        assert_eq!(c.state().mode, Mode::Normal);

        host.frame.imu.pitch = 90.0;
        // Not level enough to engage right away.
        host.frame.imu.balance_pitch = 5.0;
        c.inbox().submit(&[101, 22, 0x81, 90, 0, 0, 0, 1]).unwrap();
        let r = c.tick(&mut host);
        assert!(r.events.contains(TickEvents::FLYWHEEL_STARTED));
        assert_eq!(c.state().mode, Mode::Flywheel);
        assert!((c.config().pid.kp - 9.0).abs() < 1e-5);
        assert_eq!(c.motor_data().current_max, FLYWHEEL_CURRENT);

        // Both footpad halves end flywheel mode.
        step_on(&mut host);
        let r = c.tick(&mut host);
        assert!(r.events.contains(TickEvents::FLYWHEEL_STOPPED));
        assert_eq!(c.state().mode, Mode::Normal);
        assert_eq!(c.config().pid.kp, config().pid.kp);
    }

    #[test]
    fn fw_fault_raises_fatal_alert() {
        let (mut c, mut host) = rig();
        host.frame.fw_fault_code = 7;
        c.tick(&mut host);
        assert!(c.alerts().is_alert_active(AlertId::FwFault));
        assert!(c.alerts().fatal_error());
        host.frame.fw_fault_code = 0;
        c.tick(&mut host);
        assert!(!c.alerts().is_alert_active(AlertId::FwFault));
        assert!(c.alerts().fatal_error());
        c.clear_fatal();
        assert!(!c.alerts().fatal_error());
    }

    #[test]
    fn disabled_releases_motor_once() {
        let cfg = RefloatConfig {
            disabled: true,
            ..config()
        };
        let mut host = SimulatedHost::new(HZ);
        let mut c = RideController::new(&cfg, 0);
        let r = c.tick(&mut host);
        assert_eq!(r.status, CompatStatus::Disabled);
        assert_eq!(host.commands(), &[MotorCommand::Current(0.0)]);
        c.tick(&mut host);
        assert!(host.commands().is_empty());
        assert_eq!(host.totals().timeout_resets, 0);
    }

    #[test]
    fn status_byte_packs_sat_and_status() {
        let r = TickReport {
            status: CompatStatus::RunningTiltback,
            sat: CompatSat::PbDuty,
            events: TickEvents::empty(),
            surge_exit: None,
        };
        assert_eq!(r.status_byte(), 0x32);
    }
}
