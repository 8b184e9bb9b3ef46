//! Realtime data items.
//!
//! One ordered list covers every value the package exposes. Items flagged
//! `recorded` also go into data recorder samples, in list order. Item names
//! are part of the app protocol and must not change.

use static_assertions::const_assert_eq;

use crate::control::motor_data::MotorData;
use crate::host::ImuSample;
use crate::state::footpad::FootpadSensor;

/// Realtime data item, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RtItem {
    Speed,
    Erpm,
    Current,
    DirCurrent,
    FiltCurrent,
    DutyCycle,
    BattVoltage,
    BattCurrent,
    MosfetTemp,
    MotorTemp,
    Pitch,
    BalancePitch,
    Roll,
    Adc1,
    Adc2,
    Setpoint,
    BalanceCurrent,
}

/// Number of recorded items per sample.
pub const REC_COUNT: usize = 8;

impl RtItem {
    pub const ALL: [RtItem; 17] = [
        Self::Speed,
        Self::Erpm,
        Self::Current,
        Self::DirCurrent,
        Self::FiltCurrent,
        Self::DutyCycle,
        Self::BattVoltage,
        Self::BattCurrent,
        Self::MosfetTemp,
        Self::MotorTemp,
        Self::Pitch,
        Self::BalancePitch,
        Self::Roll,
        Self::Adc1,
        Self::Adc2,
        Self::Setpoint,
        Self::BalanceCurrent,
    ];

    /// Recorded items in sample order.
    pub const RECORDED: [RtItem; REC_COUNT] = [
        Self::Erpm,
        Self::DirCurrent,
        Self::DutyCycle,
        Self::BattVoltage,
        Self::Pitch,
        Self::BalancePitch,
        Self::Setpoint,
        Self::BalanceCurrent,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Speed => "motor.speed",
            Self::Erpm => "motor.erpm",
            Self::Current => "motor.current",
            Self::DirCurrent => "motor.dir_current",
            Self::FiltCurrent => "motor.filt_current",
            Self::DutyCycle => "motor.duty_cycle",
            Self::BattVoltage => "motor.batt_voltage",
            Self::BattCurrent => "motor.batt_current",
            Self::MosfetTemp => "motor.mosfet_temp",
            Self::MotorTemp => "motor.motor_temp",
            Self::Pitch => "imu.pitch",
            Self::BalancePitch => "imu.balance_pitch",
            Self::Roll => "imu.roll",
            Self::Adc1 => "footpad.adc1",
            Self::Adc2 => "footpad.adc2",
            Self::Setpoint => "setpoint",
            Self::BalanceCurrent => "balance_current",
        }
    }

    /// Stored in data recorder samples.
    pub const fn recorded(self) -> bool {
        matches!(
            self,
            Self::Erpm
                | Self::DirCurrent
                | Self::DutyCycle
                | Self::BattVoltage
                | Self::Pitch
                | Self::BalancePitch
                | Self::Setpoint
                | Self::BalanceCurrent
        )
    }

    /// Only meaningful while running.
    pub const fn runtime(self) -> bool {
        matches!(self, Self::Setpoint | Self::BalanceCurrent)
    }

    pub fn value(self, d: &RtData) -> f32 {
        match self {
            Self::Speed => d.speed,
            Self::Erpm => d.erpm,
            Self::Current => d.current,
            Self::DirCurrent => d.dir_current,
            Self::FiltCurrent => d.filt_current,
            Self::DutyCycle => d.duty_cycle,
            Self::BattVoltage => d.batt_voltage,
            Self::BattCurrent => d.batt_current,
            Self::MosfetTemp => d.mosfet_temp,
            Self::MotorTemp => d.motor_temp,
            Self::Pitch => d.pitch,
            Self::BalancePitch => d.balance_pitch,
            Self::Roll => d.roll,
            Self::Adc1 => d.adc1,
            Self::Adc2 => d.adc2,
            Self::Setpoint => d.setpoint,
            Self::BalanceCurrent => d.balance_current,
        }
    }
}

const fn count_recorded() -> usize {
    let mut n = 0;
    let mut i = 0;
    while i < RtItem::ALL.len() {
        if RtItem::ALL[i].recorded() {
            n += 1;
        }
        i += 1;
    }
    n
}

const_assert_eq!(count_recorded(), REC_COUNT);

/// Snapshot of every realtime item for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RtData {
    pub speed: f32,
    pub erpm: f32,
    pub current: f32,
    pub dir_current: f32,
    pub filt_current: f32,
    pub duty_cycle: f32,
    pub batt_voltage: f32,
    pub batt_current: f32,
    pub mosfet_temp: f32,
    pub motor_temp: f32,
    pub pitch: f32,
    pub balance_pitch: f32,
    pub roll: f32,
    pub adc1: f32,
    pub adc2: f32,
    pub setpoint: f32,
    pub balance_current: f32,
}

impl RtData {
    pub fn capture(
        md: &MotorData,
        imu: &ImuSample,
        footpad: &FootpadSensor,
        setpoint: f32,
        balance_current: f32,
    ) -> Self {
        Self {
            speed: md.speed,
            erpm: md.erpm,
            current: md.current,
            dir_current: md.dir_current,
            filt_current: md.filt_current,
            duty_cycle: md.duty_cycle,
            batt_voltage: md.batt_voltage,
            batt_current: md.batt_current,
            mosfet_temp: md.mosfet_temp,
            motor_temp: md.motor_temp,
            pitch: imu.pitch,
            balance_pitch: imu.balance_pitch,
            roll: imu.roll,
            adc1: footpad.adc1,
            adc2: footpad.adc2,
            setpoint,
            balance_current,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_list_matches_flags() {
        let from_flags: Vec<RtItem> = RtItem::ALL.iter().copied().filter(|i| i.recorded()).collect();
        assert_eq!(from_flags, RtItem::RECORDED.to_vec());
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<&str> = RtItem::ALL.iter().map(|i| i.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), RtItem::ALL.len());
    }

    #[test]
    fn accessor_reads_matching_field() {
        let d = RtData {
            erpm: 1200.0,
            balance_pitch: -1.5,
            balance_current: 12.0,
            ..Default::default()
        };
        assert_eq!(RtItem::Erpm.value(&d), 1200.0);
        assert_eq!(RtItem::BalancePitch.value(&d), -1.5);
        assert_eq!(RtItem::BalanceCurrent.value(&d), 12.0);
        assert_eq!(RtItem::Roll.value(&d), 0.0);
    }
}
