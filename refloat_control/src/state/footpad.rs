//! Footpad sensor: two ADC voltages to a pressed-halves state.

use refloat_common::ride::config::CfgFaults;
use refloat_common::ride::state::FootpadSensorState;

use crate::host::FootpadSample;

/// Latest footpad reading.
#[derive(Debug, Clone, Copy, Default)]
pub struct FootpadSensor {
    pub adc1: f32,
    pub adc2: f32,
    pub state: FootpadSensorState,
}

impl FootpadSensor {
    /// Classify `sample` against the ADC thresholds.
    ///
    /// A threshold of 0 disables that half. With one half disabled the other
    /// one alone counts as both pressed; with both disabled the pad always
    /// reads as pressed.
    pub fn update(&mut self, sample: &FootpadSample, cfg: &CfgFaults) {
        self.adc1 = sample.adc1;
        self.adc2 = sample.adc2;

        let use_left = cfg.adc1 > 0.0;
        let use_right = cfg.adc2 > 0.0;
        let left = use_left && sample.adc1 > cfg.adc1;
        let right = use_right && sample.adc2 > cfg.adc2;

        self.state = match (use_left, use_right) {
            (true, true) => FootpadSensorState::from_halves(left, right),
            (true, false) => FootpadSensorState::from_halves(left, left),
            (false, true) => FootpadSensorState::from_halves(right, right),
            (false, false) => FootpadSensorState::Both,
        };
    }
}
