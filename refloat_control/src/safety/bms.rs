//! BMS threshold monitor.
//!
//! Evaluated once per tick from the latest BMS sample. The connection fault
//! is suppressed during a grace period after start so the board does not
//! fault before the first BMS message had a chance to arrive.

use refloat_common::consts::{BMS_MSG_AGE_INITIAL_S, BMS_MSG_TIMEOUT_S, BMS_STARTUP_GRACE_S};
use refloat_common::ride::config::CfgBms;
use refloat_common::ride::error::BmsFault;

use crate::host::BmsSample;
use crate::time::Time;

/// Latest BMS values and the resulting fault mask.
#[derive(Debug, Clone)]
pub struct Bms {
    cfg: CfgBms,
    pub cell_lv: f32,
    pub cell_hv: f32,
    pub cell_lt: i16,
    pub cell_ht: i16,
    pub bms_ht: i16,
    /// Seconds since the last BMS message.
    pub msg_age: f32,
    fault_mask: BmsFault,
}

impl Bms {
    pub fn new(cfg: &CfgBms) -> Self {
        Self {
            cfg: cfg.clone(),
            cell_lv: 0.0,
            cell_hv: 0.0,
            cell_lt: 0,
            cell_ht: 0,
            bms_ht: 0,
            msg_age: BMS_MSG_AGE_INITIAL_S,
            fault_mask: BmsFault::empty(),
        }
    }

    /// Take over a new sample. `None` keeps the previous values.
    pub fn ingest(&mut self, sample: Option<&BmsSample>) {
        if let Some(s) = sample {
            self.cell_lv = s.cell_lv;
            self.cell_hv = s.cell_hv;
            self.cell_lt = s.cell_lt;
            self.cell_ht = s.cell_ht;
            self.bms_ht = s.bms_ht;
            self.msg_age = s.msg_age;
        }
    }

    /// Re-evaluate the fault mask.
    pub fn update(&mut self, time: &Time) {
        self.fault_mask = self.evaluate(time);
    }

    fn evaluate(&self, time: &Time) -> BmsFault {
        if !self.cfg.enabled {
            return BmsFault::empty();
        }

        if self.msg_age > BMS_MSG_TIMEOUT_S && time.older(time.start_timer, BMS_STARTUP_GRACE_S) {
            return BmsFault::CONNECTION;
        }

        let mut mask = BmsFault::empty();
        if self.cell_lv < self.cfg.cell_lv_threshold {
            mask |= BmsFault::CELL_UNDER_VOLTAGE;
        }
        if self.cell_hv > self.cfg.cell_hv_threshold {
            mask |= BmsFault::CELL_OVER_VOLTAGE;
        }
        if self.cfg.cell_ht_threshold > 0 {
            if self.cell_ht > self.cfg.cell_ht_threshold {
                mask |= BmsFault::CELL_OVER_TEMP;
            }
            if self.cell_lt < self.cfg.cell_lt_threshold {
                mask |= BmsFault::CELL_UNDER_TEMP;
            }
        }
        if self.cfg.bms_ht_threshold > 0 && self.bms_ht > self.cfg.bms_ht_threshold {
            mask |= BmsFault::OVER_TEMP;
        }
        if (self.cell_hv - self.cell_lv).abs() > self.cfg.cell_balance_threshold {
            mask |= BmsFault::CELL_BALANCE;
        }
        mask
    }

    #[inline]
    pub fn fault_mask(&self) -> BmsFault {
        self.fault_mask
    }

    #[inline]
    pub fn is_fault_set(&self, fault: BmsFault) -> bool {
        self.fault_mask.contains(fault)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled() -> CfgBms {
        CfgBms {
            enabled: true,
            ..CfgBms::default()
        }
    }

    fn healthy() -> BmsSample {
        BmsSample {
            cell_lv: 3.80,
            cell_hv: 3.85,
            cell_lt: 20,
            cell_ht: 25,
            bms_ht: 30,
            msg_age: 0.1,
        }
    }

    fn time_after(seconds: f32) -> Time {
        let mut t = Time::with_tick_rate(0, 1000);
        t.update((seconds * 1000.0) as u32, refloat_common::ride::state::RunState::Ready);
        t
    }

    #[test]
    fn disabled_reports_nothing() {
        let mut bms = Bms::new(&CfgBms::default());
        bms.ingest(Some(&BmsSample {
            cell_lv: 1.0,
            ..healthy()
        }));
        bms.update(&time_after(10.0));
        assert!(bms.fault_mask().is_empty());
    }

    #[test]
    fn connection_fault_waits_for_grace_period() {
        let mut bms = Bms::new(&enabled());
        bms.update(&time_after(4.0));
        // Initial age is stale but the grace period has not passed; thresholds
        // evaluate against zeroed cells instead.
        assert!(!bms.is_fault_set(BmsFault::CONNECTION));
        bms.update(&time_after(6.0));
        assert_eq!(bms.fault_mask(), BmsFault::CONNECTION);
    }

    #[test]
    fn healthy_sample_is_clean() {
        let mut bms = Bms::new(&enabled());
        bms.ingest(Some(&healthy()));
        bms.update(&time_after(10.0));
        assert!(bms.fault_mask().is_empty());
    }

    #[test]
    fn thresholds_map_to_faults() {
        let mut bms = Bms::new(&enabled());
        bms.ingest(Some(&BmsSample {
            cell_lv: 2.5,
            cell_hv: 4.4,
            cell_lt: -20,
            cell_ht: 60,
            bms_ht: 70,
            msg_age: 0.0,
        }));
        bms.update(&time_after(10.0));
        assert_eq!(bms.fault_mask(), BmsFault::all().difference(BmsFault::CONNECTION));
    }

    #[test]
    fn zero_temperature_threshold_disables_cell_temp_checks() {
        let mut bms = Bms::new(&CfgBms {
            cell_ht_threshold: 0,
            bms_ht_threshold: 0,
            ..enabled()
        });
        bms.ingest(Some(&BmsSample {
            cell_lt: -40,
            cell_ht: 90,
            bms_ht: 90,
            ..healthy()
        }));
        bms.update(&time_after(10.0));
        assert!(bms.fault_mask().is_empty());
    }
}
