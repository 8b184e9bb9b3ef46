//! Edge-triggered alert tracking with a fatal latch.
//!
//! Subsystems call [`AlertTracker::add`] for every condition that holds
//! during the tick, in any order. [`AlertTracker::finalize`] runs once at the
//! end of the tick, records deactivations and commits the pending mask. Only
//! edges reach the history ring, so an alert held for many ticks produces
//! one "activated" and one "deactivated" record.

use refloat_common::consts::ALERT_TRACKER_SIZE;
use refloat_common::ride::error::{AlertId, AlertMask, AlertType};
use tracing::{error, info, warn};

use crate::circular_buffer::CircularBuffer;
use crate::time::Ticks;

/// One activation or deactivation edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlertRecord {
    pub time: Ticks,
    pub id: AlertId,
    pub active: bool,
    /// Firmware fault code for `FwFault` activations, otherwise 0.
    pub code: u8,
}

impl AlertRecord {
    const EMPTY: Self = Self {
        time: 0,
        id: AlertId::FwFault,
        active: false,
        code: 0,
    };
}

type History = CircularBuffer<AlertRecord, [AlertRecord; ALERT_TRACKER_SIZE]>;

/// Alert state shared by every fault source of the ride controller.
pub struct AlertTracker {
    persistent_fatal_error: bool,
    active_alert_mask: AlertMask,
    new_active_alert_mask: AlertMask,
    fw_fault_code: u8,
    fatal_error: bool,
    history: History,
}

impl Default for AlertTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertTracker {
    /// Empty tracker with persistent fatal errors.
    pub fn new() -> Self {
        Self {
            persistent_fatal_error: true,
            active_alert_mask: AlertMask::empty(),
            new_active_alert_mask: AlertMask::empty(),
            fw_fault_code: 0,
            fatal_error: false,
            history: CircularBuffer::new([AlertRecord::EMPTY; ALERT_TRACKER_SIZE]),
        }
    }

    /// Set whether the fatal latch survives its alert going away.
    pub fn configure(&mut self, persistent_fatal_error: bool) {
        self.persistent_fatal_error = persistent_fatal_error;
    }

    /// Raise `id` for the current tick.
    ///
    /// `code` distinguishes firmware faults; a different code while a
    /// firmware fault is active counts as a new activation.
    pub fn add(&mut self, time: Ticks, id: AlertId, code: u8) {
        let mask = id.mask();
        let was_active = self.active_alert_mask.contains(mask)
            && (id != AlertId::FwFault || code == self.fw_fault_code);
        let already_raised = self.new_active_alert_mask.contains(mask);

        if !was_active && !already_raised {
            self.history.push(AlertRecord {
                time,
                id,
                active: true,
                code,
            });
            match id.alert_type() {
                AlertType::Fatal => error!("Alert {} active (code {code})", id.name()),
                _ => warn!("Alert {} active (code {code})", id.name()),
            }
        }

        if id == AlertId::FwFault {
            self.fw_fault_code = code;
        }
        self.new_active_alert_mask |= mask;

        if id.alert_type() == AlertType::Fatal {
            self.fatal_error = true;
        }
    }

    /// Close the tick: record deactivations and commit the pending mask.
    pub fn finalize(&mut self, time: Ticks) {
        let ended = self.active_alert_mask.difference(self.new_active_alert_mask);
        if !ended.is_empty() {
            for id in AlertId::ALL {
                if !ended.contains(id.mask()) {
                    continue;
                }
                self.history.push(AlertRecord {
                    time,
                    id,
                    active: false,
                    code: 0,
                });
                if id == AlertId::FwFault {
                    self.fw_fault_code = 0;
                }
                info!("Alert {} cleared", id.name());
            }
        }

        if !self.persistent_fatal_error && !self.new_active_alert_mask.has_fatal() {
            self.fatal_error = false;
        }

        self.active_alert_mask = self.new_active_alert_mask;
        self.new_active_alert_mask = AlertMask::empty();
    }

    /// Drop the fatal latch. A still-active fatal alert re-latches on its next `add`.
    pub fn clear_fatal(&mut self) {
        if self.fatal_error {
            info!("Fatal error latch cleared");
        }
        self.fatal_error = false;
    }

    #[inline]
    pub fn is_alert_active(&self, id: AlertId) -> bool {
        self.active_alert_mask.contains(id.mask())
    }

    #[inline]
    pub fn active_mask(&self) -> AlertMask {
        self.active_alert_mask
    }

    #[inline]
    pub fn fatal_error(&self) -> bool {
        self.fatal_error
    }

    #[inline]
    pub fn fw_fault_code(&self) -> u8 {
        self.fw_fault_code
    }

    /// Alert edges, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &AlertRecord> + '_ {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.size()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn records(tracker: &AlertTracker) -> Vec<AlertRecord> {
        tracker.history().copied().collect()
    }

    #[test]
    fn held_alert_records_one_edge_each_way() {
        let mut t = AlertTracker::new();
        for tick in 1..=10 {
            t.add(tick, AlertId::BmsCellUnderVoltage, 0);
            t.finalize(tick);
        }
        assert_eq!(t.history_len(), 1);
        assert!(t.is_alert_active(AlertId::BmsCellUnderVoltage));

        t.finalize(11);
        let recs = records(&t);
        assert_eq!(recs.len(), 2);
        assert_eq!(
            recs[0],
            AlertRecord {
                time: 1,
                id: AlertId::BmsCellUnderVoltage,
                active: true,
                code: 0
            }
        );
        assert_eq!(recs[1].time, 11);
        assert!(!recs[1].active);
        assert!(!t.is_alert_active(AlertId::BmsCellUnderVoltage));
    }

    #[test]
    fn deactivation_only_after_finalize() {
        let mut t = AlertTracker::new();
        t.add(1, AlertId::BmsConnection, 0);
        t.finalize(1);
        // Tick 2: not raised, but finalize not called yet.
        assert_eq!(t.history_len(), 1);
        assert!(t.is_alert_active(AlertId::BmsConnection));
        t.finalize(2);
        assert_eq!(t.history_len(), 2);
    }

    #[test]
    fn fatal_clears_when_not_persistent() {
        let mut t = AlertTracker::new();
        t.configure(false);
        t.add(1, AlertId::FwFault, 5);
        assert!(t.fatal_error());
        t.finalize(1);
        assert!(t.fatal_error());
        t.finalize(2);
        assert!(!t.fatal_error());
        assert_eq!(t.fw_fault_code(), 0);
    }

    #[test]
    fn persistent_fatal_needs_explicit_clear() {
        let mut t = AlertTracker::new();
        t.add(1, AlertId::FwFault, 5);
        t.finalize(1);
        for tick in 2..50 {
            t.finalize(tick);
            assert!(t.fatal_error());
        }
        t.clear_fatal();
        assert!(!t.fatal_error());
    }

    #[test]
    fn error_class_never_latches() {
        let mut t = AlertTracker::new();
        t.add(1, AlertId::BmsOverTemp, 0);
        t.finalize(1);
        assert!(!t.fatal_error());
    }

    #[test]
    fn new_firmware_code_is_new_activation() {
        let mut t = AlertTracker::new();
        t.add(1, AlertId::FwFault, 3);
        t.finalize(1);
        t.add(2, AlertId::FwFault, 3);
        t.finalize(2);
        t.add(3, AlertId::FwFault, 7);
        t.finalize(3);
        let recs = records(&t);
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].code, 7);
        assert_eq!(t.fw_fault_code(), 7);
    }

    #[test]
    fn same_id_twice_in_one_tick() {
        let mut t = AlertTracker::new();
        t.add(1, AlertId::BmsCellBalance, 0);
        t.add(1, AlertId::BmsCellBalance, 0);
        t.finalize(1);
        assert_eq!(t.history_len(), 1);
    }

    #[test]
    fn masks_are_per_id() {
        let mut t = AlertTracker::new();
        t.add(1, AlertId::BmsOverTemp, 0);
        t.add(1, AlertId::BmsCellOverVoltage, 0);
        t.finalize(1);
        assert_eq!(
            t.active_mask(),
            AlertMask::BMS_OVER_TEMP | AlertMask::BMS_CELL_OVER_VOLTAGE
        );
        t.add(2, AlertId::BmsOverTemp, 0);
        t.finalize(2);
        assert_eq!(t.active_mask(), AlertMask::BMS_OVER_TEMP);
        let recs = records(&t);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[2].id, AlertId::BmsCellOverVoltage);
        assert!(!recs[2].active);
    }

    #[test]
    fn history_is_bounded() {
        let mut t = AlertTracker::new();
        for tick in 0..100u32 {
            if tick % 2 == 0 {
                t.add(tick, AlertId::BmsConnection, 0);
            }
            t.finalize(tick);
        }
        assert_eq!(t.history_len(), ALERT_TRACKER_SIZE);
        assert_eq!(t.history().last().map(|r| r.time), Some(99));
    }
}
