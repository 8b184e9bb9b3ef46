//! Charger status reported by an external charging module.
//!
//! Payload: `[151, charging, voltage_hi, voltage_lo, current_hi, current_lo]`,
//! voltage and current as big-endian i16 scaled by 10. The charging flag
//! times out after 5 s without a new report.

use refloat_common::consts::{CHARGING_MAGIC, CHARGING_PAYLOAD_LEN, CHARGING_TIMEOUT_S};
use tracing::{debug, info};

use super::ride::State;
use crate::buffer::{get_scaled_i16, get_u8};
use crate::time::{Ticks, Time};

#[derive(Debug, Clone, Copy, Default)]
pub struct Charging {
    timer: Ticks,
    /// Charger voltage [V].
    pub voltage: f32,
    /// Charger current [A].
    pub current: f32,
}

impl Charging {
    pub fn new(time: &Time) -> Self {
        Self {
            timer: time.now,
            voltage: 0.0,
            current: 0.0,
        }
    }

    /// Clear the charging flag once reports stop arriving.
    pub fn timeout(&self, state: &mut State, time: &Time) {
        if state.charging && time.older(self.timer, CHARGING_TIMEOUT_S) {
            state.charging = false;
            info!("Charging report timed out");
        }
    }

    /// Apply a charging status report. Short or foreign payloads are ignored.
    pub fn state_request(&mut self, buf: &[u8], state: &mut State, time: &Time) {
        if buf.len() < CHARGING_PAYLOAD_LEN {
            debug!("Charging payload too short ({} bytes)", buf.len());
            return;
        }
        let mut ind = 0;
        if get_u8(buf, &mut ind) != Some(CHARGING_MAGIC) {
            return;
        }

        let charging = get_u8(buf, &mut ind).is_some_and(|b| b > 0);
        if charging != state.charging {
            info!("Charging {}", if charging { "started" } else { "stopped" });
        }
        state.charging = charging;
        time.refresh(&mut self.timer);

        if charging {
            self.voltage = get_scaled_i16(buf, 10.0, &mut ind).unwrap_or(0.0);
            self.current = get_scaled_i16(buf, 10.0, &mut ind).unwrap_or(0.0);
        } else {
            self.voltage = 0.0;
            self.current = 0.0;
        }
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
