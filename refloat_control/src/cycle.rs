//! Periodic control loop: one [`RideController::tick`] per period.
//!
//! The runner owns the controller and the host. It stops when the host
//! raises its shutdown flag or after a fixed number of ticks. With pacing
//! enabled each tick is followed by a sleep for the rest of the period;
//! overruns are counted and logged, never fatal.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::controller::{RideController, TickEvents};
use crate::host::VescHost;

// ─── Cycle Statistics ───────────────────────────────────────────────

/// O(1) per-tick timing statistics.
#[derive(Debug, Clone)]
pub struct CycleStats {
    /// Total ticks executed.
    pub cycle_count: u64,
    /// Last tick duration [ns].
    pub last_cycle_ns: i64,
    pub min_cycle_ns: i64,
    pub max_cycle_ns: i64,
    /// Running sum for the average.
    pub sum_cycle_ns: i64,
    /// Ticks that took longer than the period.
    pub overruns: u64,
    /// Engage events seen.
    pub engages: u64,
    /// Disengage events seen.
    pub disengages: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self {
            cycle_count: 0,
            last_cycle_ns: 0,
            min_cycle_ns: i64::MAX,
            max_cycle_ns: 0,
            sum_cycle_ns: 0,
            overruns: 0,
            engages: 0,
            disengages: 0,
        }
    }

    /// Record one tick duration.
    #[inline]
    pub fn record(&mut self, duration_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns < self.min_cycle_ns {
            self.min_cycle_ns = duration_ns;
        }
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        self.sum_cycle_ns += duration_ns;
    }

    /// Average tick time [ns] (0 if no ticks).
    #[inline]
    pub fn avg_cycle_ns(&self) -> i64 {
        if self.cycle_count == 0 {
            0
        } else {
            self.sum_cycle_ns / self.cycle_count as i64
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Errors ─────────────────────────────────────────────────────────

/// Errors setting up the control loop.
#[derive(Debug, Error)]
pub enum CycleError {
    /// Loop frequency outside the supported range.
    #[error("invalid loop frequency {0} Hz")]
    InvalidFrequency(u16),
}

// ─── Cycle Runner ───────────────────────────────────────────────────

/// Why [`CycleRunner::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Host asked to terminate.
    Terminated,
    /// Tick limit reached.
    TickLimit,
}

pub struct CycleRunner<H: VescHost> {
    pub controller: RideController,
    pub host: H,
    pub stats: CycleStats,
    period: Duration,
    max_ticks: Option<u64>,
    paced: bool,
}

impl<H: VescHost> CycleRunner<H> {
    /// Runner ticking at `hertz`, paced to wall-clock time.
    pub fn new(controller: RideController, host: H, hertz: u16) -> Result<Self, CycleError> {
        if hertz == 0 {
            return Err(CycleError::InvalidFrequency(hertz));
        }
        Ok(Self {
            controller,
            host,
            stats: CycleStats::new(),
            period: Duration::from_nanos(1_000_000_000 / hertz as u64),
            max_ticks: None,
            paced: true,
        })
    }

    /// Stop after `ticks` ticks.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Run as fast as possible instead of sleeping out each period.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    /// Control period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick until the host terminates or the tick limit is hit.
    pub fn run(&mut self) -> StopReason {
        let period_ns = self.period.as_nanos() as i64;
        info!(
            period_us = self.period.as_micros() as u64,
            paced = self.paced,
            "Entering control loop"
        );

        let reason = loop {
            if self.host.should_terminate() {
                break StopReason::Terminated;
            }
            if self.max_ticks.is_some_and(|max| self.stats.cycle_count >= max) {
                break StopReason::TickLimit;
            }

            let start = Instant::now();
            let report = self.controller.tick(&mut self.host);
            let elapsed = start.elapsed();

            let duration_ns = elapsed.as_nanos() as i64;
            self.stats.record(duration_ns);
            if report.events.contains(TickEvents::ENGAGED) {
                self.stats.engages += 1;
            }
            if report.events.contains(TickEvents::DISENGAGED) {
                self.stats.disengages += 1;
            }
            if duration_ns > period_ns {
                self.stats.overruns += 1;
                warn!(duration_ns, period_ns, "Tick overrun");
            }

            if self.paced {
                if let Some(remaining) = self.period.checked_sub(elapsed) {
                    std::thread::sleep(remaining);
                }
            }
        };

        debug!(?reason, "Control loop stopped");
        info!(
            ticks = self.stats.cycle_count,
            avg_ns = self.stats.avg_cycle_ns(),
            max_ns = self.stats.max_cycle_ns,
            overruns = self.stats.overruns,
            "Cycle statistics"
        );
        reason
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::sim::SimulatedHost;
    use refloat_common::ride::config::RefloatConfig;
    use std::sync::atomic::Ordering;

    fn runner(hertz: u16) -> CycleRunner<SimulatedHost> {
        let cfg = RefloatConfig {
            hertz,
            ..RefloatConfig::default()
        };
        let host = SimulatedHost::new(hertz);
        let controller = RideController::new(&cfg, host.system_time_ticks());
        CycleRunner::new(controller, host, hertz).unwrap()
    }

    #[test]
    fn stats_track_min_max_avg() {
        let mut s = CycleStats::new();
        assert_eq!(s.avg_cycle_ns(), 0);
        s.record(100);
        s.record(300);
        assert_eq!(s.min_cycle_ns, 100);
        assert_eq!(s.max_cycle_ns, 300);
        assert_eq!(s.avg_cycle_ns(), 200);
        assert_eq!(s.cycle_count, 2);
    }

    #[test]
    fn zero_frequency_is_rejected() {
        let host = SimulatedHost::new(800);
        let controller = RideController::new(&RefloatConfig::default(), 0);
        assert!(matches!(
            CycleRunner::new(controller, host, 0),
            Err(CycleError::InvalidFrequency(0))
        ));
    }

    #[test]
    fn stops_at_tick_limit() {
        let mut r = runner(1000).with_max_ticks(50).unpaced();
        assert_eq!(r.run(), StopReason::TickLimit);
        assert_eq!(r.stats.cycle_count, 50);
        assert_eq!(r.host.samples(), 50);
    }

    #[test]
    fn stops_on_terminate_flag() {
        let mut r = runner(1000).unpaced();
        r.host.terminate_handle().store(true, Ordering::Relaxed);
        assert_eq!(r.run(), StopReason::Terminated);
        assert_eq!(r.stats.cycle_count, 0);
    }

    #[test]
    fn period_follows_frequency() {
        assert_eq!(runner(800).period(), Duration::from_micros(1250));
    }
}
