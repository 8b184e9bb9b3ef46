//! Data recorder: ring of compact samples, streamed to the app on request.
//!
//! Each sample is the tick time, a flags byte and the recorded realtime
//! items as binary16. The ring lives on the heap, sized once from config; a
//! capacity of 0 leaves the recorder unsupported and every request is
//! refused.
//!
//! # Requests
//!
//! | Bytes              | Action                                         |
//! |--------------------|------------------------------------------------|
//! | `[1, 1, v]`        | start (clearing the ring) if `v > 0`, else stop |
//! | `[1, 2, v]`        | autostart on engage                            |
//! | `[1, 3, v]`        | autostop on disengage                          |
//! | `[2, 1]`           | stop and send the header                       |
//! | `[2, 2, u32 off]`  | send samples starting at `off`                 |

use refloat_common::consts::{PACKAGE_ID, SEND_BUF_MAX_SIZE};
use refloat_common::ride::config::CfgRecorder;
use refloat_common::ride::state::{FootpadSensorState, RunState};
use static_assertions::const_assert;
use thiserror::Error;
use tracing::{error, info};

use super::float16::to_float16;
use super::rt_data::{REC_COUNT, RtData, RtItem};
use crate::buffer::{BufferFull, Packet, append_str, append_u8, append_u16, append_u32, get_u8, get_u32};
use crate::circular_buffer::CircularBuffer;
use crate::state::ride::State;
use crate::time::Ticks;

pub const COMMAND_DATA_RECORD_HEADER: u8 = 42;
pub const COMMAND_DATA_RECORD_DATA: u8 = 43;

/// Time, flags and values of one sample on the wire [bytes].
pub const SAMPLE_WIRE_SIZE: usize = 4 + 1 + 2 * REC_COUNT;

/// Package id, command and offset ahead of the samples [bytes].
const DATA_PREFIX_SIZE: usize = 2 + 4;

const_assert!(DATA_PREFIX_SIZE + SAMPLE_WIRE_SIZE <= SEND_BUF_MAX_SIZE);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    pub time: Ticks,
    /// `sat << 4 | footpad << 2 | wheelslip << 1 | running`.
    pub flags: u8,
    pub values: [u16; REC_COUNT],
}

impl Sample {
    pub fn flags(state: &State, footpad: FootpadSensorState) -> u8 {
        (state.sat as u8) << 4
            | (footpad as u8) << 2
            | (state.wheelslip as u8) << 1
            | (state.state == RunState::Running) as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecorderError {
    #[error("data record not supported")]
    Unsupported,
    #[error("data record request missing data")]
    MissingData,
    #[error("data record request missing value, length: {0}")]
    MissingValue(usize),
    #[error("data record request missing offset, length: {0}")]
    MissingOffset(usize),
    #[error(transparent)]
    Packet(#[from] BufferFull),
}

type Ring = CircularBuffer<Sample, Box<[Sample]>>;

pub struct DataRecorder {
    ring: Option<Ring>,
    recording: bool,
    autostart: bool,
    autostop: bool,
}

impl DataRecorder {
    pub fn new(cfg: &CfgRecorder) -> Self {
        let ring = (cfg.capacity > 0).then(|| {
            info!(
                "Data record buffer: {} samples ({}B)",
                cfg.capacity,
                cfg.capacity * core::mem::size_of::<Sample>()
            );
            Ring::new(vec![Sample::default(); cfg.capacity].into_boxed_slice())
        });
        Self {
            ring,
            recording: false,
            autostart: cfg.autostart,
            autostop: cfg.autostop,
        }
    }

    #[inline]
    pub fn has_capability(&self) -> bool {
        self.ring.is_some()
    }

    #[inline]
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn autostart(&self) -> bool {
        self.autostart
    }

    pub fn autostop(&self) -> bool {
        self.autostop
    }

    /// Samples currently stored.
    pub fn len(&self) -> usize {
        self.ring.as_ref().map_or(0, |r| r.size())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored sample `index` positions after the oldest.
    pub fn get(&self, index: usize) -> Option<Sample> {
        self.ring.as_ref()?.get(index)
    }

    /// Engage/disengage hook.
    pub fn trigger(&mut self, engage: bool) {
        if self.ring.is_none() {
            return;
        }
        if self.autostart && engage {
            self.start();
        } else if self.autostop && !engage {
            self.stop();
        }
    }

    /// Record one sample if recording.
    pub fn sample(&mut self, time: Ticks, flags: u8, data: &RtData) {
        if !self.recording {
            return;
        }
        let Some(ring) = self.ring.as_mut() else {
            return;
        };
        let mut values = [0u16; REC_COUNT];
        for (v, item) in values.iter_mut().zip(RtItem::RECORDED) {
            *v = to_float16(item.value(data));
        }
        ring.push(Sample {
            time,
            flags,
            values,
        });
    }

    /// Handle an app request. Returns the packet to send back, if any.
    ///
    /// Malformed requests are logged and ignored.
    pub fn request(&mut self, buf: &[u8]) -> Option<Packet> {
        match self.handle_request(buf) {
            Ok(packet) => packet,
            Err(e) => {
                error!("{e}");
                None
            }
        }
    }

    fn handle_request(&mut self, buf: &[u8]) -> Result<Option<Packet>, RecorderError> {
        if self.ring.is_none() {
            return Err(RecorderError::Unsupported);
        }
        let mut ind = 0;
        let (Some(mode), Some(sub_mode)) = (get_u8(buf, &mut ind), get_u8(buf, &mut ind)) else {
            return Err(RecorderError::MissingData);
        };

        match mode {
            1 => {
                let value = get_u8(buf, &mut ind).ok_or(RecorderError::MissingValue(buf.len()))?;
                match sub_mode {
                    1 if value > 0 => self.start(),
                    1 => self.stop(),
                    2 => self.autostart = value > 0,
                    3 => self.autostop = value > 0,
                    _ => {}
                }
                Ok(None)
            }
            2 => match sub_mode {
                1 => {
                    // Pause so the ring does not move under the transfer.
                    self.stop();
                    Ok(Some(self.header_packet()?))
                }
                2 => {
                    let offset =
                        get_u32(buf, &mut ind).ok_or(RecorderError::MissingOffset(buf.len()))?;
                    Ok(self.data_packet(offset as usize)?)
                }
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    /// `[101, 42, u32 size, count, names...]`.
    pub fn header_packet(&self) -> Result<Packet, BufferFull> {
        let mut p = Packet::new();
        append_u8(&mut p, PACKAGE_ID)?;
        append_u8(&mut p, COMMAND_DATA_RECORD_HEADER)?;
        append_u32(&mut p, self.len() as u32)?;
        append_u8(&mut p, REC_COUNT as u8)?;
        for item in RtItem::RECORDED {
            append_str(&mut p, item.name())?;
        }
        Ok(p)
    }

    /// `[101, 43, u32 offset, samples...]` with as many samples as fit.
    ///
    /// `None` when nothing has been recorded. An offset past the end yields
    /// a packet without samples.
    pub fn data_packet(&self, offset: usize) -> Result<Option<Packet>, BufferFull> {
        let Some(ring) = self.ring.as_ref().filter(|r| !r.is_empty()) else {
            return Ok(None);
        };
        let mut p = Packet::new();
        append_u8(&mut p, PACKAGE_ID)?;
        append_u8(&mut p, COMMAND_DATA_RECORD_DATA)?;
        append_u32(&mut p, offset as u32)?;

        for sample in ring.iter().skip(offset) {
            if p.len() + SAMPLE_WIRE_SIZE > SEND_BUF_MAX_SIZE {
                break;
            }
            append_u32(&mut p, sample.time)?;
            append_u8(&mut p, sample.flags)?;
            for &v in &sample.values {
                append_u16(&mut p, v)?;
            }
        }
        Ok(Some(p))
    }

    fn start(&mut self) {
        if let Some(ring) = self.ring.as_mut() {
            ring.clear();
            self.recording = true;
        }
    }

    fn stop(&mut self) {
        self.recording = false;
    }
}

impl core::fmt::Debug for DataRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DataRecorder")
            .field("capacity", &self.ring.as_ref().map_or(0, |r| r.capacity()))
            .field("len", &self.len())
            .field("recording", &self.recording)
            .field("autostart", &self.autostart)
            .field("autostop", &self.autostop)
            .finish()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
