//! App command handoff from the command handler to the control tick.
//!
//! The host delivers app-data on its own thread. Instead of writing into the
//! ride state directly, the handler parses the packet and queues it; the
//! tick drains the queue once per period. The tick side only ever
//! `try_lock`s, so a busy handler delays a command by one tick instead of
//! blocking the control loop.

use std::sync::atomic::{AtomicU32, Ordering};

use heapless::{Deque, Vec};
use parking_lot::Mutex;
use refloat_common::consts::PACKAGE_ID;
use thiserror::Error;
use tracing::warn;

/// Queued commands.
pub const INBOX_CAPACITY: usize = 8;

/// Maximum command payload after the package id and command byte.
pub const COMMAND_PAYLOAD_MAX: usize = 64;

/// Command payload storage.
pub type Payload = Vec<u8, COMMAND_PAYLOAD_MAX>;

/// App command ids understood by the ride core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandId {
    Handtest = 13,
    Flywheel = 22,
    ChargingState = 28,
    DataRecordRequest = 41,
}

impl CommandId {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            13 => Some(Self::Handtest),
            22 => Some(Self::Flywheel),
            28 => Some(Self::ChargingState),
            41 => Some(Self::DataRecordRequest),
            _ => None,
        }
    }
}

/// A parsed app command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCommand {
    pub id: CommandId,
    pub payload: Payload,
}

/// Rejected app-data packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("command data too short ({0} bytes)")]
    TooShort(usize),
    #[error("invalid package id {0}")]
    InvalidPackageId(u8),
    #[error("unsupported command {0}")]
    Unsupported(u8),
    #[error("command payload too long ({0} bytes)")]
    PayloadTooLong(usize),
    #[error("command inbox full")]
    InboxFull,
}

impl AppCommand {
    /// Parse `[PACKAGE_ID, command, payload...]`.
    pub fn parse(raw: &[u8]) -> Result<Self, CommandError> {
        if raw.len() < 2 {
            return Err(CommandError::TooShort(raw.len()));
        }
        if raw[0] != PACKAGE_ID {
            return Err(CommandError::InvalidPackageId(raw[0]));
        }
        let id = CommandId::from_u8(raw[1]).ok_or(CommandError::Unsupported(raw[1]))?;
        let payload = Payload::from_slice(&raw[2..])
            .map_err(|_| CommandError::PayloadTooLong(raw.len() - 2))?;
        Ok(Self { id, payload })
    }
}

/// Bounded single-consumer command queue.
#[derive(Debug, Default)]
pub struct CommandInbox {
    queue: Mutex<Deque<AppCommand, INBOX_CAPACITY>>,
    rejected: AtomicU32,
}

impl CommandInbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and queue a raw app-data packet. Called from the command thread.
    pub fn submit(&self, raw: &[u8]) -> Result<(), CommandError> {
        let result = AppCommand::parse(raw).and_then(|cmd| {
            self.queue
                .lock()
                .push_back(cmd)
                .map_err(|_| CommandError::InboxFull)
        });
        if let Err(e) = &result {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            warn!("App command rejected: {e}");
        }
        result
    }

    /// Hand every queued command to `f`, oldest first. Called from the tick.
    ///
    /// Returns the number of commands drained; 0 if the queue was busy.
    pub fn drain<F: FnMut(AppCommand)>(&self, mut f: F) -> usize {
        let Some(mut queue) = self.queue.try_lock() else {
            return 0;
        };
        let mut n = 0;
        while let Some(cmd) = queue.pop_front() {
            f(cmd);
            n += 1;
        }
        n
    }

    /// Commands rejected since start (malformed or inbox full).
    pub fn rejected(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }
}
