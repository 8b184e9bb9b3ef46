//! Big-endian packet readers and writers.
//!
//! Outbound packets are built in fixed-capacity [`Packet`] buffers so the
//! tick path never allocates. Readers take a cursor and return `None` when
//! the input is too short.

use heapless::Vec;
use refloat_common::consts::SEND_BUF_MAX_SIZE;
use thiserror::Error;

/// Outbound app-data packet.
pub type Packet = Vec<u8, SEND_BUF_MAX_SIZE>;

/// Packet capacity exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("packet buffer full")]
pub struct BufferFull;

pub fn append_u8<const N: usize>(buf: &mut Vec<u8, N>, value: u8) -> Result<(), BufferFull> {
    buf.push(value).map_err(|_| BufferFull)
}

pub fn append_u16<const N: usize>(buf: &mut Vec<u8, N>, value: u16) -> Result<(), BufferFull> {
    buf.extend_from_slice(&value.to_be_bytes())
        .map_err(|_| BufferFull)
}

pub fn append_u32<const N: usize>(buf: &mut Vec<u8, N>, value: u32) -> Result<(), BufferFull> {
    buf.extend_from_slice(&value.to_be_bytes())
        .map_err(|_| BufferFull)
}

/// Append `value` followed by a NUL terminator.
pub fn append_str<const N: usize>(buf: &mut Vec<u8, N>, value: &str) -> Result<(), BufferFull> {
    if buf.len() + value.len() + 1 > buf.capacity() {
        return Err(BufferFull);
    }
    buf.extend_from_slice(value.as_bytes())
        .map_err(|_| BufferFull)?;
    append_u8(buf, 0)
}

pub fn get_u8(buf: &[u8], ind: &mut usize) -> Option<u8> {
    let value = *buf.get(*ind)?;
    *ind += 1;
    Some(value)
}

pub fn get_i16(buf: &[u8], ind: &mut usize) -> Option<i16> {
    let bytes = buf.get(*ind..*ind + 2)?;
    *ind += 2;
    Some(i16::from_be_bytes([bytes[0], bytes[1]]))
}

pub fn get_u32(buf: &[u8], ind: &mut usize) -> Option<u32> {
    let bytes = buf.get(*ind..*ind + 4)?;
    *ind += 4;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Signed 16-bit fixed point divided by `scale`.
pub fn get_scaled_i16(buf: &[u8], scale: f32, ind: &mut usize) -> Option<f32> {
    get_i16(buf, ind).map(|v| v as f32 / scale)
}
