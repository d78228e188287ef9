//! Length-prefix frame codec.
//!
//! Wire format:
//! ```text
//! ┌────────────┬──────────────────────────┐
//! │ Length (4B)│ postcard payload (N B)   │
//! │ LE u32     │                          │
//! └────────────┴──────────────────────────┘
//! ```
//!
//! Payloads are serde values encoded with `postcard`. Tagged unions are
//! plain serde enums, so the variant index is written first and selects
//! which arm gets decoded.
//!
//! Every read or write goes through a [`SerializationBuffer`] that the
//! caller owns and reuses, so a channel that keeps its buffer around stops
//! allocating once the buffer has grown to the largest message it sees.
//! Any decoding failure is a [`ProtocolError`]: the stream is out of sync
//! and the channel must be dropped.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, Result, TransportError};

/// Maximum frame payload size. Plugin state blobs can be large, audio
/// buffers are not.
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Frame header size (4-byte little-endian length).
pub const HEADER_SIZE: usize = 4;

/// Default capacity for short-lived buffers.
pub const DEFAULT_CAPACITY: usize = 256;

/// Growable byte buffer reused across reads and writes.
#[derive(Debug, Default)]
pub struct SerializationBuffer {
    bytes: Vec<u8>,
}

impl SerializationBuffer {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    /// Give back memory grown by an unusually large message.
    pub fn shrink_to(&mut self, capacity: usize) {
        self.bytes.clear();
        self.bytes.shrink_to(capacity);
    }

    /// Encode `value` as a complete frame (header plus payload).
    /// Returns the frame bytes, valid until the next use of the buffer.
    pub fn encode_frame<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<&[u8]> {
        self.bytes.clear();
        self.bytes.extend_from_slice(&[0; HEADER_SIZE]);
        // Serialize through a borrow so a failure leaves the allocation here.
        postcard::to_io(value, &mut self.bytes)?;

        let len = self.bytes.len() - HEADER_SIZE;
        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: MAX_FRAME_SIZE,
            }
            .into());
        }
        self.bytes[..HEADER_SIZE].copy_from_slice(&(len as u32).to_le_bytes());

        Ok(&self.bytes)
    }

    /// Read one frame's payload from `reader` into the buffer.
    fn read_payload<R: Read>(&mut self, reader: &mut R) -> Result<&[u8]> {
        let mut header = [0u8; HEADER_SIZE];
        reader.read_exact(&mut header).map_err(TransportError::from)?;

        let len = u32::from_le_bytes(header) as usize;
        if len > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                len,
                max: MAX_FRAME_SIZE,
            }
            .into());
        }

        // Grow with the data actually received rather than trusting the
        // header with an up-front allocation.
        self.bytes.clear();
        let read = reader
            .by_ref()
            .take(len as u64)
            .read_to_end(&mut self.bytes)
            .map_err(TransportError::from)?;
        if read < len {
            return Err(TransportError::Closed.into());
        }

        Ok(&self.bytes)
    }
}

/// Encode a value into a standalone payload (no frame header).
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(value)?)
}

/// Decode a standalone payload. The whole slice must be consumed.
pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T> {
    let (value, rest) = postcard::take_from_bytes(payload)?;
    if !rest.is_empty() {
        return Err(ProtocolError::TrailingBytes(rest.len()).into());
    }
    Ok(value)
}

/// Decode a standalone payload into an existing value, reusing whatever
/// allocations the value's type knows how to reuse (vectors, strings).
pub fn decode_into<T: DeserializeOwned>(payload: &[u8], target: &mut T) -> Result<()> {
    let mut deserializer = postcard::Deserializer::from_bytes(payload);
    <T as Deserialize>::deserialize_in_place(&mut deserializer, target)?;
    let rest = deserializer.finalize()?;
    if !rest.is_empty() {
        return Err(ProtocolError::TrailingBytes(rest.len()).into());
    }
    Ok(())
}

/// Serialize `object` and write it as one frame.
pub fn write_object<W, T>(writer: &mut W, object: &T, buffer: &mut SerializationBuffer) -> Result<()>
where
    W: Write,
    T: Serialize + ?Sized,
{
    let frame = buffer.encode_frame(object)?;
    writer.write_all(frame).map_err(TransportError::from)?;
    writer.flush().map_err(TransportError::from)?;
    Ok(())
}

/// Read one frame and decode it as `T`.
pub fn read_object<R, T>(reader: &mut R, buffer: &mut SerializationBuffer) -> Result<T>
where
    R: Read,
    T: DeserializeOwned,
{
    let payload = buffer.read_payload(reader)?;
    decode(payload)
}

/// Read one frame and decode it into `target`.
pub fn read_object_into<R, T>(
    reader: &mut R,
    target: &mut T,
    buffer: &mut SerializationBuffer,
) -> Result<()>
where
    R: Read,
    T: DeserializeOwned,
{
    let payload = buffer.read_payload(reader)?;
    decode_into(payload, target)
}
