use std::time::Duration;

use bytes::Bytes;
use matenet_transport::Unit;

use crate::checksum::checksum;
use crate::error::{FrameError, Result};

/// Port byte + 2 checksum bytes.
pub const FRAME_OVERHEAD: usize = 3;

/// Capacity of the fixed receive buffer, in bytes.
pub const RX_BUFFER_SIZE: usize = 32;

/// Largest payload the default receive buffer can hold.
pub const DEFAULT_MAX_PAYLOAD: usize = RX_BUFFER_SIZE - FRAME_OVERHEAD;

/// Largest payload the encoder accepts (payload length is a byte on the bus side).
pub const MAX_WIRE_PAYLOAD: usize = u8::MAX as usize;

/// Default receive deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// One frame: the marked port/command byte and its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Destination port when sent by a controller, answered command when
    /// sent by a device.
    pub port: u8,
    /// The bytes between the port byte and the checksum.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(port: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            port,
            payload: payload.into(),
        }
    }

    /// Number of 9-bit units this frame occupies on the bus.
    pub fn wire_units(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// The checksum this frame carries on the wire.
    pub fn checksum(&self) -> u16 {
        checksum(self.port, &self.payload)
    }
}

/// Encode a frame into bus units.
///
/// Wire format:
/// ```text
/// ┌────────────┬───────────────────┬─────────────┬─────────────┐
/// │ port       │ payload           │ checksum hi │ checksum lo │
/// │ marker = 1 │ marker = 0 (each) │ marker = 0  │ marker = 0  │
/// └────────────┴───────────────────┴─────────────┴─────────────┘
/// ```
/// There is no length field; the receiver finds the end of a frame by the
/// gap that follows it.
pub fn encode_frame(port: u8, payload: &[u8], dst: &mut Vec<Unit>) -> Result<u16> {
    if payload.len() > MAX_WIRE_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_WIRE_PAYLOAD,
        });
    }
    let sum = checksum(port, payload);
    let [hi, lo] = sum.to_be_bytes();

    dst.reserve(FRAME_OVERHEAD + payload.len());
    dst.push(Unit::marked(port));
    dst.extend(payload.iter().copied().map(Unit::data));
    dst.push(Unit::data(hi));
    dst.push(Unit::data(lo));
    Ok(sum)
}

/// Split a collected frame (marker already stripped) into port and payload
/// and verify its checksum.
pub fn decode_frame(collected: &[u8]) -> Result<Frame> {
    if collected.len() < FRAME_OVERHEAD {
        return Err(FrameError::Truncated {
            len: collected.len(),
        });
    }

    let last = collected.len() - 1;
    let port = collected[0];
    let expected = u16::from_be_bytes([collected[last - 1], collected[last]]);
    let payload = &collected[1..last - 1];

    let actual = checksum(port, payload);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }

    Ok(Frame::new(port, Bytes::copy_from_slice(payload)))
}

/// Formats bytes as space-separated hex for trace output.
pub struct HexDump<'a>(pub &'a [u8]);

impl std::fmt::Display for HexDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for HexDump<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Configuration for a port channel.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: [`DEFAULT_MAX_PAYLOAD`].
    pub max_payload_size: usize,
    /// Receive deadline for one frame or one blocking request. Default: 100 ms.
    pub timeout: Duration,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
