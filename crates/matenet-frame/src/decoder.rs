use matenet_transport::{Transport, TransportError};
use tracing::{debug, trace, warn};

use crate::clock::{elapsed_ms, Clock};
use crate::codec::{decode_frame, Frame, HexDump, FRAME_OVERHEAD, RX_BUFFER_SIZE};
use crate::error::{FrameError, Result};

/// Fixed-capacity receive buffer plus write cursor.
///
/// Owned by exactly one decoder. The cursor never passes the capacity:
/// a push at `cursor == capacity` fails instead of writing.
#[derive(Clone)]
pub struct ReceiveBuffer {
    bytes: [u8; RX_BUFFER_SIZE],
    cursor: usize,
}

impl ReceiveBuffer {
    pub const CAPACITY: usize = RX_BUFFER_SIZE;

    pub fn new() -> Self {
        Self {
            bytes: [0; RX_BUFFER_SIZE],
            cursor: 0,
        }
    }

    /// Append one byte, or fail with [`FrameError::Overflow`] if full.
    pub fn push(&mut self, byte: u8) -> Result<()> {
        if self.cursor >= Self::CAPACITY {
            return Err(FrameError::Overflow {
                capacity: Self::CAPACITY,
            });
        }
        self.bytes[self.cursor] = byte;
        self.cursor += 1;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.cursor]
    }
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ReceiveBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiveBuffer")
            .field("len", &self.cursor)
            .field("bytes", &HexDump(self.as_slice()))
            .finish()
    }
}

/// Where the receiver is within a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Buffer empty, hunting for a marked unit.
    Idle,
    /// Start-of-frame seen, collecting bytes.
    Collecting,
}

/// Running totals of receive outcomes, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecoderStats {
    pub frames: u64,
    pub timeouts: u64,
    pub truncated: u64,
    pub overflows: u64,
    pub checksum_errors: u64,
    /// Partial frames dropped because a new start-of-frame arrived.
    pub resyncs: u64,
    /// Unmarked units seen while idle.
    pub discarded_units: u64,
}

/// Gap-framed receive state machine.
///
/// There is no length on the wire. A frame ends when no further unit is
/// immediately available, when the next unit starts a new frame and the
/// bytes so far already verify, or when the configured maximum length is
/// reached. This relies on senders transmitting a frame back-to-back; the
/// checksum catches frames split by a slow link.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: ReceiveBuffer,
    stats: DecoderStats,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RxState {
        if self.buffer.is_empty() {
            RxState::Idle
        } else {
            RxState::Collecting
        }
    }

    pub fn stats(&self) -> DecoderStats {
        self.stats
    }

    /// Run one decode attempt.
    ///
    /// Returns [`FrameError::NoData`] straight away if nothing is waiting,
    /// or once stray unmarked units have been discarded and nothing follows
    /// them. Otherwise polls `transport` until a frame completes or
    /// `timeout_ms` passes. The receive buffer is empty again whatever the
    /// outcome.
    pub fn decode<T, C>(
        &mut self,
        transport: &mut T,
        clock: &C,
        timeout_ms: u32,
        max_payload: usize,
    ) -> Result<Frame>
    where
        T: Transport + ?Sized,
        C: Clock + ?Sized,
    {
        let outcome = self.collect(transport, clock, timeout_ms, max_payload);
        self.buffer.clear();
        self.record(&outcome);
        outcome
    }

    fn collect<T, C>(
        &mut self,
        transport: &mut T,
        clock: &C,
        timeout_ms: u32,
        max_payload: usize,
    ) -> Result<Frame>
    where
        T: Transport + ?Sized,
        C: Clock + ?Sized,
    {
        if self.buffer.is_empty() && !transport.units_available()? {
            return Err(FrameError::NoData);
        }

        let max_len = max_payload.saturating_add(FRAME_OVERHEAD);
        let start = clock.now_ms();

        loop {
            let elapsed = elapsed_ms(start, clock.now_ms());
            if elapsed > timeout_ms {
                debug!(elapsed_ms = elapsed, collected = self.buffer.len(), "RX: timeout");
                return Err(FrameError::Timeout {
                    elapsed_ms: elapsed,
                });
            }

            let Some(unit) = transport.read_unit()? else {
                // Idle noise drained and nothing behind it: no frame started.
                if self.buffer.is_empty() {
                    return Err(FrameError::NoData);
                }
                std::thread::yield_now();
                continue;
            };

            if unit.is_marked() {
                if !self.buffer.is_empty() {
                    warn!(
                        discarded = %HexDump(self.buffer.as_slice()),
                        "RX: unexpected start of frame, resynchronizing"
                    );
                    self.stats.resyncs += 1;
                    self.buffer.clear();
                }
            } else if self.buffer.is_empty() {
                trace!(byte = unit.byte(), "RX: discarding unit outside a frame");
                self.stats.discarded_units += 1;
                continue;
            }

            self.buffer.push(unit.byte())?;

            if self.buffer.len() >= max_len || self.at_frame_boundary(transport)? {
                break;
            }
        }

        debug!(len = self.buffer.len(), "RX: end of packet");
        let frame = decode_frame(self.buffer.as_slice())?;
        debug!(
            port = frame.port,
            payload = %HexDump(&frame.payload),
            checksum = format_args!("{:#06x}", frame.checksum()),
            "RX"
        );
        Ok(frame)
    }

    fn at_frame_boundary<T: Transport + ?Sized>(&self, transport: &mut T) -> Result<bool> {
        match transport.peek_unit() {
            Ok(None) => Ok(true),
            // The link ending is a gap too; the frame in hand still counts.
            Err(TransportError::Closed) => Ok(true),
            Err(err) => Err(err.into()),
            // Back-to-back frames: stop at the next marker only when what we
            // hold is already a complete frame, otherwise let it resync.
            Ok(Some(next)) if next.is_marked() => {
                Ok(decode_frame(self.buffer.as_slice()).is_ok())
            }
            Ok(Some(_)) => Ok(false),
        }
    }

    fn record(&mut self, outcome: &Result<Frame>) {
        match outcome {
            Ok(_) => self.stats.frames += 1,
            Err(FrameError::Timeout { .. }) => self.stats.timeouts += 1,
            Err(FrameError::Truncated { len }) => {
                debug!(len, "RX: truncated frame");
                self.stats.truncated += 1;
            }
            Err(FrameError::Overflow { capacity }) => {
                warn!(capacity, "RX: receive buffer overflow");
                self.stats.overflows += 1;
            }
            Err(FrameError::ChecksumMismatch { expected, actual }) => {
                warn!(
                    expected = format_args!("{expected:#06x}"),
                    actual = format_args!("{actual:#06x}"),
                    "RX: invalid checksum"
                );
                self.stats.checksum_errors += 1;
            }
            Err(_) => {}
        }
    }
}
