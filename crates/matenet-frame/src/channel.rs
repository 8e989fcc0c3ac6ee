use std::time::Duration;

use matenet_transport::{Transport, Unit};
use tracing::debug;

use crate::clock::{Clock, MonotonicClock};
use crate::codec::{encode_frame, Frame, FrameConfig, HexDump, FRAME_OVERHEAD};
use crate::decoder::{DecoderStats, FrameDecoder};
use crate::error::{FrameError, Result};

/// A transport paired with the frame codec.
///
/// Callers deal in `(port, payload)`; marker bits and checksums stay in
/// here. The channel owns its transport and receive buffer exclusively, so
/// at most one receive attempt is ever in flight on it.
pub struct PortChannel<T, C = MonotonicClock> {
    transport: T,
    clock: C,
    decoder: FrameDecoder,
    config: FrameConfig,
    tx_units: Vec<Unit>,
}

impl<T: Transport> PortChannel<T> {
    /// Create a channel with default configuration.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, FrameConfig::default())
    }

    /// Create a channel with explicit configuration.
    pub fn with_config(transport: T, config: FrameConfig) -> Self {
        Self::with_clock(transport, config, MonotonicClock::new())
    }
}

impl<T: Transport, C: Clock> PortChannel<T, C> {
    /// Create a channel that measures deadlines with `clock`.
    pub fn with_clock(transport: T, config: FrameConfig, clock: C) -> Self {
        Self {
            transport,
            clock,
            decoder: FrameDecoder::new(),
            config,
            tx_units: Vec::with_capacity(FRAME_OVERHEAD + 8),
        }
    }

    /// Encode and send a payload to `port`.
    pub fn send(&mut self, port: u8, payload: &[u8]) -> Result<()> {
        if payload.len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.config.max_payload_size,
            });
        }

        self.tx_units.clear();
        let checksum = encode_frame(port, payload, &mut self.tx_units)?;
        for unit in &self.tx_units {
            self.transport.write_unit(*unit)?;
        }
        self.transport.flush()?;

        debug!(
            port,
            payload = %HexDump(payload),
            checksum = format_args!("{checksum:#06x}"),
            "TX"
        );
        Ok(())
    }

    /// Send a complete frame.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.port, frame.payload.as_ref())
    }

    /// Make one receive attempt bounded by the configured timeout.
    ///
    /// Fails with [`FrameError::NoData`] immediately when nothing is waiting.
    pub fn receive(&mut self) -> Result<Frame> {
        self.receive_within(self.timeout_ms())
    }

    /// Like [`Self::receive`], bounded by `timeout_ms` instead of the
    /// configured timeout. For callers holding a deadline of their own.
    pub fn receive_within(&mut self, timeout_ms: u32) -> Result<Frame> {
        self.decoder.decode(
            &mut self.transport,
            &self.clock,
            timeout_ms,
            self.config.max_payload_size,
        )
    }

    /// Whether there is something on the bus to start reading.
    /// A frame is not guaranteed.
    pub fn available(&mut self) -> Result<bool> {
        Ok(self.transport.units_available()?)
    }

    /// Set the deadline used by every subsequent receive on this channel.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// The configured timeout in clock ticks, saturating at the counter range.
    pub fn timeout_ms(&self) -> u32 {
        u32::try_from(self.config.timeout.as_millis()).unwrap_or(u32::MAX)
    }

    /// Update maximum payload size for subsequent sends and receives.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current channel configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    /// Receive outcome counters.
    pub fn stats(&self) -> DecoderStats {
        self.decoder.stats()
    }

    /// The tick source used for deadlines.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the channel and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T, C> std::fmt::Debug for PortChannel<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortChannel")
            .field("config", &self.config)
            .field("stats", &self.decoder.stats())
            .finish()
    }
}
