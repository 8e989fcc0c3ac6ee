use matenet_transport::TransportError;

/// Errors that can occur while encoding or receiving frames.
///
/// Every receive failure leaves the receive buffer empty, so the next
/// attempt starts clean.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Nothing is waiting on the bus. Not a timeout; try again later.
    #[error("no data available")]
    NoData,

    /// The frame did not complete before the receive deadline.
    #[error("receive timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u32 },

    /// Fewer than three bytes (port + checksum) arrived before the gap.
    #[error("truncated frame ({len} bytes, need at least 3)")]
    Truncated { len: usize },

    /// The frame did not fit the receive buffer.
    #[error("receive buffer overflow (capacity {capacity} bytes)")]
    Overflow { capacity: usize },

    /// The checksum carried on the wire does not match the frame contents.
    #[error("checksum mismatch (wire {expected:#06x}, computed {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
}

impl FrameError {
    /// True for the "nothing yet" outcome that callers poll past.
    pub fn is_no_data(&self) -> bool {
        matches!(self, FrameError::NoData)
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
