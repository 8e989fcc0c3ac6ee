/// Errors that can occur in controller and device operations.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Frame-level error (including transport failures underneath it).
    #[error("frame error: {0}")]
    Frame(#[from] matenet_frame::FrameError),

    /// A frame arrived with the wrong payload size for its packet type.
    #[error("unexpected payload length ({actual} bytes, expected {expected})")]
    UnexpectedLength { expected: usize, actual: usize },

    /// The device type register returned a code with no known device.
    #[error("unknown device type code {0:#06x}")]
    UnknownDeviceType(u16),

    /// No valid response arrived before the request deadline.
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl ProtocolError {
    /// True for the "nothing waiting yet" outcome of a non-blocking receive.
    pub fn is_no_data(&self) -> bool {
        matches!(self, ProtocolError::Frame(err) if err.is_no_data())
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
