//! Marker-bit framing for the MATE bus.
//!
//! This is the core layer of matenet. Every frame on the bus is:
//! - one marked unit carrying the port (or answered command) byte
//! - any number of unmarked payload units
//! - a 2-byte big-endian additive checksum over port + payload
//!
//! No length is transmitted; the receiver infers the end of a frame from the
//! gap after it. [`PortChannel`] pairs a transport with the receive state
//! machine and is the interface the protocol layer builds on.

pub mod channel;
pub mod checksum;
pub mod clock;
pub mod codec;
pub mod decoder;
pub mod error;
pub mod port;

pub use channel::PortChannel;
pub use checksum::checksum;
pub use clock::{elapsed_ms, Clock, MonotonicClock};
pub use codec::{
    decode_frame, encode_frame, Frame, FrameConfig, HexDump, DEFAULT_MAX_PAYLOAD, DEFAULT_TIMEOUT,
    FRAME_OVERHEAD, MAX_WIRE_PAYLOAD, RX_BUFFER_SIZE,
};
pub use decoder::{DecoderStats, FrameDecoder, ReceiveBuffer, RxState};
pub use error::{FrameError, Result};
pub use port::{is_hub_port, is_valid_port, port_name, MAX_HUB_PORT, ROOT_PORT};
