//! Talk to devices on a MATE bus.
//!
//! The MATE bus is a 9-bit, multi-drop serial bus: a controller addresses a
//! device (optionally through a hub port) and the device answers. The marker
//! bit on the first unit of each frame is the only delimiter.
//!
//! # Crate Structure
//!
//! - [`transport`]: 9-bit units and the links that carry them
//! - [`frame`]: marker-bit framing, checksums, the receive state machine
//! - [`protocol`]: controller and device request/response

/// Re-export transport types.
pub mod transport {
    pub use matenet_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use matenet_frame::*;
}

/// Re-export protocol types.
pub mod protocol {
    pub use matenet_protocol::*;
}
