//! Request/response protocol on top of MATE-bus frames.
//!
//! A controller addresses a port with a 4-byte [`RequestPacket`]
//! (register, parameter) and the device answers with a 2-byte
//! [`ResponsePacket`]. [`ControllerProtocol`] wraps the common queries:
//! reading a register, writing a control value, identifying the device type
//! and reading the firmware revision. [`DeviceProtocol`] is the responder side.
//!
//! Both hold a [`matenet_frame::PortChannel`] and never share it.

pub mod controller;
pub mod device;
pub mod device_type;
pub mod error;
pub mod packet;
pub mod registers;

pub use controller::ControllerProtocol;
pub use device::DeviceProtocol;
pub use device_type::DeviceType;
pub use error::{ProtocolError, Result};
pub use packet::{RequestPacket, ResponsePacket, Revision, REQUEST_LEN, RESPONSE_LEN};
pub use registers::{REG_DEVICE_TYPE, REG_REVISION_A, REG_REVISION_B, REG_REVISION_C};
