//! 9-bit unit transport for the MATE bus.
//!
//! Every unit on the wire carries 8 data bits plus a marker bit. The marker
//! is set only on the first unit of a frame, which is all the framing layer
//! above has to go on. This crate provides:
//! - [`Unit`], the 9-bit value
//! - [`Transport`], the narrow read/write/availability contract
//! - [`MemoryTransport`], an in-process half-duplex link
//! - [`StreamTransport`], units carried over any non-blocking byte stream
//! - [`BusSocket`], a Unix-domain socket standing in for a bus segment (Unix)
//!
//! This is the lowest layer of matenet. Everything else builds on [`Transport`].

pub mod error;
pub mod memory;
pub mod stream;
pub mod traits;
pub mod unit;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use memory::MemoryTransport;
pub use stream::StreamTransport;
pub use traits::Transport;
pub use unit::{Unit, MARKER};

#[cfg(unix)]
pub use uds::BusSocket;
