use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{ProtocolError, Result};

/// Wire size of a [`RequestPacket`].
pub const REQUEST_LEN: usize = 4;

/// Wire size of a [`ResponsePacket`].
pub const RESPONSE_LEN: usize = 2;

/// Controller → device payload. Big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RequestPacket {
    pub register: u16,
    pub parameter: u16,
}

impl RequestPacket {
    pub fn new(register: u16, parameter: u16) -> Self {
        Self {
            register,
            parameter,
        }
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16(self.register);
        dst.put_u16(self.parameter);
    }

    pub fn to_bytes(&self) -> [u8; REQUEST_LEN] {
        let mut out = [0u8; REQUEST_LEN];
        self.encode(&mut &mut out[..]);
        out
    }

    /// Decode from a frame payload, which must be exactly [`REQUEST_LEN`] bytes.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        expect_len(src, REQUEST_LEN)?;
        Ok(Self {
            register: src.get_u16(),
            parameter: src.get_u16(),
        })
    }
}

/// Device → controller payload. Big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResponsePacket {
    pub value: u16,
}

impl ResponsePacket {
    pub fn new(value: u16) -> Self {
        Self { value }
    }

    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u16(self.value);
    }

    pub fn to_bytes(&self) -> [u8; RESPONSE_LEN] {
        self.value.to_be_bytes()
    }

    /// Decode from a frame payload, which must be exactly [`RESPONSE_LEN`] bytes.
    pub fn decode(mut src: &[u8]) -> Result<Self> {
        expect_len(src, RESPONSE_LEN)?;
        Ok(Self {
            value: src.get_u16(),
        })
    }
}

fn expect_len(src: &[u8], expected: usize) -> Result<()> {
    if src.len() != expected {
        return Err(ProtocolError::UnexpectedLength {
            expected,
            actual: src.len(),
        });
    }
    Ok(())
}

/// Firmware revision, read as three registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Revision {
    pub a: u16,
    pub b: u16,
    pub c: u16,
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}.{:03}.{:03}", self.a, self.b, self.c)
    }
}
