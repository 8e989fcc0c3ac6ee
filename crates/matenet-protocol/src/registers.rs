//! Well-known registers.

/// Identifies the kind of device attached to a port.
pub const REG_DEVICE_TYPE: u16 = 0x0000;

/// First revision field.
pub const REG_REVISION_A: u16 = 0x0002;

/// Second revision field.
pub const REG_REVISION_B: u16 = 0x0003;

/// Third revision field.
pub const REG_REVISION_C: u16 = 0x0004;
