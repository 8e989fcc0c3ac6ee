use std::fmt;

/// The marker (9th) bit. Set only on the first unit of a frame.
pub const MARKER: u16 = 0x100;

const UNIT_MASK: u16 = 0x1FF;

/// One 9-bit transmission unit: 8 data bits plus the marker bit.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Unit(u16);

impl Unit {
    /// A start-of-frame unit (marker bit set).
    pub const fn marked(byte: u8) -> Self {
        Self(byte as u16 | MARKER)
    }

    /// A payload unit (marker bit clear).
    pub const fn data(byte: u8) -> Self {
        Self(byte as u16)
    }

    /// Build a unit from a raw value. Bits above the 9th are dropped.
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw & UNIT_MASK)
    }

    /// The 8 data bits, marker stripped.
    pub const fn byte(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    pub const fn is_marked(self) -> bool {
        self.0 & MARKER != 0
    }

    /// The full 9-bit value.
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Debug for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_marked() {
            write!(f, "Unit(*{:02X})", self.byte())
        } else {
            write!(f, "Unit({:02X})", self.byte())
        }
    }
}

impl From<Unit> for u16 {
    fn from(unit: Unit) -> Self {
        unit.raw()
    }
}
