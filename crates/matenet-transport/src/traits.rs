use crate::error::Result;
use crate::unit::Unit;

/// A half-duplex link that moves 9-bit [`Unit`]s.
///
/// Reads never block: `read_unit` returns `Ok(None)` when nothing has
/// arrived yet. Writers may stage units until [`Transport::flush`], so a
/// frame written unit by unit still leaves the sender back-to-back.
pub trait Transport {
    /// Queue one unit for transmission.
    fn write_unit(&mut self, unit: Unit) -> Result<()>;

    /// Take the next received unit, if one is available right now.
    fn read_unit(&mut self) -> Result<Option<Unit>>;

    /// Look at the next received unit without consuming it.
    fn peek_unit(&mut self) -> Result<Option<Unit>>;

    /// Whether at least one unit can be read without waiting.
    fn units_available(&mut self) -> Result<bool> {
        Ok(self.peek_unit()?.is_some())
    }

    /// Push any staged units onto the link.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_unit(&mut self, unit: Unit) -> Result<()> {
        (**self).write_unit(unit)
    }

    fn read_unit(&mut self) -> Result<Option<Unit>> {
        (**self).read_unit()
    }

    fn peek_unit(&mut self) -> Result<Option<Unit>> {
        (**self).peek_unit()
    }

    fn units_available(&mut self) -> Result<bool> {
        (**self).units_available()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write_unit(&mut self, unit: Unit) -> Result<()> {
        (**self).write_unit(unit)
    }

    fn read_unit(&mut self) -> Result<Option<Unit>> {
        (**self).read_unit()
    }

    fn peek_unit(&mut self) -> Result<Option<Unit>> {
        (**self).peek_unit()
    }

    fn units_available(&mut self) -> Result<bool> {
        (**self).units_available()
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
