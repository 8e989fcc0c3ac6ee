use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, TransportError};
use crate::traits::Transport;
use crate::unit::Unit;

#[derive(Debug, Default)]
struct Link {
    queue: VecDeque<Unit>,
    closed: bool,
}

type SharedLink = Arc<Mutex<Link>>;

fn lock(link: &SharedLink) -> MutexGuard<'_, Link> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One end of an in-process bus link.
///
/// Units written on one end become readable on the other end once
/// [`Transport::flush`] is called, all at once. That mirrors a UART sending
/// a frame back-to-back and keeps the gap-based end-of-frame detection above
/// deterministic. Both ends may live on different threads.
#[derive(Debug)]
pub struct MemoryTransport {
    inbound: SharedLink,
    outbound: SharedLink,
    staged: Vec<Unit>,
    sent: Vec<Unit>,
}

impl MemoryTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let a_to_b = SharedLink::default();
        let b_to_a = SharedLink::default();
        let a = Self {
            inbound: Arc::clone(&b_to_a),
            outbound: Arc::clone(&a_to_b),
            staged: Vec::new(),
            sent: Vec::new(),
        };
        let b = Self {
            inbound: a_to_b,
            outbound: b_to_a,
            staged: Vec::new(),
            sent: Vec::new(),
        };
        (a, b)
    }

    /// Make units readable on this end as if the bus had delivered them.
    pub fn inject(&self, units: &[Unit]) {
        lock(&self.inbound).queue.extend(units.iter().copied());
    }

    /// Every unit this end has put on the link so far.
    pub fn sent(&self) -> &[Unit] {
        &self.sent
    }

    /// Number of units waiting to be read on this end.
    pub fn pending(&self) -> usize {
        lock(&self.inbound).queue.len()
    }

    /// Close the outbound direction. The peer drains what is queued, then
    /// sees [`TransportError::Closed`].
    pub fn close(&self) {
        lock(&self.outbound).closed = true;
    }
}

impl Transport for MemoryTransport {
    fn write_unit(&mut self, unit: Unit) -> Result<()> {
        self.staged.push(unit);
        Ok(())
    }

    fn read_unit(&mut self) -> Result<Option<Unit>> {
        let mut link = lock(&self.inbound);
        match link.queue.pop_front() {
            Some(unit) => Ok(Some(unit)),
            None if link.closed => Err(TransportError::Closed),
            None => Ok(None),
        }
    }

    fn peek_unit(&mut self) -> Result<Option<Unit>> {
        let link = lock(&self.inbound);
        match link.queue.front() {
            Some(unit) => Ok(Some(*unit)),
            None if link.closed => Err(TransportError::Closed),
            None => Ok(None),
        }
    }

    fn flush(&mut self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut link = lock(&self.outbound);
        if link.closed {
            return Err(TransportError::Closed);
        }
        link.queue.extend(self.staged.iter().copied());
        self.sent.append(&mut self.staged);
        Ok(())
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn units_cross_only_after_flush() {
        let (mut a, mut b) = MemoryTransport::pair();

        a.write_unit(Unit::marked(1)).unwrap();
        a.write_unit(Unit::data(2)).unwrap();
        assert!(!b.units_available().unwrap());

        a.flush().unwrap();
        assert!(b.units_available().unwrap());
        assert_eq!(b.peek_unit().unwrap(), Some(Unit::marked(1)));
        assert_eq!(b.read_unit().unwrap(), Some(Unit::marked(1)));
        assert_eq!(b.read_unit().unwrap(), Some(Unit::data(2)));
        assert_eq!(b.read_unit().unwrap(), None);
        assert_eq!(a.sent(), &[Unit::marked(1), Unit::data(2)]);
    }

    #[test]
    fn directions_are_independent() {
        let (mut a, mut b) = MemoryTransport::pair();

        b.write_unit(Unit::data(9)).unwrap();
        b.flush().unwrap();

        assert!(!b.units_available().unwrap());
        assert_eq!(a.read_unit().unwrap(), Some(Unit::data(9)));
    }

    #[test]
    fn inject_feeds_own_inbound_queue() {
        let (mut a, _b) = MemoryTransport::pair();
        a.inject(&[Unit::data(0xAA), Unit::marked(0x03)]);

        assert_eq!(a.pending(), 2);
        assert_eq!(a.read_unit().unwrap(), Some(Unit::data(0xAA)));
        assert_eq!(a.read_unit().unwrap(), Some(Unit::marked(0x03)));
    }

    #[test]
    fn dropped_peer_reports_closed_after_drain() {
        let (mut a, mut b) = MemoryTransport::pair();
        a.write_unit(Unit::marked(5)).unwrap();
        a.flush().unwrap();
        drop(a);

        assert_eq!(b.read_unit().unwrap(), Some(Unit::marked(5)));
        assert!(matches!(b.read_unit(), Err(TransportError::Closed)));
        assert!(matches!(b.units_available(), Err(TransportError::Closed)));
    }

    #[test]
    fn works_across_threads() {
        let (mut a, mut b) = MemoryTransport::pair();

        let writer = std::thread::spawn(move || {
            for byte in 0..16u8 {
                a.write_unit(Unit::data(byte)).unwrap();
            }
            a.flush().unwrap();
            a
        });
        let _a = writer.join().unwrap();

        let mut received = Vec::new();
        while let Some(unit) = b.read_unit().unwrap() {
            received.push(unit.byte());
        }
        assert_eq!(received, (0..16u8).collect::<Vec<_>>());
    }
}
