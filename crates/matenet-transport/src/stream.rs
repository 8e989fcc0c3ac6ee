use std::collections::VecDeque;
use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};
use crate::traits::Transport;
use crate::unit::Unit;

const READ_CHUNK_SIZE: usize = 256;

/// Carries 9-bit units over a byte stream, two bytes per unit (big-endian).
///
/// The stream is expected to be non-blocking: a read that would block
/// simply means no unit has arrived yet. Written units are staged and go
/// out in a single write on [`Transport::flush`].
pub struct StreamTransport<S> {
    inner: S,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    eof: bool,
}

impl<S: Read + Write> StreamTransport<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            rx: VecDeque::new(),
            tx: Vec::new(),
            eof: false,
        }
    }

    /// Pull whatever the stream has ready into the receive buffer.
    fn fill(&mut self) -> Result<()> {
        if self.eof {
            return Ok(());
        }
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => self.rx.extend(&chunk[..n]),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => return Ok(()),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Consume the transport and return the inner stream.
    /// Staged and buffered units are discarded.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn write_unit(&mut self, unit: Unit) -> Result<()> {
        self.tx.extend_from_slice(&unit.raw().to_be_bytes());
        Ok(())
    }

    fn read_unit(&mut self) -> Result<Option<Unit>> {
        let unit = self.peek_unit()?;
        if unit.is_some() {
            self.rx.drain(..2);
        }
        Ok(unit)
    }

    fn peek_unit(&mut self) -> Result<Option<Unit>> {
        if self.rx.len() < 2 {
            self.fill()?;
        }
        match (self.rx.front(), self.rx.get(1)) {
            (Some(&hi), Some(&lo)) => Ok(Some(Unit::from_raw(u16::from_be_bytes([hi, lo])))),
            _ if self.eof => Err(TransportError::Closed),
            _ => Ok(None),
        }
    }

    fn flush(&mut self) -> Result<()> {
        let mut offset = 0usize;
        while offset < self.tx.len() {
            match self.inner.write(&self.tx[offset..]) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => std::thread::yield_now(),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
        self.tx.clear();

        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => std::thread::yield_now(),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<S> std::fmt::Debug for StreamTransport<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamTransport")
            .field("buffered_bytes", &self.rx.len())
            .field("staged_bytes", &self.tx.len())
            .field("eof", &self.eof)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    /// Separate read and write halves, like a socket.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn duplex(input: Vec<u8>) -> StreamTransport<Duplex> {
        StreamTransport::new(Duplex {
            input: Cursor::new(input),
            output: Vec::new(),
        })
    }

    #[test]
    fn writes_two_bytes_per_unit_on_flush() {
        let mut transport = duplex(Vec::new());
        transport.write_unit(Unit::marked(0x02)).unwrap();
        transport.write_unit(Unit::data(0xAB)).unwrap();
        assert!(transport.get_ref().output.is_empty());

        transport.flush().unwrap();
        assert_eq!(transport.get_ref().output, vec![0x01, 0x02, 0x00, 0xAB]);
    }

    #[test]
    fn reads_units_then_reports_closed() {
        let mut transport = duplex(vec![0x01, 0x05, 0x00, 0x10]);

        assert!(transport.units_available().unwrap());
        assert_eq!(transport.peek_unit().unwrap(), Some(Unit::marked(0x05)));
        assert_eq!(transport.read_unit().unwrap(), Some(Unit::marked(0x05)));
        assert_eq!(transport.read_unit().unwrap(), Some(Unit::data(0x10)));
        assert!(matches!(transport.read_unit(), Err(TransportError::Closed)));
    }

    #[test]
    fn dangling_half_unit_at_eof_is_closed() {
        let mut transport = duplex(vec![0x00, 0x10, 0x01]);
        assert_eq!(transport.read_unit().unwrap(), Some(Unit::data(0x10)));
        assert!(matches!(transport.read_unit(), Err(TransportError::Closed)));
    }

    /// Takes one byte per write and refuses every other call.
    struct Congested {
        output: Vec<u8>,
        refused: usize,
        ready: bool,
        flush_refusals: usize,
    }

    impl Write for Congested {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.ready = !self.ready;
            if !self.ready {
                self.refused += 1;
                return Err(ErrorKind::WouldBlock.into());
            }
            self.output.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            if self.flush_refusals > 0 {
                self.flush_refusals -= 1;
                return Err(ErrorKind::WouldBlock.into());
            }
            Ok(())
        }
    }

    impl Read for Congested {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(ErrorKind::WouldBlock.into())
        }
    }

    #[test]
    fn flush_retries_until_writer_drains() {
        let mut transport = StreamTransport::new(Congested {
            output: Vec::new(),
            refused: 0,
            ready: true,
            flush_refusals: 3,
        });
        transport.write_unit(Unit::marked(0x03)).unwrap();
        transport.write_unit(Unit::data(0x7F)).unwrap();

        transport.flush().unwrap();
        let inner = transport.get_ref();
        assert_eq!(inner.output, vec![0x01, 0x03, 0x00, 0x7F]);
        assert_eq!(inner.refused, 4);
        assert_eq!(inner.flush_refusals, 0);
    }

    #[test]
    #[cfg(unix)]
    fn would_block_means_no_unit_yet() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        left.set_nonblocking(true).unwrap();
        right.set_nonblocking(true).unwrap();
        let mut a = StreamTransport::new(left);
        let mut b = StreamTransport::new(right);

        assert!(!b.units_available().unwrap());
        assert_eq!(b.read_unit().unwrap(), None);

        a.write_unit(Unit::marked(0x07)).unwrap();
        a.write_unit(Unit::data(0x00)).unwrap();
        a.flush().unwrap();

        // Local socket pairs deliver immediately, but give the kernel a moment.
        let start = std::time::Instant::now();
        while !b.units_available().unwrap() {
            assert!(start.elapsed() < std::time::Duration::from_secs(1));
            std::thread::yield_now();
        }
        assert_eq!(b.read_unit().unwrap(), Some(Unit::marked(0x07)));
        assert_eq!(b.read_unit().unwrap(), Some(Unit::data(0x00)));
        assert_eq!(b.read_unit().unwrap(), None);
    }
}
