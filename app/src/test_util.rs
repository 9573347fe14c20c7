use std::io::{Read, Write};

use crate::transport::{KissTransport, TransportError};

/// A `KissTransport` that carries no bytes, for tests that exercise
/// session plumbing without a real socket or serial port.
#[derive(Clone)]
pub(crate) struct NullTransport;

impl KissTransport for NullTransport {
    fn try_clone(&mut self) -> Result<Self, TransportError> {
        Ok(self.clone())
    }

    fn start(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl Write for NullTransport {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Ok(0)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Read for NullTransport {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(0)
    }
}
