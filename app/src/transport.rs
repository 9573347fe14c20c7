//! A KISS transport is anything that can carry escaped KISS frame bytes
//! between this TNC and a client application: a TCP socket (`KISSPORT`) or
//! a serial port (`SERIALKISS`), per the tag-grammar settings in §9. The
//! client-side consumer of those bytes (an APRS client, a BBS) is outside
//! this crate's scope; only the byte-carrying transport lives here.

use std::io::{Read, Write};

/// A transport that carries KISS frame bytes to and from a client.
///
/// Implementations must be cloneable via `try_clone` to support reading and
/// writing from separate threads concurrently, without requiring `Clone`
/// directly (which `TcpStream` cannot provide in a way that shares the
/// underlying socket).
pub trait KissTransport: Read + Write + Sized + Send + 'static {
    fn try_clone(&mut self) -> Result<Self, TransportError>;

    /// Begin I/O. Called once, before the first read/write.
    fn start(&mut self) -> Result<(), TransportError>;

    /// Shut down I/O. Assumed non-restartable.
    fn close(&mut self) -> Result<(), TransportError>;
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TransportError {
    Io(String),
}

impl KissTransport for std::net::TcpStream {
    fn try_clone(&mut self) -> Result<Self, TransportError> {
        std::net::TcpStream::try_clone(self).map_err(|e| TransportError::Io(e.to_string()))
    }

    fn start(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.shutdown(std::net::Shutdown::Both)
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}
