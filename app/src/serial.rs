//! Serial-port adapters: PTT keying over RTS/DTR, and the `SERIALKISS`
//! transport for a client application sharing the TNC's host over a serial
//! line instead of TCP.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;

use crate::ptt::{Ptt, PttError};
use crate::transport::{KissTransport, TransportError};

/// The pin on the serial port driving PTT, with optional inversion (spec §6
/// "optionally inverted, optionally two lines for opposite polarity" — the
/// two-line case is handled by wiring two `SerialPtt`s to the same port
/// under a combining `Ptt` impl at the call site).
pub enum PttPin {
    Rts,
    Dtr,
}

pub struct SerialPtt {
    port: Box<dyn SerialPort>,
    pin: PttPin,
    inverted: bool,
}

impl SerialPtt {
    pub fn available_ports() -> impl Iterator<Item = String> {
        serialport::available_ports()
            .unwrap_or_default()
            .into_iter()
            .map(|i| i.port_name)
    }

    pub fn new(port_name: &str, pin: PttPin, inverted: bool) -> Result<Self, PttError> {
        let port = serialport::new(port_name, 9600).open()?;
        let mut s = Self {
            port,
            pin,
            inverted,
        };
        s.ptt_off()?;
        Ok(s)
    }

    fn set_line(&mut self, asserted: bool) -> Result<(), PttError> {
        let level = asserted != self.inverted;
        match self.pin {
            PttPin::Rts => self.port.write_request_to_send(level)?,
            PttPin::Dtr => self.port.write_data_terminal_ready(level)?,
        }
        Ok(())
    }
}

impl Ptt for SerialPtt {
    fn ptt_on(&mut self) -> Result<(), PttError> {
        self.set_line(true)
    }

    fn ptt_off(&mut self) -> Result<(), PttError> {
        self.set_line(false)
    }
}

/// KISS-over-serial transport for the `SERIALKISS` configuration tag.
pub struct SerialKissTransport {
    port: Box<dyn SerialPort>,
}

impl SerialKissTransport {
    pub fn new(port_name: &str, baud: u32) -> Result<Self, TransportError> {
        let port = serialport::new(port_name, baud)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(|e| TransportError::Io(e.to_string()))?;
        Ok(Self { port })
    }
}

impl Read for SerialKissTransport {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.port.read(buf) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            Err(e) => Err(e),
        }
    }
}

impl Write for SerialKissTransport {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.port.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.port.flush()
    }
}

impl KissTransport for SerialKissTransport {
    fn try_clone(&mut self) -> Result<Self, TransportError> {
        self.port
            .try_clone()
            .map(|port| Self { port })
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    fn start(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
