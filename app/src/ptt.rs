//! PTT (push-to-talk) outputs. Spec §6 lists serial control line, GPIO pin,
//! parallel port bit, hamlib model+port, and CM108 HID GPIO as supported
//! keying mechanisms; this crate implements the serial line directly and
//! leaves the others as a documented extension point (`PttError::Unsupported`)
//! since they depend on platform-specific drivers outside this crate's reach.

use thiserror::Error;

pub trait Ptt: Send + 'static {
    fn ptt_on(&mut self) -> Result<(), PttError>;
    fn ptt_off(&mut self) -> Result<(), PttError>;
}

#[derive(Debug, Error)]
pub enum PttError {
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("PTT mechanism '{0}' is not implemented by this build")]
    Unsupported(&'static str),
}

/// No PTT line at all — for testing, or a channel that will never key a
/// real transmitter (e.g. a loopback/virtual channel).
pub struct NullPtt;

impl Ptt for NullPtt {
    fn ptt_on(&mut self) -> Result<(), PttError> {
        Ok(())
    }

    fn ptt_off(&mut self) -> Result<(), PttError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_ptt_always_succeeds() {
        let mut ptt = NullPtt;
        assert!(ptt.ptt_on().is_ok());
        assert!(ptt.ptt_off().is_ok());
    }
}
