//! The demodulator boundary (spec §6 "Demodulator interface (per bit)").
//! Tone detection and bit slicing are specified only by the interface they
//! expose — `on_bit(channel, sub, slicer, raw, scrambled)` — and are left as
//! an external collaborator; this crate defines the trait the receive
//! worker drives and ships one trivial implementation for channels with no
//! receiver attached.

/// One bit decision out of a demodulator for a given sub-channel/slicer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemodBit {
    pub sub_channel: usize,
    pub slicer: usize,
    pub raw: bool,
    /// True if this bit came from a scrambled/differential line code the
    /// demodulator descrambles internally before exposing `raw`.
    pub scrambled: bool,
}

/// Feeds in one audio sample at a time and yields whatever bit decisions,
/// across the configured sub-channels and slicers, that sample produced.
pub trait Demodulator: Send + 'static {
    fn process_sample(&mut self, sample: i16) -> Vec<DemodBit>;

    /// Data-carrier-detect state for one (sub_channel, slicer) pair, polled
    /// by the DCD matrix after each sample batch (spec §4.7).
    fn data_carrier_detect(&self, sub_channel: usize, slicer: usize) -> bool;
}

/// A demodulator for a channel with no receiver wired up: produces no
/// bits, and never asserts DCD.
#[derive(Default)]
pub struct NullDemodulator;

impl Demodulator for NullDemodulator {
    fn process_sample(&mut self, _sample: i16) -> Vec<DemodBit> {
        Vec::new()
    }

    fn data_carrier_detect(&self, _sub_channel: usize, _slicer: usize) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_demodulator_never_detects_carrier() {
        let mut demod = NullDemodulator;
        assert!(demod.process_sample(12000).is_empty());
        assert!(!demod.data_carrier_detect(0, 0));
    }
}
