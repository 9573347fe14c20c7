//! The DCD (data-carrier-detect) matrix coupling receivers to the
//! transmitter's channel-access decision (spec §4.7, testable property 6).
//! One row per channel; each row is a bitmask over (sub_channel, slicer)
//! pairs plus a reserved slot for a DTMF sub-channel detector, aggregated
//! with the channel's transmit-inhibit input.

use std::sync::atomic::{AtomicU32, Ordering};

/// Bits per row: one per (sub_channel, slicer) pair up to this many
/// sub-channels, plus the reserved DTMF slot named in spec §9 ("the DCD
/// transition also considers a DTMF sub-channel at the slot MAX_SUBCHANS").
pub const MAX_SUBCHANS: usize = 8;
pub const SLICERS_PER_SUBCHAN: usize = 4;
const DTMF_BIT: u32 = 1 << 31;

fn bit_index(sub_channel: usize, slicer: usize) -> u32 {
    debug_assert!(sub_channel <= MAX_SUBCHANS);
    debug_assert!(slicer < SLICERS_PER_SUBCHAN);
    1 << (sub_channel * SLICERS_PER_SUBCHAN + slicer)
}

/// One channel's DCD row plus its transmit-inhibit line.
pub struct DcdRow {
    bits: AtomicU32,
    tx_inhibit: AtomicU32,
}

impl Default for DcdRow {
    fn default() -> Self {
        Self {
            bits: AtomicU32::new(0),
            tx_inhibit: AtomicU32::new(0),
        }
    }
}

impl DcdRow {
    /// Set or clear one (sub_channel, slicer) bit. Called from the receive
    /// worker thread; the read side tolerates transient staleness because
    /// CSMA re-polls (spec §5 "Shared resources").
    pub fn set(&self, sub_channel: usize, slicer: usize, asserted: bool) {
        let bit = bit_index(sub_channel, slicer);
        if asserted {
            self.bits.fetch_or(bit, Ordering::Relaxed);
        } else {
            self.bits.fetch_and(!bit, Ordering::Relaxed);
        }
    }

    /// DTMF sub-channel detector state (spec §9 open question — the
    /// detector contract itself is an external collaborator; only the bit
    /// slot is defined here).
    pub fn set_dtmf(&self, asserted: bool) {
        if asserted {
            self.bits.fetch_or(DTMF_BIT, Ordering::Relaxed);
        } else {
            self.bits.fetch_and(!DTMF_BIT, Ordering::Relaxed);
        }
    }

    pub fn set_tx_inhibit(&self, asserted: bool) {
        self.tx_inhibit.store(asserted as u32, Ordering::Relaxed);
    }

    /// True iff any (sub, slicer) bit is set, or transmit-inhibit is
    /// asserted (testable property 6).
    pub fn is_busy(&self) -> bool {
        self.bits.load(Ordering::Relaxed) != 0 || self.tx_inhibit.load(Ordering::Relaxed) != 0
    }
}

/// One `DcdRow` per channel.
#[derive(Default)]
pub struct DcdMatrix {
    rows: Vec<DcdRow>,
}

impl DcdMatrix {
    pub fn new(num_channels: usize) -> Self {
        let mut rows = Vec::with_capacity(num_channels);
        rows.resize_with(num_channels, DcdRow::default);
        Self { rows }
    }

    pub fn row(&self, channel: usize) -> &DcdRow {
        &self.rows[channel]
    }

    pub fn is_busy(&self, channel: usize) -> bool {
        self.rows[channel].is_busy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_iff_any_bit_or_tx_inhibit() {
        let matrix = DcdMatrix::new(1);
        assert!(!matrix.is_busy(0));

        matrix.row(0).set(2, 1, true);
        assert!(matrix.is_busy(0));
        matrix.row(0).set(2, 1, false);
        assert!(!matrix.is_busy(0));

        matrix.row(0).set_tx_inhibit(true);
        assert!(matrix.is_busy(0));
        matrix.row(0).set_tx_inhibit(false);
        assert!(!matrix.is_busy(0));
    }

    #[test]
    fn dtmf_slot_counts_toward_busy() {
        let matrix = DcdMatrix::new(1);
        matrix.row(0).set_dtmf(true);
        assert!(matrix.is_busy(0));
    }
}
