//! The per-channel data model: radio identity, modem parameters, and the
//! CSMA timing knobs, following the typed model the tag-grammar config
//! layer builds (spec §3, §9 "Configuration recognition").

/// What a channel is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Medium {
    Radio,
    Virtual,
    None,
}

/// Whether FX.25 FEC is used on transmit for this channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FecPreference {
    #[default]
    None,
    Fx25,
}

/// Transmit timing, all in the native 10 ms tick unit used on the wire
/// (spec §6 "Transmit timing").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransmitTiming {
    pub txdelay: u8,
    pub txtail: u8,
    pub slottime: u8,
    pub persist: u8,
    pub dwait: u8,
    pub fulldup: bool,
}

impl Default for TransmitTiming {
    fn default() -> Self {
        Self {
            txdelay: 30,
            txtail: 10,
            slottime: 10,
            persist: 63,
            dwait: 0,
            fulldup: false,
        }
    }
}

/// A radio identity, numbered 0..N-1. Bound to a physical audio device
/// index via `device = channel >> 1` (two channels per stereo device).
#[derive(Debug, Clone)]
pub struct Channel {
    pub id: usize,
    pub medium: Medium,
    pub bits_per_second: u32,
    pub mark_hz: u32,
    pub space_hz: u32,
    pub num_sub_channels: u8,
    pub num_slicers_per_sub_channel: u8,
    pub timing: TransmitTiming,
    pub fec: FecPreference,
    /// Maximum number of frames bundled into a single PTT cycle; the
    /// digipeated-frame rule overrides this down to 1 for that case
    /// (spec §4.6 bundling policy).
    pub bundle_cap: usize,
    /// Error-injection rate (0..=100) used for test fixtures that need a
    /// channel to emit known-bad CRCs.
    pub xmit_error_rate: u8,
}

impl Channel {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            medium: Medium::Radio,
            bits_per_second: 1200,
            mark_hz: 1200,
            space_hz: 2200,
            num_sub_channels: 1,
            num_slicers_per_sub_channel: 1,
            timing: TransmitTiming::default(),
            fec: FecPreference::None,
            bundle_cap: 256,
            xmit_error_rate: 0,
        }
    }

    /// The physical audio device index backing this channel: two radio
    /// channels may share one stereo sound card.
    pub fn device_index(&self) -> usize {
        self.id >> 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_index_pairs_channels() {
        assert_eq!(Channel::new(0).device_index(), 0);
        assert_eq!(Channel::new(1).device_index(), 0);
        assert_eq!(Channel::new(2).device_index(), 1);
        assert_eq!(Channel::new(3).device_index(), 1);
    }

    #[test]
    fn default_timing_matches_documented_defaults() {
        let timing = TransmitTiming::default();
        assert_eq!(timing.txdelay, 30);
        assert_eq!(timing.txtail, 10);
        assert_eq!(timing.slottime, 10);
        assert_eq!(timing.persist, 63);
        assert_eq!(timing.dwait, 0);
        assert!(!timing.fulldup);
    }
}
