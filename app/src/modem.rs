//! Minimal AFSK tone generation for the frame-to-audio direction. Spec §1
//! scopes "modulation tone synthesis waveform quality" out, mandating only
//! a correct tone-generation contract: for each transmitted data bit this
//! produces a continuous-phase mark/space tone at the channel's configured
//! rate. Band-limiting, raised-cosine shaping, and other audio-quality
//! concerns are left to an external, higher-fidelity modulator.

use ax25tnc_core::channel::Channel;

pub const SAMPLE_RATE_HZ: u32 = 48_000;

/// Continuous-phase AFSK modulator: each call to `next_sample` advances the
/// oscillator by the phase increment for whichever tone the current data
/// bit selects.
pub struct AfskModulator {
    mark_step: f32,
    space_step: f32,
    phase: f32,
    samples_per_bit: u32,
    sample_in_bit: u32,
    current_bit: bool,
}

impl AfskModulator {
    pub fn new(channel: &Channel) -> Self {
        let samples_per_bit = (SAMPLE_RATE_HZ / channel.bits_per_second).max(1);
        Self {
            mark_step: tone_step(channel.mark_hz),
            space_step: tone_step(channel.space_hz),
            phase: 0.0,
            samples_per_bit,
            sample_in_bit: 0,
            current_bit: true,
        }
    }

    /// Feed the next data bit to be transmitted, starting a new bit period.
    pub fn set_bit(&mut self, bit: bool) {
        self.current_bit = bit;
        self.sample_in_bit = 0;
    }

    /// True once the current bit period has been fully sampled and the
    /// caller should supply the next bit.
    pub fn bit_complete(&self) -> bool {
        self.sample_in_bit >= self.samples_per_bit
    }

    pub fn next_sample(&mut self) -> i16 {
        let step = if self.current_bit {
            self.mark_step
        } else {
            self.space_step
        };
        self.phase = (self.phase + step) % std::f32::consts::TAU;
        self.sample_in_bit += 1;
        (self.phase.sin() * i16::MAX as f32 * 0.8) as i16
    }
}

fn tone_step(tone_hz: u32) -> f32 {
    std::f32::consts::TAU * tone_hz as f32 / SAMPLE_RATE_HZ as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_for_the_configured_bit_duration() {
        let channel = Channel::new(0);
        let mut modulator = AfskModulator::new(&channel);
        modulator.set_bit(true);
        let expected_samples = SAMPLE_RATE_HZ / channel.bits_per_second;
        for _ in 0..expected_samples {
            assert!(!modulator.bit_complete());
            modulator.next_sample();
        }
        assert!(modulator.bit_complete());
    }

    #[test]
    fn samples_stay_within_amplitude_bounds() {
        let channel = Channel::new(0);
        let mut modulator = AfskModulator::new(&channel);
        modulator.set_bit(false);
        for _ in 0..1000 {
            let s = modulator.next_sample();
            assert!((-i16::MAX..=i16::MAX).contains(&s));
        }
    }
}
