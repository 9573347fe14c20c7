//! Frame Dispatcher: validates candidate frames, resolves the best among
//! concurrent slicer variants, and produces the `FrameEvent` that goes on
//! the event queue (spec §4.3).

use crate::crc;
use crate::event::{FecType, FrameEvent, RetryIndicator, RxLevel};
use crate::fx25::Fx25CandidateFrame;
use crate::hdlc::{self, CandidateFrame};

/// `fix_bits` budget and `passall` behavior, configured per the sanity
/// filter a deployment chooses (spec §4.3: "a configured `fix_bits`
/// budget against a sanity filter").
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Maximum number of bits the dispatcher will try flipping, one at a
    /// time, to salvage a CRC failure. The spec discourages anything
    /// beyond 1.
    pub fix_bits: u8,
    /// Deliver CRC-invalid frames anyway, marked as such, instead of
    /// discarding them (spec §12 "passall").
    pub passall: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            fix_bits: 0,
            passall: false,
        }
    }
}

struct Validated {
    packet: Vec<u8>,
    retries: RetryIndicator,
    passed_all: bool,
}

pub struct FrameDispatcher {
    config: DispatcherConfig,
}

impl FrameDispatcher {
    pub fn new(config: DispatcherConfig) -> Self {
        Self { config }
    }

    /// Validate a single HDLC candidate (one (channel, sub, slicer)
    /// observation). Returns the delivered `FrameEvent`, if any.
    pub fn validate_hdlc_candidate(&self, candidate: &CandidateFrame, rx_level: RxLevel) -> Option<FrameEvent> {
        let validated = self.validate_bytes_with_retry(candidate)?;
        Some(FrameEvent {
            channel: candidate.channel,
            sub_channel: candidate.sub_channel,
            slicer: candidate.slicer,
            rx_level,
            packet: validated.packet,
            fec_type: FecType::None,
            retries: validated.retries,
            spectrum: format!("sub{}/slicer{}", candidate.sub_channel, candidate.slicer),
            passed_all: validated.passed_all,
        })
    }

    fn validate_bytes_with_retry(&self, candidate: &CandidateFrame) -> Option<Validated> {
        if candidate.bytes.len() < 2 {
            return if self.config.passall {
                Some(Validated {
                    packet: candidate.bytes.clone(),
                    retries: RetryIndicator::None,
                    passed_all: true,
                })
            } else {
                None
            };
        }

        if crc::check_fcs(&candidate.bytes) {
            return Some(Validated {
                packet: strip_fcs(&candidate.bytes),
                retries: RetryIndicator::None,
                passed_all: false,
            });
        }

        if self.config.fix_bits >= 1 {
            for i in 0..candidate.raw_bits.len() {
                let mut flipped = candidate.raw_bits.clone();
                flipped.set(i, !flipped.get(i));
                let bytes = hdlc::assemble_frame(&flipped);
                if bytes.len() >= 2 && crc::check_fcs(&bytes) {
                    return Some(Validated {
                        packet: strip_fcs(&bytes),
                        retries: RetryIndicator::Fixed(1),
                        passed_all: false,
                    });
                }
            }
        }

        if self.config.passall {
            return Some(Validated {
                packet: strip_fcs(&candidate.bytes),
                retries: RetryIndicator::None,
                passed_all: true,
            });
        }

        None
    }

    /// Wrap an already RS-verified FX.25 payload as a `FrameEvent`. FX.25
    /// bypasses CRC entirely — the Reed-Solomon check already verified
    /// the payload (spec §4.2).
    pub fn deliver_fx25_candidate(&self, candidate: Fx25CandidateFrame, rx_level: RxLevel) -> FrameEvent {
        FrameEvent {
            channel: candidate.channel,
            sub_channel: candidate.sub_channel,
            slicer: candidate.slicer,
            rx_level,
            packet: candidate.payload,
            fec_type: FecType::Fx25,
            retries: RetryIndicator::None,
            spectrum: format!("fx25/sub{}/slicer{}", candidate.sub_channel, candidate.slicer),
            passed_all: false,
        }
    }

    /// Multi-slicer resolution: among several already-validated
    /// candidates for overlapping bit windows, prefer (1) the one
    /// matching the most siblings, then (2) lowest retries, then (3)
    /// lowest slicer index (spec §4.3).
    pub fn resolve_best(candidates: &[FrameEvent]) -> Option<usize> {
        if candidates.is_empty() {
            return None;
        }
        let agreement: Vec<usize> = candidates
            .iter()
            .map(|c| candidates.iter().filter(|o| o.packet == c.packet).count())
            .collect();

        let mut best = 0;
        for i in 1..candidates.len() {
            let current = rank(&candidates[best], agreement[best]);
            let challenger = rank(&candidates[i], agreement[i]);
            if challenger > current {
                best = i;
            }
        }
        Some(best)
    }
}

/// Higher is better: (sibling agreement, retry preference, slicer
/// preference), all oriented so a larger tuple wins.
fn rank(event: &FrameEvent, agreement: usize) -> (usize, i32, i32) {
    let retry_score = match event.retries {
        RetryIndicator::None => 1,
        RetryIndicator::Fixed(n) => -(n as i32),
    };
    (agreement, retry_score, -(event.slicer as i32))
}

fn strip_fcs(frame_with_fcs: &[u8]) -> Vec<u8> {
    frame_with_fcs[..frame_with_fcs.len() - 2].to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hdlc::Ax25Serializer;

    fn candidate_for(payload: &[u8], corrupt: bool, sub: usize, slicer: usize) -> CandidateFrame {
        let mut serializer = Ax25Serializer::new();
        let mut bits = Vec::new();
        serializer.serialize_frame(payload, corrupt, &mut bits);
        let mut deframer = hdlc::HdlcDeframer::new(0, sub, slicer);
        let mut candidate = None;
        for bit in bits {
            if let Some(c) = deframer.on_bit(bit) {
                candidate = Some(c);
            }
        }
        candidate.unwrap()
    }

    #[test]
    fn valid_frame_passes_straight_through() {
        let payload = b"0123456789ABCDEFGHIJ".to_vec();
        let candidate = candidate_for(&payload, false, 0, 0);
        let dispatcher = FrameDispatcher::new(DispatcherConfig::default());
        let event = dispatcher
            .validate_hdlc_candidate(&candidate, RxLevel::default())
            .expect("valid CRC should deliver");
        assert_eq!(event.packet, payload);
        assert_eq!(event.retries, RetryIndicator::None);
        assert!(!event.passed_all);
    }

    #[test]
    fn corrupt_crc_without_passall_is_dropped() {
        let payload = b"0123456789ABCDEFGHIJ".to_vec();
        let candidate = candidate_for(&payload, true, 0, 0);
        let dispatcher = FrameDispatcher::new(DispatcherConfig::default());
        assert!(dispatcher
            .validate_hdlc_candidate(&candidate, RxLevel::default())
            .is_none());
    }

    #[test]
    fn passall_delivers_invalid_frame_marked() {
        let payload = b"0123456789ABCDEFGHIJ".to_vec();
        let candidate = candidate_for(&payload, true, 0, 0);
        let dispatcher = FrameDispatcher::new(DispatcherConfig {
            fix_bits: 0,
            passall: true,
        });
        let event = dispatcher
            .validate_hdlc_candidate(&candidate, RxLevel::default())
            .expect("passall should still deliver");
        assert!(event.passed_all);
    }

    #[test]
    fn resolve_best_prefers_majority_then_slicer_index() {
        let majority = b"majority payload".to_vec();
        let minority = b"minority payload".to_vec();
        let make = |packet: &[u8], slicer: usize| FrameEvent {
            channel: 0,
            sub_channel: 0,
            slicer,
            rx_level: RxLevel::default(),
            packet: packet.to_vec(),
            fec_type: FecType::None,
            retries: RetryIndicator::None,
            spectrum: String::new(),
            passed_all: false,
        };
        let candidates = vec![
            make(&minority, 0),
            make(&majority, 1),
            make(&majority, 2),
        ];
        let best = FrameDispatcher::resolve_best(&candidates).unwrap();
        assert_eq!(candidates[best].packet, majority);
    }
}
