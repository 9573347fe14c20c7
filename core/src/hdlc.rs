//! HDLC-style bit framing for AX.25: per-bit NRZI decode, de-stuffing, and
//! flag synchronization on the receive side (`HdlcDeframer`); NRZI encode,
//! bit-stuffing, and CRC append on the transmit side (`Ax25Serializer`).

use crate::bits::RawBitRingBuffer;
use crate::crc;
use crate::kiss::{AX25_MAX_PACKET_LEN, AX25_MIN_PACKET_LEN};

pub const FLAG: u8 = 0x7E;
/// Frame buffer cap: max packet plus the 2-octet FCS.
pub const MAX_FRAME_LEN: usize = AX25_MAX_PACKET_LEN + 2;
/// Shortest frame the dispatcher will consider, in octets (payload + FCS).
pub const MIN_FRAME_LEN: usize = AX25_MIN_PACKET_LEN + 2;

/// A frame recognized between two flags, handed to the Frame Dispatcher.
/// `raw_bits` is the pre-destuffing, NRZI-decoded bit sequence, kept so the
/// dispatcher can retry CRC validation after flipping a single bit.
pub struct CandidateFrame {
    pub channel: usize,
    pub sub_channel: usize,
    pub slicer: usize,
    pub bytes: Vec<u8>,
    pub raw_bits: RawBitRingBuffer,
}

/// Per-(channel, sub-channel, slicer) receive state. One instance per
/// demodulator output; at most one thread ever calls `on_bit` on a given
/// instance (the owning receive worker).
pub struct HdlcDeframer {
    channel: usize,
    sub_channel: usize,
    slicer: usize,
    prev_raw_bit: bool,
    have_prev: bool,
    detector: u8,
    raw_bits: RawBitRingBuffer,
}

impl HdlcDeframer {
    pub fn new(channel: usize, sub_channel: usize, slicer: usize) -> Self {
        Self {
            channel,
            sub_channel,
            slicer,
            prev_raw_bit: false,
            have_prev: false,
            detector: 0,
            raw_bits: RawBitRingBuffer::new(),
        }
    }

    /// Feed one raw (pre-NRZI) demodulated bit. Returns a candidate frame
    /// if a flag closed one off that met the minimum length.
    pub fn on_bit(&mut self, raw_bit: bool) -> Option<CandidateFrame> {
        let d = if self.have_prev {
            raw_bit == self.prev_raw_bit
        } else {
            true
        };
        self.prev_raw_bit = raw_bit;
        self.have_prev = true;

        self.detector = (self.detector >> 1) | ((d as u8) << 7);
        self.raw_bits.append(d);

        if self.detector == FLAG {
            self.raw_bits.chop_last(8);
            let candidate = if self.raw_bits.len() >= MIN_FRAME_LEN * 8 {
                let bytes = assemble_frame(&self.raw_bits);
                Some(CandidateFrame {
                    channel: self.channel,
                    sub_channel: self.sub_channel,
                    slicer: self.slicer,
                    bytes,
                    raw_bits: self.raw_bits.clone(),
                })
            } else {
                None
            };
            self.raw_bits = RawBitRingBuffer::new();
            // Seed the new buffer with the flag's final bit, the first data
            // bit of whatever follows.
            self.raw_bits.append(d);
            return candidate;
        }

        if self.detector & 0xFE == 0xFE {
            // Loss of signal / abort: seven or eight consecutive ones.
            self.raw_bits.clear();
            return None;
        }

        None
    }
}

/// Re-derive octets from a raw (pre-destuffing) bit sequence: recognizes
/// and drops stuffed zeros the same way the live per-bit detector does,
/// then packs the remaining bits LSB-first into bytes. Used both for a
/// freshly closed candidate and for the dispatcher's single-bit-flip
/// retries against a cloned `RawBitRingBuffer`.
pub fn assemble_frame(raw_bits: &RawBitRingBuffer) -> Vec<u8> {
    let mut detector: u8 = 0;
    let mut oacc: u8 = 0;
    let mut olen: u8 = 0;
    let mut frame_buf = Vec::new();
    for d in raw_bits.iter() {
        detector = (detector >> 1) | ((d as u8) << 7);
        if detector & 0xFC == 0x7C {
            // Five ones then a zero just shifted in: that zero was stuffed.
            continue;
        }
        oacc |= (d as u8) << olen;
        olen += 1;
        if olen == 8 {
            if frame_buf.len() < MAX_FRAME_LEN {
                frame_buf.push(oacc);
            }
            oacc = 0;
            olen = 0;
        }
    }
    frame_buf
}

/// NRZI encode + bit-stuff + CRC append for the transmit path. Line state
/// persists across calls, matching the per-channel NRZI continuity the
/// spec requires between frames in the same transmission.
pub struct Ax25Serializer {
    line_state: bool,
    ones_run: u8,
}

impl Default for Ax25Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Ax25Serializer {
    pub fn new() -> Self {
        Self {
            line_state: false,
            ones_run: 0,
        }
    }

    fn nrzi_encode(&mut self, data_bit: bool) -> bool {
        if !data_bit {
            self.line_state = !self.line_state;
        }
        self.line_state
    }

    fn emit_bit_stuffed(&mut self, data_bit: bool, out: &mut Vec<bool>) {
        out.push(self.nrzi_encode(data_bit));
        if data_bit {
            self.ones_run += 1;
            if self.ones_run == 5 {
                out.push(self.nrzi_encode(false));
                self.ones_run = 0;
            }
        } else {
            self.ones_run = 0;
        }
    }

    /// Emit `count` flag octets back to back, NRZI-encoded without
    /// stuffing — used for both the framing flag and preamble/postamble
    /// runs (the scheduler calls this directly for txdelay/txtail).
    pub fn emit_flags(&mut self, count: usize, out: &mut Vec<bool>) {
        for _ in 0..count {
            for bit_pos in 0..8 {
                let data_bit = (FLAG >> bit_pos) & 1 == 1;
                out.push(self.nrzi_encode(data_bit));
            }
            self.ones_run = 0;
        }
    }

    /// Serialize one complete frame: start flag, bit-stuffed payload, CRC,
    /// end flag. Returns the number of bits appended to `out`, including
    /// flags and any stuffed bits.
    pub fn serialize_frame(&mut self, payload: &[u8], corrupt_crc: bool, out: &mut Vec<bool>) -> usize {
        let start = out.len();
        self.emit_flags(1, out);

        for &byte in payload {
            for bit_pos in 0..8 {
                self.emit_bit_stuffed((byte >> bit_pos) & 1 == 1, out);
            }
        }

        let mut crc_value = crc::fcs(payload);
        if corrupt_crc {
            crc_value = !crc_value;
        }
        for byte in [(crc_value & 0xff) as u8, (crc_value >> 8) as u8] {
            for bit_pos in 0..8 {
                self.emit_bit_stuffed((byte >> bit_pos) & 1 == 1, out);
            }
        }

        self.emit_flags(1, out);
        out.len() - start
    }
}
