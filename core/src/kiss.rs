//! KISS framing between a TNC and its host application: FEND/FESC escaping
//! of a port+command header byte followed by an AX.25 packet payload (for
//! `DataFrame`) or a single parameter byte (for the timing commands).

use std::collections::VecDeque;

const FEND: u8 = 0xC0;
const FESC: u8 = 0xDB;
const TFEND: u8 = 0xDC;
const TFESC: u8 = 0xDD;

/// Maximum AX.25 information-plus-header length this TNC will forward
/// (spec's AX25_MAX_PACKET_LEN). The escaped-worst-case KISS frame can be
/// up to twice that plus the header byte and the two delimiting FENDs.
pub const AX25_MAX_PACKET_LEN: usize = 256;
pub const AX25_MIN_PACKET_LEN: usize = 15;
pub const MAX_FRAME_LEN: usize = AX25_MAX_PACKET_LEN * 2 + 4;

/// Holder for one complete KISS frame, delimited by FEND at each end.
///
/// `data`/`len` are exposed directly so a frame can be streamed straight
/// into a pre-allocated buffer as bytes arrive from a transport.
pub struct KissFrame {
    pub data: [u8; MAX_FRAME_LEN],
    pub len: usize,
}

impl KissFrame {
    /// A data frame carrying a raw AX.25 packet (no FCS — the TNC computes
    /// or strips that).
    pub fn new_data_frame(port: u8, payload: &[u8]) -> Result<Self, KissError> {
        if payload.len() > AX25_MAX_PACKET_LEN {
            return Err(KissError::PayloadTooBig);
        }
        let mut data = [0u8; MAX_FRAME_LEN];
        let mut i = 0;
        push(&mut data, &mut i, FEND);
        push(
            &mut data,
            &mut i,
            kiss_header(port, KissCommand::DataFrame.proto_value()),
        );
        i += escape(payload, &mut data[i..]);
        push(&mut data, &mut i, FEND);
        Ok(KissFrame { data, len: i })
    }

    fn new_param(port: u8, command: KissCommand, units: u8) -> Self {
        let mut data = [0u8; MAX_FRAME_LEN];
        let mut i = 0;
        push(&mut data, &mut i, FEND);
        push(&mut data, &mut i, kiss_header(port, command.proto_value()));
        push(&mut data, &mut i, units);
        push(&mut data, &mut i, FEND);
        KissFrame { data, len: i }
    }

    pub fn new_set_tx_delay(port: u8, units: u8) -> Self {
        Self::new_param(port, KissCommand::TxDelay, units)
    }

    pub fn new_set_p(port: u8, units: u8) -> Self {
        Self::new_param(port, KissCommand::P, units)
    }

    pub fn new_set_slot_time(port: u8, units: u8) -> Self {
        Self::new_param(port, KissCommand::SlotTime, units)
    }

    pub fn new_set_tx_tail(port: u8, units: u8) -> Self {
        Self::new_param(port, KissCommand::TxTail, units)
    }

    pub fn new_set_full_duplex(port: u8, full_duplex: bool) -> Self {
        Self::new_param(port, KissCommand::FullDuplex, if full_duplex { 1 } else { 0 })
    }

    /// Vendor-specific hardware command; `data` is carried through verbatim
    /// (escaped), for TNC-specific extensions the core does not interpret.
    pub fn new_set_hardware(port: u8, payload: &[u8]) -> Result<Self, KissError> {
        if payload.len() > AX25_MAX_PACKET_LEN {
            return Err(KissError::PayloadTooBig);
        }
        let mut data = [0u8; MAX_FRAME_LEN];
        let mut i = 0;
        push(&mut data, &mut i, FEND);
        push(
            &mut data,
            &mut i,
            kiss_header(port, KissCommand::SetHardware.proto_value()),
        );
        i += escape(payload, &mut data[i..]);
        push(&mut data, &mut i, FEND);
        Ok(KissFrame { data, len: i })
    }

    /// Exit KISS mode.
    pub fn new_return(port: u8) -> Self {
        let mut data = [0u8; MAX_FRAME_LEN];
        let mut i = 0;
        push(&mut data, &mut i, FEND);
        push(&mut data, &mut i, kiss_header(port, KissCommand::Return.proto_value()));
        push(&mut data, &mut i, FEND);
        KissFrame { data, len: i }
    }

    pub fn command(&self) -> Result<KissCommand, KissError> {
        Ok(KissCommand::from_proto(self.header_byte()? & 0x0f))
    }

    pub fn port(&self) -> Result<u8, KissError> {
        Ok(self.header_byte()? >> 4)
    }

    /// Payload between the header byte and the trailing FEND, unescaped.
    pub fn decode_payload(&self, out: &mut [u8]) -> Result<usize, KissError> {
        let start = self
            .data
            .iter()
            .enumerate()
            .skip_while(|(_, b)| **b == FEND)
            .skip(1)
            .next()
            .ok_or(KissError::MalformedKissFrame)?
            .0;
        let end = self.data[start..]
            .iter()
            .enumerate()
            .skip_while(|(_, b)| **b != FEND)
            .next()
            .ok_or(KissError::MalformedKissFrame)?
            .0
            + start;
        Ok(unescape(&self.data[start..end], out))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    fn header_byte(&self) -> Result<u8, KissError> {
        self.data
            .iter()
            .skip_while(|b| **b == FEND)
            .next()
            .cloned()
            .ok_or(KissError::MalformedKissFrame)
    }
}

fn kiss_header(port: u8, command: u8) -> u8 {
    (port << 4) | (command & 0x0f)
}

fn push(data: &mut [u8], idx: &mut usize, value: u8) {
    data[*idx] = value;
    *idx += 1;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KissCommand {
    DataFrame,
    TxDelay,
    P,
    SlotTime,
    TxTail,
    FullDuplex,
    SetHardware,
    Return,
    /// Any command byte this TNC doesn't interpret; carried through so a
    /// caller can log it rather than treating it as an error.
    Unknown(u8),
}

impl KissCommand {
    fn from_proto(value: u8) -> Self {
        match value {
            0 => KissCommand::DataFrame,
            1 => KissCommand::TxDelay,
            2 => KissCommand::P,
            3 => KissCommand::SlotTime,
            4 => KissCommand::TxTail,
            5 => KissCommand::FullDuplex,
            6 => KissCommand::SetHardware,
            0xf => KissCommand::Return,
            other => KissCommand::Unknown(other),
        }
    }

    fn proto_value(&self) -> u8 {
        match self {
            KissCommand::DataFrame => 0,
            KissCommand::TxDelay => 1,
            KissCommand::P => 2,
            KissCommand::SlotTime => 3,
            KissCommand::TxTail => 4,
            KissCommand::FullDuplex => 5,
            KissCommand::SetHardware => 6,
            KissCommand::Return => 0xf,
            KissCommand::Unknown(v) => *v,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KissError {
    MalformedKissFrame,
    PayloadTooBig,
}

fn escape(src: &[u8], dst: &mut [u8]) -> usize {
    let mut i = 0;
    let mut j = 0;
    while i < src.len() && j < dst.len() {
        if src[i] == FEND {
            dst[j] = FESC;
            j += 1;
            dst[j] = TFEND;
        } else if src[i] == FESC {
            dst[j] = FESC;
            j += 1;
            dst[j] = TFESC;
        } else {
            dst[j] = src[i];
        }
        i += 1;
        j += 1;
    }
    j
}

fn unescape(src: &[u8], dst: &mut [u8]) -> usize {
    let mut i = 0;
    let mut j = 0;
    while i < src.len() && j < dst.len() {
        if src[i] == FESC {
            if i == src.len() - 1 {
                break;
            }
            i += 1;
            if src[i] == TFEND {
                dst[j] = FEND;
            } else if src[i] == TFESC {
                dst[j] = FESC;
            }
        } else {
            dst[j] = src[i];
        }
        i += 1;
        j += 1;
    }
    j
}

/// Streaming reassembler for a byte-oriented KISS transport (TCP socket,
/// serial port). Feed it raw bytes as they arrive; pull out complete
/// frames as they become available. Handles repeated keepalive FENDs
/// between frames the way most KISS TNCs emit them.
pub struct KissBuffer {
    data: VecDeque<u8>,
}

impl Default for KissBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl KissBuffer {
    pub fn new() -> Self {
        Self {
            data: VecDeque::new(),
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.data.extend(bytes.iter().copied());
    }

    /// Pop the next complete frame, if one has fully arrived. Frames
    /// larger than `MAX_FRAME_LEN` are dropped (resynchronizing on the
    /// next FEND) rather than silently truncated.
    pub fn next_frame(&mut self) -> Option<KissFrame> {
        loop {
            while self.data.front() == Some(&FEND) {
                self.data.pop_front();
            }
            if self.data.is_empty() {
                return None;
            }
            let end = self.data.iter().position(|b| *b == FEND)?;
            if end + 2 > MAX_FRAME_LEN {
                for _ in 0..=end {
                    self.data.pop_front();
                }
                continue;
            }
            let mut data = [0u8; MAX_FRAME_LEN];
            let mut i = 0;
            push(&mut data, &mut i, FEND);
            for _ in 0..=end {
                push(&mut data, &mut i, self.data.pop_front().unwrap());
            }
            return Some(KissFrame { data, len: i });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        let mut buf = [0u8; 1024];

        let src = [0, 1, 2, 3, 4, 5];
        let n = escape(&src, &mut buf);
        assert_eq!(n, 6);
        assert_eq!(&buf[0..6], src);

        let src = [0, 1, FEND, 3, 4, 5];
        let n = escape(&src, &mut buf);
        assert_eq!(n, 7);
        assert_eq!(&buf[0..7], &[0, 1, FESC, TFEND, 3, 4, 5]);

        let src = [0, 1, 2, 3, 4, FESC];
        let n = escape(&src, &mut buf);
        assert_eq!(n, 7);
        assert_eq!(&buf[0..7], &[0, 1, 2, 3, 4, FESC, TFESC]);
    }

    #[test]
    fn test_unescape() {
        let mut buf = [0u8; 1024];

        let src = [0, 1, FESC, TFEND, 3, 4, 5];
        let n = unescape(&src, &mut buf);
        assert_eq!(n, 6);
        assert_eq!(&buf[0..6], &[0, 1, FEND, 3, 4, 5]);

        let src = [0, 1, 2, 3, 4, FESC, TFESC];
        let n = unescape(&src, &mut buf);
        assert_eq!(n, 6);
        assert_eq!(&buf[0..6], &[0, 1, 2, 3, 4, FESC]);
    }

    #[test]
    fn data_frame_roundtrip() {
        let f = KissFrame::new_data_frame(0, &[0xA0, 0xB1, 0xC2]).unwrap();
        assert_eq!(f.port().unwrap(), 0);
        assert_eq!(f.command().unwrap(), KissCommand::DataFrame);
        let mut buf = [0u8; 64];
        let n = f.decode_payload(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[0xA0, 0xB1, 0xC2]);
    }

    #[test]
    fn kiss_buffer_reassembles_stream() {
        let f = KissFrame::new_data_frame(1, &[1, 2, 3]).unwrap();
        let mut buffer = KissBuffer::new();
        // Feed one byte at a time, plus a leading keepalive FEND, to
        // exercise partial delivery.
        buffer.feed(&[FEND]);
        for b in f.as_bytes() {
            buffer.feed(std::slice::from_ref(b));
        }
        let received = buffer.next_frame().expect("frame should be complete");
        assert_eq!(received.port().unwrap(), 1);
        let mut out = [0u8; 64];
        let n = received.decode_payload(&mut out).unwrap();
        assert_eq!(&out[..n], &[1, 2, 3]);
        assert!(buffer.next_frame().is_none());
    }

    #[test]
    fn set_hardware_and_return_roundtrip() {
        let f = KissFrame::new_set_hardware(0, &[9, 9]).unwrap();
        assert_eq!(f.command().unwrap(), KissCommand::SetHardware);
        let r = KissFrame::new_return(2);
        assert_eq!(r.port().unwrap(), 2);
        assert_eq!(r.command().unwrap(), KissCommand::Return);
    }
}
