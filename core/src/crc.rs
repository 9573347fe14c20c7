//! AX.25 frame check sequence: CRC-16/X-25 (the same algorithm HDLC and
//! X.25 LAPB use), transmitted little-endian at the end of every frame.

pub const AX25_FCS_ALG: crc::Algorithm<u16> = crc::Algorithm {
    width: 16,
    poly: 0x1021,
    init: 0xFFFF,
    refin: true,
    refout: true,
    xorout: 0xFFFF,
    check: 0x906E,
    residue: 0xF0B8,
};

/// Compute the AX.25 FCS over `input`.
pub fn fcs(input: &[u8]) -> u16 {
    let crc = crc::Crc::<u16>::new(&AX25_FCS_ALG);
    let mut digest = crc.digest();
    digest.update(input);
    digest.finalize()
}

/// Append the FCS to `frame` in on-air byte order (low byte first).
pub fn append_fcs(frame: &mut Vec<u8>) {
    let value = fcs(frame);
    frame.push((value & 0xff) as u8);
    frame.push((value >> 8) as u8);
}

/// Verify a frame that ends with a 2-byte trailing FCS. The residue check
/// (running the FCS algorithm over frame+FCS together) avoids needing to
/// split the trailing bytes out first.
pub fn check_fcs(frame_with_fcs: &[u8]) -> bool {
    if frame_with_fcs.len() < 2 {
        return false;
    }
    fcs(frame_with_fcs) == AX25_FCS_ALG.residue
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fcs_test_vector() {
        assert_eq!(fcs(b"123456789"), 0x906E);
    }

    #[test]
    fn append_and_check_roundtrip() {
        let mut frame = b"\x00\x82\xa0\xa4\x40\x40\x40\xe0\xae\x92\x88\x8a\x62\x40\x63\x03\xf0hello".to_vec();
        append_fcs(&mut frame);
        assert!(check_fcs(&frame));
        *frame.last_mut().unwrap() ^= 0xff;
        assert!(!check_fcs(&frame));
    }
}
