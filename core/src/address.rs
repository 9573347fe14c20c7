//! AX.25 address field encoding: callsign-SSID pairs shifted into the
//! 7-byte-per-station wire format used by the destination/source/digipeater
//! address list at the front of every AX.25 frame.

/// ASCII callsign, up to 6 characters. Shorter callsigns are padded with
/// spaces on the right, matching on-air AX.25 practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Callsign(pub [u8; 6]);

impl Callsign {
    /// Build a callsign from a string, uppercasing and space-padding it.
    ///
    /// Fails if the string is longer than 6 characters or contains bytes
    /// outside `A-Z0-9` and space.
    pub fn new(call: &str) -> Result<Self, AddressError> {
        if call.len() > 6 {
            return Err(AddressError::CallsignTooLong(call.len()));
        }
        let mut out = [b' '; 6];
        for (i, c) in call.bytes().enumerate() {
            let c = c.to_ascii_uppercase();
            if !c.is_ascii_alphanumeric() && c != b' ' {
                return Err(AddressError::InvalidCharacter(c as char));
            }
            out[i] = c;
        }
        Ok(Callsign(out))
    }

    pub fn as_str(&self) -> &str {
        let end = self.0.iter().rposition(|b| *b != b' ').map_or(0, |p| p + 1);
        core::str::from_utf8(&self.0[..end]).unwrap_or("")
    }
}

/// A single AX.25 station address: callsign plus SSID (0..=15).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ax25Address {
    pub callsign: Callsign,
    pub ssid: u8,
}

impl Ax25Address {
    pub fn new(call: &str, ssid: u8) -> Result<Self, AddressError> {
        if ssid > 15 {
            return Err(AddressError::SsidOutOfRange(ssid));
        }
        Ok(Self {
            callsign: Callsign::new(call)?,
            ssid,
        })
    }
}

/// One 7-byte address field as it appears on the wire, with its control
/// bits decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressField {
    pub address: Ax25Address,
    /// Command/response bit on dest/src; "has-been-repeated" bit on a
    /// digipeater field.
    pub c_or_h_bit: bool,
    /// True if this is the last address field (no further repeaters follow).
    pub extension_bit: bool,
}

impl AddressField {
    /// Encode one 7-byte address field.
    pub fn encode(&self) -> [u8; 7] {
        let mut out = [0u8; 7];
        for (i, c) in self.address.callsign.0.iter().enumerate() {
            out[i] = c << 1;
        }
        let mut ssid_byte = 0x60 | (self.address.ssid << 1);
        if self.c_or_h_bit {
            ssid_byte |= 0x80;
        }
        if self.extension_bit {
            ssid_byte |= 0x01;
        }
        out[6] = ssid_byte;
        out
    }

    /// Decode one 7-byte address field.
    pub fn decode(raw: &[u8; 7]) -> Self {
        let mut callsign = [0u8; 6];
        for i in 0..6 {
            callsign[i] = raw[i] >> 1;
        }
        let ssid_byte = raw[6];
        Self {
            address: Ax25Address {
                callsign: Callsign(callsign),
                ssid: (ssid_byte >> 1) & 0x0f,
            },
            c_or_h_bit: ssid_byte & 0x80 != 0,
            extension_bit: ssid_byte & 0x01 != 0,
        }
    }
}

/// The decoded address list of an AX.25 frame: destination, source, and
/// zero or more digipeaters in transmission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressList {
    pub destination: AddressField,
    pub source: AddressField,
    pub digipeaters: [Option<AddressField>; 8],
    pub digipeater_count: usize,
}

impl AddressList {
    /// Encode dest + source + repeaters into the leading bytes of a frame.
    /// `command` sets the C bit on destination/source per AX.25 command
    /// framing (true = command, with source's bit inverted per convention).
    pub fn encode(
        destination: &Ax25Address,
        source: &Ax25Address,
        digipeaters: &[Ax25Address],
        command: bool,
    ) -> Vec<u8> {
        let mut out = Vec::with_capacity(7 * (2 + digipeaters.len()));
        let last = digipeaters.is_empty();
        out.extend_from_slice(
            &AddressField {
                address: *destination,
                c_or_h_bit: command,
                extension_bit: last,
            }
            .encode(),
        );
        out.extend_from_slice(
            &AddressField {
                address: *source,
                c_or_h_bit: !command,
                extension_bit: last,
            }
            .encode(),
        );
        for (i, rpt) in digipeaters.iter().enumerate() {
            let is_last = i == digipeaters.len() - 1;
            out.extend_from_slice(
                &AddressField {
                    address: *rpt,
                    c_or_h_bit: false,
                    extension_bit: is_last,
                }
                .encode(),
            );
        }
        out
    }

    /// Parse the leading address fields of a frame. Returns the parsed list
    /// and the number of bytes consumed, or `None` if the frame is too short
    /// or the extension-bit chain never terminates within 10 fields
    /// (2 mandatory + 8 digipeaters, AX.25's maximum).
    pub fn decode(frame: &[u8]) -> Option<(Self, usize)> {
        if frame.len() < 14 {
            return None;
        }
        let destination = AddressField::decode(frame[0..7].try_into().ok()?);
        let source = AddressField::decode(frame[7..14].try_into().ok()?);
        let mut digipeaters = [None; 8];
        let mut digipeater_count = 0;
        let mut offset = 14;
        let mut last_seen = source.extension_bit;
        while !last_seen {
            if digipeater_count >= 8 || frame.len() < offset + 7 {
                return None;
            }
            let field = AddressField::decode(frame[offset..offset + 7].try_into().ok()?);
            last_seen = field.extension_bit;
            digipeaters[digipeater_count] = Some(field);
            digipeater_count += 1;
            offset += 7;
        }
        Some((
            Self {
                destination,
                source,
                digipeaters,
                digipeater_count,
            },
            offset,
        ))
    }

    /// True if the first digipeater in the list has its has-been-repeated
    /// bit set — the APRS-digipeated test used by the transmit scheduler's
    /// bundling policy (spec §4.6, testable property 7).
    pub fn is_aprs_digipeated(&self) -> bool {
        self.digipeaters
            .first()
            .and_then(|d| d.as_ref())
            .map(|d| d.c_or_h_bit)
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressError {
    CallsignTooLong(usize),
    InvalidCharacter(char),
    SsidOutOfRange(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callsign_pads_and_uppercases() {
        let c = Callsign::new("wb2osz").unwrap();
        assert_eq!(c.as_str(), "WB2OSZ");
    }

    #[test]
    fn address_field_roundtrip() {
        let field = AddressField {
            address: Ax25Address::new("TEST", 15).unwrap(),
            c_or_h_bit: true,
            extension_bit: true,
        };
        let encoded = field.encode();
        let decoded = AddressField::decode(&encoded);
        assert_eq!(decoded, field);
    }

    #[test]
    fn digipeated_bit_detection() {
        let dest = Ax25Address::new("APRS", 0).unwrap();
        let src = Ax25Address::new("WB2OSZ", 15).unwrap();
        let rpt = Ax25Address::new("WIDE1", 1).unwrap();
        let mut bytes = AddressList::encode(&dest, &src, &[rpt], true);
        // Mark the single digipeater as having relayed this frame.
        bytes[20] |= 0x80;
        let (list, len) = AddressList::decode(&bytes).unwrap();
        assert_eq!(len, 21);
        assert!(list.is_aprs_digipeated());
    }

    #[test]
    fn not_digipeated_when_no_repeaters() {
        let dest = Ax25Address::new("APRS", 0).unwrap();
        let src = Ax25Address::new("WB2OSZ", 15).unwrap();
        let bytes = AddressList::encode(&dest, &src, &[], true);
        let (list, _) = AddressList::decode(&bytes).unwrap();
        assert!(!list.is_aprs_digipeated());
    }
}
