//! Tag-grammar configuration parser (spec §9 "Configuration recognition"):
//! one setting per line, `TAG arg...`, `#` starts a comment. Builds the
//! typed `Channel`/station model; a malformed line is a non-fatal warning
//! (spec §7), an unreadable config file is the caller's problem to treat
//! as a boot error.

use std::collections::HashMap;

use ax25tnc_core::channel::{Channel, FecPreference};
use ax25tnc_core::dispatcher::DispatcherConfig;

/// How a PTT (or DCD/CON indicator) line names its output, before it is
/// wired up to a concrete [`crate::ptt::Ptt`] implementation. Only the
/// serial case can be turned into a working implementation by this crate;
/// everything else is recorded so the caller can log what it can't honor
/// (spec §6 lists GPIO, parallel port, hamlib, and CM108 HID alongside
/// serial — this crate implements only serial, per `app::ptt`'s doc
/// comment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PttSpec {
    Serial { port: String, rts: bool, inverted: bool },
    Other { mechanism: String, detail: String },
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub channel: Channel,
    pub dispatcher: DispatcherConfig,
    pub ptt: Option<PttSpec>,
    pub dcd: Option<PttSpec>,
    pub txinh: Option<String>,
    pub kiss_copy: bool,
}

impl ChannelConfig {
    fn new(id: usize) -> Self {
        Self {
            channel: Channel::new(id),
            dispatcher: DispatcherConfig::default(),
            ptt: None,
            dcd: None,
            txinh: None,
            kiss_copy: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StationConfig {
    pub channels: Vec<ChannelConfig>,
    pub device_names: HashMap<usize, String>,
    pub device_sample_rates: HashMap<usize, u32>,
    pub device_channel_counts: HashMap<usize, u8>,
    pub kiss_tcp_ports: Vec<u16>,
    pub kiss_serial: Vec<(String, u32)>,
}

impl StationConfig {
    fn channel_mut(&mut self, id: usize) -> &mut ChannelConfig {
        while self.channels.len() <= id {
            let next_id = self.channels.len();
            self.channels.push(ChannelConfig::new(next_id));
        }
        &mut self.channels[id]
    }
}

/// Parse a whole configuration file's text into a [`StationConfig`].
/// Malformed or unrecognized lines are logged and skipped rather than
/// aborting the parse.
pub fn parse(text: &str) -> StationConfig {
    let mut config = StationConfig::default();
    let mut current_channel: usize = 0;
    config.channel_mut(0);

    for (lineno, raw_line) in text.lines().enumerate() {
        let line = raw_line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = line.split_whitespace();
        let Some(tag) = parts.next() else { continue };
        let args: Vec<&str> = parts.collect();

        if let Err(e) = apply_line(&mut config, &mut current_channel, &tag.to_ascii_uppercase(), &args) {
            log::warn!("config line {}: {e}", lineno + 1);
        }
    }

    config
}

fn apply_line(config: &mut StationConfig, current_channel: &mut usize, tag: &str, args: &[&str]) -> Result<(), String> {
    match tag {
        "CHANNEL" => {
            *current_channel = parse_arg(args, 0)?;
            config.channel_mut(*current_channel);
        }
        "ADEVICE" => {
            let name = args.first().ok_or("ADEVICE requires a device name")?;
            config.device_names.insert(*current_channel >> 1, name.to_string());
        }
        "ARATE" => {
            let rate: u32 = parse_arg(args, 0)?;
            if !(8000..=192_000).contains(&rate) {
                return Err(format!("ARATE {rate} out of range 8000..=192000"));
            }
            config.device_sample_rates.insert(*current_channel >> 1, rate);
        }
        "ACHANNELS" => {
            let n: u8 = parse_arg(args, 0)?;
            if n != 1 && n != 2 {
                return Err(format!("ACHANNELS {n} must be 1 or 2"));
            }
            config.device_channel_counts.insert(*current_channel >> 1, n);
        }
        "MODEM" => {
            let channel = &mut config.channel_mut(*current_channel).channel;
            channel.bits_per_second = parse_arg(args, 0)?;
            if let (Ok(mark), Ok(space)) = (parse_arg::<u32>(args, 1), parse_arg::<u32>(args, 2)) {
                channel.mark_hz = mark;
                channel.space_hz = space;
            }
        }
        "FIX_BITS" => {
            config.channel_mut(*current_channel).dispatcher.fix_bits = parse_arg(args, 0)?;
        }
        "PASSALL" => {
            config.channel_mut(*current_channel).dispatcher.passall = parse_bool(args, 0)?;
        }
        "PTT" => {
            config.channel_mut(*current_channel).ptt = Some(parse_ptt_spec(args)?);
        }
        "DCD" => {
            config.channel_mut(*current_channel).dcd = Some(parse_ptt_spec(args)?);
        }
        "CON" => {
            // Connection/busy indicator output: same line shape as PTT/DCD,
            // recorded but not otherwise distinguished by this crate.
            config.channel_mut(*current_channel).dcd = Some(parse_ptt_spec(args)?);
        }
        "TXINH" => {
            config.channel_mut(*current_channel).txinh = Some(args.join(" "));
        }
        "DWAIT" => {
            config.channel_mut(*current_channel).channel.timing.dwait = parse_arg(args, 0)?;
        }
        "SLOTTIME" => {
            config.channel_mut(*current_channel).channel.timing.slottime = parse_arg(args, 0)?;
        }
        "PERSIST" => {
            config.channel_mut(*current_channel).channel.timing.persist = parse_arg(args, 0)?;
        }
        "TXDELAY" => {
            config.channel_mut(*current_channel).channel.timing.txdelay = parse_arg(args, 0)?;
        }
        "TXTAIL" => {
            config.channel_mut(*current_channel).channel.timing.txtail = parse_arg(args, 0)?;
        }
        "FULLDUP" => {
            config.channel_mut(*current_channel).channel.timing.fulldup = parse_bool(args, 0)?;
        }
        "FX25TX" => {
            config.channel_mut(*current_channel).channel.fec = if parse_bool(args, 0)? {
                FecPreference::Fx25
            } else {
                FecPreference::None
            };
        }
        "KISSPORT" => {
            config.kiss_tcp_ports.push(parse_arg(args, 0)?);
        }
        "SERIALKISS" => {
            let device = args.first().ok_or("SERIALKISS requires a device path")?;
            let baud = parse_arg(args, 1).unwrap_or(9600);
            config.kiss_serial.push((device.to_string(), baud));
        }
        "SERIALKISSPOLL" => {
            // Recognized per spec §9; the polling cadence for a serial
            // transport with no interrupt-driven read is a transport-level
            // detail this crate doesn't need to act on since
            // `SerialKissTransport` uses a blocking read timeout instead.
        }
        "KISSCOPY" => {
            config.channel_mut(*current_channel).kiss_copy = parse_bool(args, 0)?;
        }
        other => return Err(format!("unrecognized tag '{other}'")),
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(args: &[&str], index: usize) -> Result<T, String> {
    args.get(index)
        .ok_or_else(|| format!("missing argument {index}"))?
        .parse()
        .map_err(|_| format!("could not parse argument {index}"))
}

/// A bare flag tag with no argument defaults to true (`KISSCOPY` with
/// nothing after it means "on").
fn parse_bool(args: &[&str], index: usize) -> Result<bool, String> {
    match args.get(index) {
        None => Ok(true),
        Some(s) => Ok(matches!(s.to_ascii_uppercase().as_str(), "ON" | "1" | "TRUE" | "YES")),
    }
}

fn parse_ptt_spec(args: &[&str]) -> Result<PttSpec, String> {
    let mechanism = *args.first().ok_or("PTT/DCD/CON requires a mechanism")?;
    match mechanism.to_ascii_uppercase().as_str() {
        "RTS" | "DTR" => {
            let port = args.get(1).ok_or("serial PTT requires a port name")?.to_string();
            let inverted = args.get(2).map(|a| a.eq_ignore_ascii_case("-")).unwrap_or(false);
            Ok(PttSpec::Serial {
                port,
                rts: mechanism.eq_ignore_ascii_case("RTS"),
                inverted,
            })
        }
        other => Ok(PttSpec::Other {
            mechanism: other.to_string(),
            detail: args.get(1..).unwrap_or(&[]).join(" "),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_tag_switches_which_channel_subsequent_lines_affect() {
        let config = parse("CHANNEL 0\nTXDELAY 30\nCHANNEL 1\nTXDELAY 50\n");
        assert_eq!(config.channels[0].channel.timing.txdelay, 30);
        assert_eq!(config.channels[1].channel.timing.txdelay, 50);
    }

    #[test]
    fn modem_sets_baud_and_optionally_tones() {
        let config = parse("MODEM 1200\nCHANNEL 1\nMODEM 300 1600 1800\n");
        assert_eq!(config.channels[0].channel.bits_per_second, 1200);
        assert_eq!(config.channels[1].channel.bits_per_second, 300);
        assert_eq!(config.channels[1].channel.mark_hz, 1600);
        assert_eq!(config.channels[1].channel.space_hz, 1800);
    }

    #[test]
    fn ptt_rts_line_parses_into_serial_spec() {
        let config = parse("PTT RTS COM3\n");
        assert_eq!(
            config.channels[0].ptt,
            Some(PttSpec::Serial {
                port: "COM3".into(),
                rts: true,
                inverted: false,
            })
        );
    }

    #[test]
    fn unrecognized_tag_is_skipped_not_fatal() {
        let config = parse("BOGUSTAG something\nTXDELAY 40\n");
        assert_eq!(config.channels[0].channel.timing.txdelay, 40);
    }

    #[test]
    fn kisscopy_defaults_to_enabled_when_bare() {
        let config = parse("KISSCOPY\n");
        assert!(config.channels[0].kiss_copy);
    }

    #[test]
    fn kissport_and_serialkiss_accumulate() {
        let config = parse("KISSPORT 8001\nSERIALKISS /dev/ttyUSB0 19200\nKISSPORT 8002\n");
        assert_eq!(config.kiss_tcp_ports, vec![8001, 8002]);
        assert_eq!(config.kiss_serial, vec![("/dev/ttyUSB0".to_string(), 19200)]);
    }

    #[test]
    fn fix_bits_and_fx25tx_apply_to_current_channel() {
        let config = parse("FIX_BITS 1\nFX25TX ON\n");
        assert_eq!(config.channels[0].dispatcher.fix_bits, 1);
        assert_eq!(config.channels[0].channel.fec, FecPreference::Fx25);
    }
}
