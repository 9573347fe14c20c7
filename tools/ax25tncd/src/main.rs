use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Arc;
use std::thread;

use clap::Parser;

use ax25tnc_app::audio::{NullInputSource, NullOutputSink};
use ax25tnc_app::config::{self, PttSpec};
use ax25tnc_app::demod::NullDemodulator;
use ax25tnc_app::kiss_session::run_kiss_session;
use ax25tnc_app::ptt::{NullPtt, Ptt};
use ax25tnc_app::serial::{PttPin, SerialKissTransport, SerialPtt};
use ax25tnc_app::soundcard::Soundcard;
use ax25tnc_app::station::{ChannelSetup, Station};

#[derive(Parser)]
struct Args {
    #[arg(help = "Path to the tag-grammar configuration file")]
    config: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let text = match std::fs::read_to_string(&args.config) {
        Ok(t) => t,
        Err(e) => {
            log::error!("could not read config file '{}': {e}", args.config);
            std::process::exit(1);
        }
    };
    let config = config::parse(&text);

    let mut soundcards: HashMap<usize, Soundcard> = HashMap::new();
    for channel in &config.channels {
        let device = channel.channel.device_index();
        if soundcards.contains_key(&device) {
            continue;
        }
        if let Some(name) = config.device_names.get(&device) {
            match Soundcard::new(name.clone()) {
                Ok(card) => {
                    soundcards.insert(device, card);
                }
                Err(e) => log::warn!("soundcard '{name}' unavailable for device {device}: {e}"),
            }
        }
    }

    let mut setups = Vec::new();
    for channel in &config.channels {
        let device = channel.channel.device_index();
        let input: Arc<dyn ax25tnc_app::audio::InputSource> = match soundcards.get(&device) {
            Some(card) => Arc::new(card.input()),
            None => Arc::new(NullInputSource),
        };
        let output: Arc<dyn ax25tnc_app::audio::OutputSink> = match soundcards.get(&device) {
            Some(card) => Arc::new(card.output()),
            None => Arc::new(NullOutputSink),
        };

        let ptt: Box<dyn Ptt> = match &channel.ptt {
            Some(PttSpec::Serial { port, rts, inverted }) => {
                let pin = if *rts { PttPin::Rts } else { PttPin::Dtr };
                match SerialPtt::new(port, pin, *inverted) {
                    Ok(p) => Box::new(p),
                    Err(e) => {
                        log::warn!("PTT port '{port}' unavailable for channel {}: {e}", channel.channel.id);
                        Box::new(NullPtt)
                    }
                }
            }
            Some(PttSpec::Other { mechanism, .. }) => {
                log::warn!(
                    "channel {} requests unsupported PTT mechanism '{mechanism}'",
                    channel.channel.id
                );
                Box::new(NullPtt)
            }
            None => Box::new(NullPtt),
        };

        setups.push(ChannelSetup {
            channel: channel.channel.clone(),
            dispatcher_config: channel.dispatcher.clone(),
            input,
            output,
            demod: Box::new(NullDemodulator),
            ptt,
        });
    }

    if setups.is_empty() {
        log::warn!("no CHANNEL entries in config; starting with channel 0 defaults");
        setups.push(ChannelSetup {
            channel: ax25tnc_core::channel::Channel::new(0),
            dispatcher_config: ax25tnc_core::dispatcher::DispatcherConfig::default(),
            input: Arc::new(NullInputSource),
            output: Arc::new(NullOutputSink),
            demod: Box::new(NullDemodulator),
            ptt: Box::new(NullPtt),
        });
    }

    let station = Arc::new(Station::new(setups));

    for (device, baud) in config.kiss_serial.clone() {
        let station = station.clone();
        thread::spawn(move || match SerialKissTransport::new(&device, baud) {
            Ok(transport) => {
                if let Err(e) = run_kiss_session(transport, station) {
                    log::warn!("serial KISS session on '{device}' ended: {e:?}");
                }
            }
            Err(e) => log::error!("could not open serial KISS device '{device}': {e:?}"),
        });
    }

    let ports = if config.kiss_tcp_ports.is_empty() {
        vec![8001]
    } else {
        config.kiss_tcp_ports.clone()
    };

    let mut listener_threads = Vec::new();
    for port in ports {
        let station = station.clone();
        listener_threads.push(thread::spawn(move || {
            let listener = match TcpListener::bind(("0.0.0.0", port)) {
                Ok(l) => l,
                Err(e) => {
                    log::error!("could not bind KISS TCP port {port}: {e}");
                    return;
                }
            };
            log::info!("listening for KISS clients on port {port}");
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let station = station.clone();
                thread::spawn(move || {
                    if let Err(e) = run_kiss_session(stream, station) {
                        log::info!("KISS client on port {port} disconnected: {e:?}");
                    }
                });
            }
        }));
    }

    for handle in listener_threads {
        let _ = handle.join();
    }
}
