use std::sync::Arc;
use std::time::Duration;

use ax25tnc_app::audio::{NullInputSource, NullOutputSink};
use ax25tnc_app::demod::NullDemodulator;
use ax25tnc_app::ptt::NullPtt;
use ax25tnc_app::station::{ChannelSetup, Station};
use ax25tnc_core::channel::Channel;
use ax25tnc_core::dispatcher::DispatcherConfig;
use ax25tnc_core::event::Event;

fn main() {
    env_logger::init();

    let station = Station::new(vec![ChannelSetup {
        channel: Channel::new(0),
        dispatcher_config: DispatcherConfig::default(),
        input: Arc::new(NullInputSource),
        output: Arc::new(NullOutputSink),
        demod: Box::new(NullDemodulator),
        ptt: Box::new(NullPtt),
    }]);

    println!("Waiting for frames on channel 0...");
    loop {
        match station.events().dequeue() {
            Some(Event::Frame(frame)) => {
                println!(
                    "channel {} spectrum {} passed_all {} len {}",
                    frame.channel,
                    frame.spectrum,
                    frame.passed_all,
                    frame.packet.len()
                );
            }
            Some(Event::ChannelActivity { channel, busy }) => {
                println!("channel {channel} busy={busy}");
            }
            Some(Event::Diagnostic(message)) => println!("diagnostic: {message}"),
            None => {
                station.events().wait_nonempty(Duration::from_millis(200));
            }
        }
    }
}
