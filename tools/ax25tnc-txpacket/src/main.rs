use std::sync::Arc;
use std::time::Duration;

use ax25tnc_app::audio::{NullInputSource, NullOutputSink};
use ax25tnc_app::demod::NullDemodulator;
use ax25tnc_app::ptt::NullPtt;
use ax25tnc_app::station::{ChannelSetup, Station};
use ax25tnc_core::channel::Channel;
use ax25tnc_core::dispatcher::DispatcherConfig;
use ax25tnc_core::txqueue::Priority;

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

    println!("Queuing a packet on channel 0...");
    let payload = b"Hello, world!".to_vec();
    station
        .enqueue_frame(0, payload, Priority::Low)
        .expect("channel 0 is configured");

    std::thread::sleep(Duration::from_secs(1));
    station.close();
}
