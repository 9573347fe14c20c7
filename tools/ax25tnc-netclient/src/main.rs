use std::io::Read;
use std::net::TcpStream;

use clap::Parser;

use ax25tnc_core::address::AddressList;
use ax25tnc_core::kiss::{KissBuffer, KissCommand, AX25_MAX_PACKET_LEN};

#[derive(Parser)]
struct Args {
    #[arg(short = 's', default_value = "127.0.0.1", help = "Hostname or IP of the running TNC")]
    host: String,
    #[arg(short = 'p', default_value = "8001", help = "KISS TCP port")]
    port: u16,
}

fn main() {
    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let mut stream = TcpStream::connect(&address)
        .unwrap_or_else(|e| panic!("could not connect to {address}: {e}"));
    println!("Connected to {address}. Printing decoded frames...");

    let mut kiss_buffer = KissBuffer::new();
    let mut read_buf = [0u8; 1024];
    loop {
        let n = match stream.read(&mut read_buf) {
            Ok(0) => {
                println!("connection closed");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                println!("read error: {e}");
                return;
            }
        };
        kiss_buffer.feed(&read_buf[..n]);
        while let Some(frame) = kiss_buffer.next_frame() {
            let Ok(KissCommand::DataFrame) = frame.command() else {
                continue;
            };
            let mut payload = [0u8; AX25_MAX_PACKET_LEN];
            let Ok(len) = frame.decode_payload(&mut payload) else {
                continue;
            };
            print_frame(&payload[..len]);
        }
    }
}

fn print_frame(packet: &[u8]) {
    match AddressList::decode(packet) {
        Some((addresses, consumed)) => {
            // Skip the control and PID bytes following the address list to
            // reach the information field.
            let info_start = (consumed + 2).min(packet.len());
            println!(
                "{} -> {} : {}",
                addresses.source.address.callsign.as_str(),
                addresses.destination.address.callsign.as_str(),
                String::from_utf8_lossy(&packet[info_start..])
            );
        }
        None => println!("(unparseable address header) {} bytes", packet.len()),
    }
}
