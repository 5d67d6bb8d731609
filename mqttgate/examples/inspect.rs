//! Inspect a CONNECT given as hex on the command line and run it through a gate
//!
//! `RUST_LOG=debug cargo run --example inspect -- 101000044d5154540402003c000464657631`

use bytes::BytesMut;
use mqttgate::mqttgate_bytes::{parse_packet, Packet, PropertySection};
use mqttgate::{ConnectionState, OptionBuilder, Verdict};

const SAMPLE: &str = "101e00044d51545405c2003c00000464657631000362\
                      6f620006736563726574";

fn main() {
    pretty_env_logger::init();

    let hex = std::env::args().nth(1).unwrap_or_else(|| SAMPLE.to_owned());
    let bytes = match decode_hex(&hex) {
        Some(bytes) => bytes,
        None => {
            eprintln!("Not a hex string: {hex}");
            std::process::exit(1);
        }
    };

    match parse_packet(bytes.clone().into()) {
        Ok(Packet::Connect(connect)) => {
            println!("Connect = {connect:?}");
            for section in [PropertySection::Connect, PropertySection::Will] {
                match connect.decode_properties(section) {
                    Ok(properties) => println!("{section:?} properties = {properties:?}"),
                    Err(e) => println!("{section:?} properties error = {e}"),
                }
            }
        }
        Ok(packet) => println!("Packet = {packet:?}"),
        Err(e) => println!("Parse error = {e}, recoverable = {}", e.is_recoverable()),
    }

    let options = OptionBuilder::new()
        .username_from_identity(true)
        .strip_password(true)
        .finalize();
    let mut state = ConnectionState::new(options);
    let mut stream = BytesMut::from(&bytes[..]);

    match state.handle_upstream(&mut stream, Some("CN=demo")) {
        Ok(Verdict::Forward(connect)) => println!("Forward = {:02x?}", &connect[..]),
        Ok(Verdict::Reject(connack)) => println!("Reject = {:02x?}", &connack[..]),
        Ok(verdict) => println!("Verdict = {verdict:?}"),
        Err(e) => println!("Gate error = {e}"),
    }
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return None;
    }

    (0..hex.len())
        .step_by(2)
        .map(|i| hex.get(i..i + 2).and_then(|b| u8::from_str_radix(b, 16).ok()))
        .collect()
}
