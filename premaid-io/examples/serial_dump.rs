//! Serial port raw byte dumper
//!
//! Opens the robot's serial port and dumps every received byte in hex, along
//! with the frames the reassembler cuts out of the stream.
//!
//! ```text
//! cargo run --example serial_dump -- /dev/rfcomm0 10
//! ```

use premaid_io::config::ReassemblerConfig;
use premaid_io::protocol::constants::{BAUD_RATE, READ_CHUNK_SIZE};
use premaid_io::protocol::{hex_string, FrameReassembler};
use premaid_io::transport::{SerialTransport, Transport};
use std::env;
use std::time::{Duration, Instant};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args: Vec<String> = env::args().collect();
    let port = args.get(1).map(String::as_str).unwrap_or("/dev/rfcomm0");
    let seconds: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);

    log::info!("Opening serial port {} at {} baud...", port, BAUD_RATE);
    let mut transport = SerialTransport::open(port, BAUD_RATE, Duration::from_millis(1))?;
    log::info!("Serial port {} opened", transport.name());

    // Flush any old data
    let mut discard = vec![0u8; READ_CHUNK_SIZE];
    let mut total_flushed = 0;
    while transport.available()? > 0 {
        let read = transport.read(&mut discard)?;
        total_flushed += read;
        if read == 0 {
            break;
        }
    }
    log::info!("Flushed {} bytes", total_flushed);

    log::info!("Starting capture for {} seconds...", seconds);

    let start = Instant::now();
    let duration = Duration::from_secs(seconds);
    let mut reassembler = FrameReassembler::new(ReassemblerConfig::default());
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];
    let mut total_bytes = 0;
    let mut frame_count = 0;

    while start.elapsed() < duration {
        let bytes_read = transport.read(&mut buffer)?;
        if bytes_read == 0 {
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }

        total_bytes += bytes_read;
        println!(
            "[{:06}] {} bytes: {}",
            total_bytes,
            bytes_read,
            hex_string(&buffer[..bytes_read], " ")
        );

        for frame in reassembler.push(&buffer[..bytes_read]) {
            frame_count += 1;
            let parity = if frame.verify_checksum().is_ok() { "ok" } else { "bad" };
            println!("  --> frame LEN={} parity={}: {}", frame.len(), parity, frame);
        }
    }

    log::info!(
        "Captured {} bytes, {} frames, {} bytes left partial",
        total_bytes,
        frame_count,
        reassembler.pending_len()
    );
    Ok(())
}
