//! premaid-io - command line front end
//!
//! ```text
//! premaid-io inspect walk.pma --frames
//! premaid-io play walk.pma --port /dev/rfcomm0
//! premaid-io monitor --port COM7
//! premaid-io stop
//! ```
//!
//! Every subcommand reads `--config <path>` (TOML) when given and falls back
//! to built-in defaults otherwise.

use clap::{Parser, Subcommand};
use premaid_io::config::{AppConfig, ScanMode, SerialConfig};
use premaid_io::error::{Error, Result};
use premaid_io::motion::{MotionFileParser, ParsedMotion, PlaybackSession};
use premaid_io::transport::MockTransport;
use premaid_io::PoseController;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "premaid-io")]
#[command(about = "Inspect and play PreMaid AI motion files, talk to the robot over serial")]
struct Args {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a motion file and print what was found
    Inspect {
        /// Motion file (.pma)
        file: PathBuf,

        /// Print every keyframe's wait and joint angles
        #[arg(long)]
        frames: bool,

        /// Jump past accepted frames instead of rescanning token by token
        #[arg(long)]
        strict: bool,

        /// Reject frames with a bad XOR checksum
        #[arg(long)]
        verify_checksum: bool,
    },
    /// Stream a motion file to the robot
    Play {
        /// Motion file (.pma)
        file: PathBuf,

        /// Serial port (overrides the config file)
        #[arg(short, long)]
        port: Option<String>,

        /// Run against an in-memory transport instead of a serial port
        #[arg(long)]
        dry_run: bool,
    },
    /// Print frames received from the robot until Ctrl-C
    Monitor {
        /// Serial port (overrides the config file)
        #[arg(short, long)]
        port: Option<String>,
    },
    /// Relax every servo
    Stop {
        /// Serial port (overrides the config file)
        #[arg(short, long)]
        port: Option<String>,
    },
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path),
        None => Ok(AppConfig::default()),
    }
}

fn serial_config(config: &AppConfig, port: Option<String>) -> SerialConfig {
    let mut serial = config.serial.clone();
    if let Some(port) = port {
        serial.port = port;
    }
    serial
}

fn shutdown_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;
    Ok(running)
}

fn read_motion(config: &AppConfig, file: &Path) -> Result<ParsedMotion> {
    let bytes = fs::read(file)?;
    let text = String::from_utf8_lossy(&bytes);
    let parsed = MotionFileParser::new(config.parser.clone()).parse(&text)?;
    log::info!("{}: {}", file.display(), parsed.report);
    Ok(parsed)
}

fn inspect(config: &AppConfig, file: &Path, frames: bool) -> Result<()> {
    let parsed = read_motion(config, file)?;
    let sequence = &parsed.sequence;
    let duration = sequence.total_duration();

    println!("{}", file.display());
    println!("  {}", parsed.report);
    println!(
        "  {} keyframes, {} komas ({:.2} s at {} komas/s)",
        sequence.len(),
        duration,
        duration as f64 / config.playback.komas_per_second as f64,
        config.playback.komas_per_second
    );

    if frames {
        for (i, frame) in sequence.iter().enumerate() {
            let angles: Vec<String> = frame
                .servos()
                .iter()
                .map(|s| format!("{:02X}:{:+.1}", s.id, s.angle()))
                .collect();
            println!("  #{:<4} wait {:>3}  {}", i, frame.wait(), angles.join(" "));
        }
    }
    Ok(())
}

fn play(config: &AppConfig, file: &Path, port: Option<String>, dry_run: bool) -> Result<()> {
    let parsed = read_motion(config, file)?;
    if parsed.sequence.is_empty() {
        return Err(Error::EmptySequence);
    }

    let mut controller = PoseController::from_config(config);
    let mock = MockTransport::new();
    if dry_run {
        controller.open(Box::new(mock.clone()))?;
    } else {
        controller.open_serial(&serial_config(config, port))?;
    }

    let running = shutdown_flag()?;
    let interval = config.controller.continuous_interval();
    let mut session = PlaybackSession::new(parsed.sequence, config.playback);
    session.toggle_play(Instant::now());
    log::info!("Playing {} (Ctrl-C to stop)", file.display());

    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if let Some(pose) = session.update(now)? {
            controller.set_pose(&pose);
            controller.apply_pose()?;
        }
        controller.update(Duration::ZERO)?;
        if session.is_finished(now) {
            break;
        }
        thread::sleep(interval);
    }

    controller.close()?;
    if dry_run {
        println!("{} pose commands written", mock.writes().len());
    }
    log::info!("Playback finished at koma {}", session.current_koma());
    Ok(())
}

fn monitor(config: &AppConfig, port: Option<String>) -> Result<()> {
    let mut controller = PoseController::from_config(config);
    controller.on_frame(|frame| println!("{}", frame));
    controller.open_serial(&serial_config(config, port))?;

    let running = shutdown_flag()?;
    log::info!("Monitoring (Ctrl-C to stop)");

    let tick = Duration::from_millis(10);
    while running.load(Ordering::Relaxed) {
        controller.update(tick)?;
        thread::sleep(tick);
    }
    controller.close()
}

fn stop(config: &AppConfig, port: Option<String>) -> Result<()> {
    let mut controller = PoseController::from_config(config);
    controller.open_serial(&serial_config(config, port))?;
    controller.force_all_stop()?;
    controller.close()?;
    log::info!("All-stop sent");
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    if let Some(path) = &args.config {
        log::info!("Using config: {}", path.display());
    }

    match args.command {
        Commands::Inspect {
            file,
            frames,
            strict,
            verify_checksum,
        } => {
            if strict {
                config.parser.scan_mode = ScanMode::Strict;
            }
            config.parser.verify_checksum |= verify_checksum;
            inspect(&config, &file, frames)
        }
        Commands::Play {
            file,
            port,
            dry_run,
        } => play(&config, &file, port, dry_run),
        Commands::Monitor { port } => monitor(&config, port),
        Commands::Stop { port } => stop(&config, port),
    }
}
