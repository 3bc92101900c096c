//! Configuration for premaid-io
//!
//! Loads configuration from a TOML file. Every section falls back to its
//! defaults, so a file only needs the keys it changes.

use crate::error::Result;
use crate::protocol::constants::{
    BAUD_RATE, DEFAULT_KOMAS_PER_SECOND, DEFAULT_POSE_SPEED, PAYLOAD_MARKER,
    SERIAL_READ_TIMEOUT_MS,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub parser: ParserConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub reassembler: ReassemblerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial link to the robot
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name, passed to the OS unchanged (`/dev/ttyUSB0`, `COM7`, ...)
    pub port: String,
    pub baud_rate: u32,
    /// Read timeout; a timeout is reported as zero bytes read
    pub read_timeout_ms: u64,
    /// Sleep of the I/O loop after an iteration that moved no data
    pub idle_backoff_ms: u64,
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_backoff(&self) -> Duration {
        Duration::from_millis(self.idle_backoff_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: BAUD_RATE,
            read_timeout_ms: SERIAL_READ_TIMEOUT_MS,
            idle_backoff_ms: 1,
        }
    }
}

/// How the motion file scanner advances after a candidate window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Advance one token after every candidate
    #[default]
    Permissive,
    /// Jump past an accepted 80-token window
    Strict,
}

/// Motion file parsing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Text that introduces the hex payload
    pub payload_marker: String,
    pub scan_mode: ScanMode,
    /// Reject windows whose XOR parity does not match
    pub verify_checksum: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            payload_marker: PAYLOAD_MARKER.to_string(),
            scan_mode: ScanMode::Permissive,
            verify_checksum: false,
        }
    }
}

/// Keyframe playback timing
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Koma rate used to turn wall-clock time into a koma count
    pub komas_per_second: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            komas_per_second: DEFAULT_KOMAS_PER_SECOND,
        }
    }
}

/// Pose controller behaviour
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Speed byte for pose commands (1 = fastest)
    pub pose_speed: u8,
    /// Period of continuous pose transmission
    pub continuous_interval_ms: u64,
}

impl ControllerConfig {
    pub fn continuous_interval(&self) -> Duration {
        Duration::from_millis(self.continuous_interval_ms)
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            pose_speed: DEFAULT_POSE_SPEED,
            continuous_interval_ms: 250,
        }
    }
}

/// Inbound frame reassembly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ReassemblerConfig {
    /// Drop the token that follows every frame
    pub drop_separator: bool,
    /// Drop frames whose XOR parity does not match
    pub verify_checksum: bool,
}

impl Default for ReassemblerConfig {
    fn default() -> Self {
        Self {
            drop_separator: true,
            verify_checksum: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// # Example
    /// ```no_run
    /// use premaid_io::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("premaid.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
