//! Error types for PreMaid IO

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// PreMaid IO error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A token in a motion file or hex stream is not a 2-digit hex byte
    #[error("Malformed token: {0:?}")]
    MalformedToken(String),

    /// A candidate motion frame did not have the expected token count
    #[error("Malformed frame at token {offset}: {tokens} tokens")]
    MalformedFrame {
        /// Token index where the candidate window starts
        offset: usize,
        /// Number of tokens actually available in the window
        tokens: usize,
    },

    /// The payload marker was not found in a motion file
    #[error("Payload marker not found in motion file")]
    MissingPayloadMarker,

    /// XOR checksum mismatch
    #[error("Checksum error: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the preceding bytes
        expected: u8,
        /// Checksum byte found in the frame
        actual: u8,
    },

    /// Opening the physical channel failed
    #[error("Failed to open {port}: {source}")]
    TransportOpen {
        /// Port identifier as supplied by the caller
        port: String,
        /// Underlying serial port error
        #[source]
        source: serialport::Error,
    },

    /// Non-timeout failure while reading the physical channel
    #[error("Transport read error: {0}")]
    TransportRead(#[source] std::io::Error),

    /// The transport session has been closed
    #[error("Transport closed")]
    TransportClosed,

    /// Serial port error
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error (TOML parse or serialize)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Playback was requested on a sequence without keyframes
    #[error("Keyframe sequence is empty")]
    EmptySequence,

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Background thread panicked
    #[error("Thread panicked")]
    ThreadPanic,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(e: toml::ser::Error) -> Self {
        Error::Config(e.to_string())
    }
}
