//! premaid-io - motion files, keyframe playback and the serial wire protocol
//! of the PreMaid AI humanoid
//!
//! ## Layers
//!
//! - [`protocol`]: servo value codec, pose command frames, inbound reassembly
//! - [`motion`]: motion file (.pma) parsing, interpolation, timed playback
//! - [`transport`]: serial / mock channels and the background I/O session
//! - [`controller`]: servo table and live pose transmission

pub mod config;
pub mod controller;
pub mod error;
pub mod motion;
pub mod protocol;
pub mod transport;

// Re-export commonly used types
pub use config::AppConfig;
pub use controller::{PoseController, ServoTable};
pub use error::{Error, Result};
pub use motion::{
    parse_motion, KeyframeSequence, MotionFileParser, PlaybackInterpolator, PlaybackSession, Pose,
    PoseSink,
};
pub use protocol::{FrameReassembler, ProtocolFrame, ServoValue, TxFrame};
pub use transport::{MockTransport, SerialTransport, Transport, TransportSession};
