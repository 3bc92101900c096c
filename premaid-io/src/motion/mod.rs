//! Motion subsystem: motion file decoding and keyframe playback

pub mod interpolator;
pub mod keyframe;
pub mod parser;
pub mod playback;

pub use interpolator::{lerp_angle, Bracket, PlaybackInterpolator};
pub use keyframe::{FrameHeader, Keyframe, KeyframeSequence, Pose, PoseSink, ServoEntry};
pub use parser::{parse_motion, MotionFileParser, ParseReport, ParsedMotion};
pub use playback::PlaybackSession;
