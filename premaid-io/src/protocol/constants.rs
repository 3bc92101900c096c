//! Constants for the PreMaid AI serial protocol

// Pose/motion command header
pub const POSE_FRAME_LENGTH: u8 = 0x50; // 80 bytes including length and checksum
pub const CMD_POSE: u8 = 0x18; // Servo pose / motion keyframe
pub const CMD_PADDING: u8 = 0x00;

// Servo value range (center 7500, ±4000 units = ±135°)
pub const SERVO_VALUE_MIN: u16 = 3500;
pub const SERVO_VALUE_MAX: u16 = 11500;
pub const SERVO_VALUE_CENTER: u16 = 7500;
pub const SERVO_HALF_RANGE: f32 = 4000.0;
pub const SERVO_HALF_ANGLE_DEG: f32 = 135.0;

// Speed byte (smaller is faster, 255 is slowest)
pub const SPEED_MIN: u8 = 1;
pub const SPEED_MAX: u8 = 255;
pub const DEFAULT_POSE_SPEED: u8 = 80;
pub const ALL_STOP_SPEED: u8 = 0x06;

// Frame layout
pub const SERVO_COUNT: usize = 25;
pub const HEADER_LEN: usize = 4; // length, command, padding, speed/wait
pub const SERVO_ENTRY_LEN: usize = 3; // id, hb, lb
pub const POSE_FRAME_TOKENS: usize = HEADER_LEN + SERVO_COUNT * SERVO_ENTRY_LEN + 1;
pub const CHECKSUM_PLACEHOLDER: u8 = 0xFF;

/// Servo ids in protocol order. 0x19, 0x1B are unassigned on this hardware.
pub const SERVO_IDS: [u8; SERVO_COUNT] = [
    0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10,
    0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18, 0x1A, 0x1C,
];

// Serial link
pub const BAUD_RATE: u32 = 115200;
pub const SERIAL_READ_TIMEOUT_MS: u64 = 1;
pub const READ_CHUNK_SIZE: usize = 256 * 3;

// Motion file
pub const PAYLOAD_MARKER: &str = "データ=";
pub const MIN_CANDIDATE_LOOKAHEAD: usize = 76; // tokens required after the 50 18 pair
pub const DEFAULT_KOMAS_PER_SECOND: f32 = 50.0;

// Inbound reassembly
pub const REASSEMBLY_BUFFER_SIZE: usize = 1024;
