//! Frame structures for the PreMaid AI serial protocol
//!
//! This module provides:
//! - `TxFrame`: Reusable buffer for outgoing commands
//! - `ProtocolFrame`: One reassembled inbound message
//! - `checksum`: XOR parity shared by both directions
//!
//! # Pose command layout
//!
//! ```text
//! [50] [18] [00] [speed] [id hb lb] x 25 [xor]
//!  len  cmd  pad                          └─ XOR of every preceding byte
//! ```
//!
//! The checksum is always recomputed when a frame is built, so a caller can
//! never transmit a stale parity byte.

use super::constants::{
    ALL_STOP_SPEED, CHECKSUM_PLACEHOLDER, CMD_PADDING, CMD_POSE, HEADER_LEN, SERVO_ENTRY_LEN,
    SERVO_IDS, SPEED_MAX, SPEED_MIN,
};
use super::servo::{parse_hex_token, ServoId, ServoValue};
use crate::error::{Error, Result};
use crate::motion::Pose;
use std::fmt;

/// Largest frame the one-byte length field can describe
pub const MAX_FRAME_SIZE: usize = 255;

/// Most servo entries that fit in one frame
pub const MAX_SERVOS_PER_FRAME: usize = (MAX_FRAME_SIZE - HEADER_LEN - 1) / SERVO_ENTRY_LEN;

/// Reusable TX frame buffer
///
/// Create once and reconfigure for every command; no allocation when
/// re-sending the same pose repeatedly.
pub struct TxFrame {
    data: [u8; MAX_FRAME_SIZE],
    len: usize,
}

impl TxFrame {
    /// Create an empty frame
    pub const fn new() -> Self {
        Self {
            data: [0u8; MAX_FRAME_SIZE],
            len: 0,
        }
    }

    /// Get frame bytes for sending
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Copy the frame out, e.g. for a transport queue
    pub fn to_vec(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    /// Space separated uppercase hex, the way motion files spell frames
    pub fn to_hex(&self) -> String {
        hex_string(self.as_bytes(), " ")
    }

    /// Set a pose command (CMD 0x18)
    ///
    /// Speed is clamped to 1..=255 (smaller is faster). Every value is clamped
    /// into the valid servo range before encoding. Servo entries are written in
    /// the order the iterator yields them.
    pub fn set_pose<I>(&mut self, servos: I, speed: u8) -> Result<()>
    where
        I: IntoIterator<Item = (ServoId, ServoValue)>,
    {
        let speed = speed.clamp(SPEED_MIN, SPEED_MAX);
        self.data[1] = CMD_POSE;
        self.data[2] = CMD_PADDING;
        self.data[3] = speed;

        let mut pos = HEADER_LEN;
        for (count, (id, value)) in servos.into_iter().enumerate() {
            if count >= MAX_SERVOS_PER_FRAME {
                self.len = 0;
                return Err(Error::InvalidParameter(format!(
                    "pose has more than {} servos",
                    MAX_SERVOS_PER_FRAME
                )));
            }
            let [hb, lb] = ServoValue::clamped(value.raw() as i32).to_wire();
            self.data[pos] = id;
            self.data[pos + 1] = hb;
            self.data[pos + 2] = lb;
            pos += SERVO_ENTRY_LEN;
        }

        self.finalize(pos);
        Ok(())
    }

    /// Set the all-stop command: every servo id with a zero value
    ///
    /// Zero is outside the servo range on purpose; the robot reads it as
    /// "release torque", so this is the one frame that bypasses clamping.
    pub fn set_all_stop(&mut self) {
        self.data[1] = CMD_POSE;
        self.data[2] = CMD_PADDING;
        self.data[3] = ALL_STOP_SPEED;

        let mut pos = HEADER_LEN;
        for id in SERVO_IDS {
            self.data[pos] = id;
            self.data[pos + 1] = 0x00;
            self.data[pos + 2] = 0x00;
            pos += SERVO_ENTRY_LEN;
        }

        self.finalize(pos);
    }

    /// Write the length byte, then replace the placeholder with the XOR checksum
    #[inline]
    fn finalize(&mut self, body_end: usize) {
        self.data[body_end] = CHECKSUM_PLACEHOLDER;
        self.len = body_end + 1;
        self.data[0] = self.len as u8;
        self.data[body_end] = checksum(&self.data[..body_end]);
    }
}

impl Default for TxFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TxFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxFrame[{}]", self.to_hex())
    }
}

// ============================================================================
// Checksum
// ============================================================================

/// Running XOR of every byte
#[inline]
pub fn checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, &b| acc ^ b)
}

/// Check that the last byte is the XOR of all the others
pub fn verify_checksum(frame: &[u8]) -> Result<()> {
    let Some((&actual, body)) = frame.split_last() else {
        return Err(Error::InvalidParameter("empty frame".to_string()));
    };
    let expected = checksum(body);
    if expected != actual {
        return Err(Error::ChecksumMismatch { expected, actual });
    }
    Ok(())
}

// ============================================================================
// Command Factory
// ============================================================================

/// Build a pose command from joint angles
///
/// Servos are emitted in ascending id order, which is the order a [`Pose`]
/// iterates in.
pub fn build_pose_command(pose: &Pose, speed: u8) -> Result<TxFrame> {
    let mut frame = TxFrame::new();
    frame.set_pose(
        pose.iter()
            .map(|(id, angle)| (id, ServoValue::from_angle(angle))),
        speed,
    )?;
    Ok(frame)
}

/// Build the all-stop (torque release) command
pub fn build_stop_command() -> TxFrame {
    let mut frame = TxFrame::new();
    frame.set_all_stop();
    frame
}

// ============================================================================
// Inbound Frames
// ============================================================================

/// One inbound message cut out of the telemetry stream
///
/// Holds the tokens that followed the length prefix; the prefix itself is
/// implied by `len()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolFrame {
    bytes: Vec<u8>,
}

impl ProtocolFrame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// First token after the length prefix
    pub fn command(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// Contiguous uppercase hex (`"AABB"`)
    pub fn to_hex(&self) -> String {
        hex_string(&self.bytes, "")
    }

    /// Verify the trailing XOR byte, including the implied length prefix
    pub fn verify_checksum(&self) -> Result<()> {
        let Some((&actual, body)) = self.bytes.split_last() else {
            return Err(Error::InvalidParameter("empty frame".to_string()));
        };
        let expected = checksum(body) ^ self.bytes.len() as u8;
        if expected != actual {
            return Err(Error::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }
}

impl fmt::Display for ProtocolFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ============================================================================
// Hex Helpers
// ============================================================================

/// Format bytes as uppercase hex joined by `sep`
pub fn hex_string(bytes: &[u8], sep: &str) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(sep)
}

/// Parse hex text into bytes
///
/// Accepts whitespace separated tokens (`"50 18 00"`) as well as runs of
/// pairs (`"501800"`).
pub fn bytes_from_hex(text: &str) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for word in text.split_whitespace() {
        if word.len() % 2 != 0 || !word.is_ascii() {
            return Err(Error::MalformedToken(word.to_string()));
        }
        for i in (0..word.len()).step_by(2) {
            out.push(parse_hex_token(&word[i..i + 2])?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::{POSE_FRAME_LENGTH, POSE_FRAME_TOKENS, SERVO_COUNT};

    const ALL_STOP_HEX: &str = "50 18 00 06 02 00 00 03 00 00 04 00 00 05 00 00 06 00 00 \
        07 00 00 08 00 00 09 00 00 0A 00 00 0B 00 00 0C 00 00 0D 00 00 0E 00 00 0F 00 00 \
        10 00 00 11 00 00 12 00 00 13 00 00 14 00 00 15 00 00 16 00 00 17 00 00 18 00 00 \
        1A 00 00 1C 00 00";

    fn centered_servos() -> Vec<(ServoId, ServoValue)> {
        SERVO_IDS.iter().map(|&id| (id, ServoValue::CENTER)).collect()
    }

    #[test]
    fn test_stop_command_layout() {
        let frame = build_stop_command();
        let bytes = frame.as_bytes();
        assert_eq!(bytes.len(), POSE_FRAME_TOKENS);
        assert_eq!(&bytes[..79], bytes_from_hex(ALL_STOP_HEX).unwrap().as_slice());
    }

    #[test]
    fn test_stop_command_checksum_round_trip() {
        let hex = build_stop_command().to_hex();
        let bytes = bytes_from_hex(&hex).unwrap();
        let (last, body) = bytes.split_last().unwrap();
        assert_eq!(checksum(body), *last);
        assert!(verify_checksum(&bytes).is_ok());
    }

    #[test]
    fn test_pose_command_header() {
        let mut frame = TxFrame::new();
        frame.set_pose(centered_servos(), 50).unwrap();
        let bytes = frame.as_bytes();
        assert_eq!(bytes.len(), 80);
        assert_eq!(bytes[0], POSE_FRAME_LENGTH);
        assert_eq!(bytes[1], CMD_POSE);
        assert_eq!(bytes[2], 0x00);
        assert_eq!(bytes[3], 50);
        // First servo: 02 4C 1D
        assert_eq!(&bytes[4..7], &[0x02, 0x4C, 0x1D]);
        assert!(verify_checksum(bytes).is_ok());
    }

    #[test]
    fn test_pose_command_speed_clamped() {
        let mut frame = TxFrame::new();
        frame.set_pose(centered_servos(), 0).unwrap();
        assert_eq!(frame.as_bytes()[3], SPEED_MIN);
    }

    #[test]
    fn test_pose_command_clamps_values() {
        let mut frame = TxFrame::new();
        let servos = [
            (0x02, ServoValue::from_raw(0)),
            (0x03, ServoValue::from_raw(60000)),
        ];
        frame.set_pose(servos, 10).unwrap();
        let bytes = frame.as_bytes();
        assert_eq!(ServoValue::from_wire(bytes[5], bytes[6]), ServoValue::MIN);
        assert_eq!(ServoValue::from_wire(bytes[8], bytes[9]), ServoValue::MAX);
        assert_eq!(bytes[0] as usize, bytes.len());
    }

    #[test]
    fn test_checksum_recomputed_on_reuse() {
        let mut frame = TxFrame::new();
        frame.set_pose(centered_servos(), 50).unwrap();
        let first = frame.as_bytes()[79];
        frame.set_pose(centered_servos(), 51).unwrap();
        assert_ne!(first, frame.as_bytes()[79]);
        assert!(verify_checksum(frame.as_bytes()).is_ok());
    }

    #[test]
    fn test_pose_command_too_many_servos() {
        let mut frame = TxFrame::new();
        let servos = (0..=MAX_SERVOS_PER_FRAME as u8).map(|id| (id, ServoValue::CENTER));
        assert!(frame.set_pose(servos, 50).is_err());
        assert!(frame.as_bytes().is_empty());
    }

    #[test]
    fn test_build_pose_command_from_angles() {
        let pose: Pose = SERVO_IDS.iter().map(|&id| (id, 0.0)).collect();
        let frame = build_pose_command(&pose, 80).unwrap();
        assert_eq!(frame.as_bytes().len(), 4 + SERVO_COUNT * 3 + 1);
        assert_eq!(&frame.as_bytes()[4..7], &[0x02, 0x4C, 0x1D]);
    }

    #[test]
    fn test_verify_checksum_mismatch() {
        let mut bytes = build_stop_command().to_vec();
        *bytes.last_mut().unwrap() ^= 0x01;
        assert!(matches!(
            verify_checksum(&bytes),
            Err(Error::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_protocol_frame_hex() {
        let frame = ProtocolFrame::new(vec![0xAA, 0xBB]);
        assert_eq!(frame.to_hex(), "AABB");
        assert_eq!(frame.to_string(), "AABB");
        assert_eq!(frame.command(), Some(0xAA));
    }

    #[test]
    fn test_protocol_frame_checksum_includes_length() {
        // len=3: 1F 00 -> 03 ^ 1F ^ 00 = 1C
        let frame = ProtocolFrame::new(vec![0x1F, 0x00, 0x1C]);
        assert!(frame.verify_checksum().is_ok());
        let bad = ProtocolFrame::new(vec![0x1F, 0x00, 0x1D]);
        assert!(bad.verify_checksum().is_err());
    }

    #[test]
    fn test_bytes_from_hex() {
        assert_eq!(bytes_from_hex("02 AA bb").unwrap(), vec![0x02, 0xAA, 0xBB]);
        assert_eq!(bytes_from_hex("02AABB").unwrap(), vec![0x02, 0xAA, 0xBB]);
        assert!(bytes_from_hex("02A").is_err());
        assert!(bytes_from_hex("ZZ").is_err());
    }
}
