//! Servo value codec
//!
//! Conversions between the two wire bytes of a servo entry, the integer servo
//! value and the joint angle in degrees.
//!
//! # Byte order
//!
//! Each servo entry on the wire is `(id, hb, lb)`. The value is read by
//! concatenating `lb ++ hb` as hex text, so `4C 1D` decodes to `0x1D4C` (7500).
//! In other words the entry is little-endian even though the fields are named
//! high byte first. Keep it that way; the robot expects exactly this layout.
//!
//! # Angle mapping
//!
//! ```text
//! value:  3500 ........ 7500 ........ 11500
//! angle: -135°           0°           +135°
//! ```
//!
//! `angle = (value - 7500) * 135 / 4000`

use super::constants::{
    SERVO_HALF_ANGLE_DEG, SERVO_HALF_RANGE, SERVO_VALUE_CENTER, SERVO_VALUE_MAX, SERVO_VALUE_MIN,
};
use crate::error::{Error, Result};
use std::fmt;

/// Servo identifier as it appears on the wire (e.g. `0x02`)
pub type ServoId = u8;

/// Joint angle in degrees
pub type JointAngle = f32;

/// Integer servo position
///
/// Values decoded from the wire are kept as-is, including out-of-range ones
/// (the all-stop command carries zeros). Anything built for transmission goes
/// through [`ServoValue::clamped`] or [`ServoValue::from_angle`] first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ServoValue(u16);

impl ServoValue {
    pub const MIN: ServoValue = ServoValue(SERVO_VALUE_MIN);
    pub const MAX: ServoValue = ServoValue(SERVO_VALUE_MAX);
    pub const CENTER: ServoValue = ServoValue(SERVO_VALUE_CENTER);

    /// Wrap a raw decoded value without range checks
    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Clamp any integer into the valid servo range
    #[inline]
    pub fn clamped(raw: i32) -> Self {
        Self(raw.clamp(SERVO_VALUE_MIN as i32, SERVO_VALUE_MAX as i32) as u16)
    }

    /// Nearest servo value for an angle, clamped to the valid range
    pub fn from_angle(angle: JointAngle) -> Self {
        let offset = (angle * SERVO_HALF_RANGE / SERVO_HALF_ANGLE_DEG).round();
        if offset.is_nan() {
            return Self::CENTER;
        }
        // Clamp in float space so huge angles cannot overflow the sum
        let offset = offset.clamp(-SERVO_HALF_RANGE, SERVO_HALF_RANGE) as i32;
        Self::clamped(SERVO_VALUE_CENTER as i32 + offset)
    }

    /// Rebuild a value from the `(hb, lb)` wire bytes
    #[inline]
    pub const fn from_wire(hb: u8, lb: u8) -> Self {
        Self(((lb as u16) << 8) | hb as u16)
    }

    #[inline]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    pub const fn is_in_range(self) -> bool {
        self.0 >= SERVO_VALUE_MIN && self.0 <= SERVO_VALUE_MAX
    }

    /// Joint angle in degrees
    #[inline]
    pub fn to_angle(self) -> JointAngle {
        // Multiply before dividing so the range ends stay exact
        (self.0 as f32 - SERVO_VALUE_CENTER as f32) * SERVO_HALF_ANGLE_DEG / SERVO_HALF_RANGE
    }

    /// `(hb, lb)` wire bytes
    #[inline]
    pub const fn to_wire(self) -> [u8; 2] {
        [(self.0 & 0xFF) as u8, (self.0 >> 8) as u8]
    }
}

impl Default for ServoValue {
    fn default() -> Self {
        Self::CENTER
    }
}

impl fmt::Display for ServoValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse one 2-digit hex token (`"1D"`, `"ff"`)
pub fn parse_hex_token(token: &str) -> Result<u8> {
    if token.len() != 2 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::MalformedToken(token.to_string()));
    }
    u8::from_str_radix(token, 16).map_err(|_| Error::MalformedToken(token.to_string()))
}

/// Decode a servo value from its `hb` and `lb` hex tokens
pub fn decode(hb: &str, lb: &str) -> Result<ServoValue> {
    let hb = parse_hex_token(hb)?;
    let lb = parse_hex_token(lb)?;
    Ok(ServoValue::from_wire(hb, lb))
}

/// Joint angle for a servo value
#[inline]
pub fn to_angle(value: ServoValue) -> JointAngle {
    value.to_angle()
}

/// Clamp an arbitrary integer to `[3500, 11500]`
#[inline]
pub fn clamp_to_valid(raw: i32) -> ServoValue {
    ServoValue::clamped(raw)
}

/// Encode a servo value as `(hb, lb)` hex tokens
pub fn encode(value: ServoValue) -> (String, String) {
    let [hb, lb] = value.to_wire();
    (format!("{:02X}", hb), format!("{:02X}", lb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_swaps_bytes() {
        // 4C 1D on the wire is 0x1D4C = 7500
        let value = decode("4C", "1D").unwrap();
        assert_eq!(value.raw(), 7500);
        assert_eq!(value, ServoValue::CENTER);
    }

    #[test]
    fn test_decode_rejects_bad_tokens() {
        assert!(matches!(decode("4", "1D"), Err(Error::MalformedToken(_))));
        assert!(matches!(decode("4C", "1G"), Err(Error::MalformedToken(_))));
        assert!(matches!(decode("4C1", "1D"), Err(Error::MalformedToken(_))));
        assert!(matches!(decode("+C", "1D"), Err(Error::MalformedToken(_))));
    }

    #[test]
    fn test_angle_endpoints_exact() {
        assert_eq!(to_angle(ServoValue::CENTER), 0.0);
        assert_eq!(to_angle(ServoValue::MIN), -135.0);
        assert_eq!(to_angle(ServoValue::MAX), 135.0);
    }

    #[test]
    fn test_encode_decode_identity_over_range() {
        for raw in SERVO_VALUE_MIN..=SERVO_VALUE_MAX {
            let value = clamp_to_valid(raw as i32);
            let (hb, lb) = encode(value);
            assert_eq!(decode(&hb, &lb).unwrap(), value);
        }
    }

    #[test]
    fn test_encode_center() {
        assert_eq!(encode(ServoValue::CENTER), ("4C".to_string(), "1D".to_string()));
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp_to_valid(0), ServoValue::MIN);
        assert_eq!(clamp_to_valid(-20000), ServoValue::MIN);
        assert_eq!(clamp_to_valid(99999), ServoValue::MAX);
        assert_eq!(clamp_to_valid(8000).raw(), 8000);
    }

    #[test]
    fn test_from_angle() {
        assert_eq!(ServoValue::from_angle(0.0), ServoValue::CENTER);
        assert_eq!(ServoValue::from_angle(135.0), ServoValue::MAX);
        assert_eq!(ServoValue::from_angle(-135.0), ServoValue::MIN);
        assert_eq!(ServoValue::from_angle(400.0), ServoValue::MAX);
        assert_eq!(ServoValue::from_angle(f32::NAN), ServoValue::CENTER);
    }

    #[test]
    fn test_from_angle_huge_values_saturate() {
        assert_eq!(ServoValue::from_angle(1.0e9), ServoValue::MAX);
        assert_eq!(ServoValue::from_angle(-1.0e9), ServoValue::MIN);
        assert_eq!(ServoValue::from_angle(f32::MAX), ServoValue::MAX);
        assert_eq!(ServoValue::from_angle(f32::INFINITY), ServoValue::MAX);
        assert_eq!(ServoValue::from_angle(f32::NEG_INFINITY), ServoValue::MIN);
    }

    #[test]
    fn test_raw_values_preserved() {
        let zero = ServoValue::from_wire(0x00, 0x00);
        assert_eq!(zero.raw(), 0);
        assert!(!zero.is_in_range());
        assert!(ServoValue::CENTER.is_in_range());
    }
}
