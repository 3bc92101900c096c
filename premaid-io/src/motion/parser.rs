//! Motion file (.pma) parser
//!
//! A motion file is text: a header region, the payload marker (`データ=`),
//! then whitespace separated 2-digit hex tokens. Motion frames inside the
//! payload are 80 tokens:
//!
//! ```text
//! 50 18 00 <wait> {25 x (id, hb, lb)} <xor>
//! ```
//!
//! # Frame detection
//!
//! Frame boundaries are not announced in the token stream, so the parser
//! scans for the `50 18` pair and treats the 80-token window starting there
//! as a candidate. In [`ScanMode::Permissive`] the scan then advances a single
//! token, which tolerates misaligned or overlapping data at the cost of
//! occasionally testing windows that start inside servo data.
//! [`ScanMode::Strict`] jumps past each accepted window instead.
//!
//! A bad window (short, or containing a non-hex token) is logged and skipped;
//! only a missing payload marker fails the whole parse.

use super::keyframe::{FrameHeader, Keyframe, KeyframeSequence, ServoEntry};
use crate::config::{ParserConfig, ScanMode};
use crate::error::{Error, Result};
use crate::protocol::constants::{
    CMD_POSE, HEADER_LEN, MIN_CANDIDATE_LOOKAHEAD, POSE_FRAME_LENGTH, POSE_FRAME_TOKENS,
    SERVO_COUNT, SERVO_ENTRY_LEN,
};
use crate::protocol::frame::checksum;
use crate::protocol::servo::{self, parse_hex_token};
use std::fmt;

/// Counters collected while scanning a motion file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseReport {
    /// Tokens in the payload
    pub token_count: usize,
    /// Candidate windows (`50 18` with enough lookahead)
    pub frames_found: usize,
    /// Windows that became keyframes
    pub frames_accepted: usize,
    /// Windows skipped for length or token errors
    pub malformed: usize,
    /// Windows skipped because checksum verification was on and failed
    pub checksum_mismatches: usize,
}

impl fmt::Display for ParseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tokens, {} frames found, {} accepted, {} malformed, {} checksum mismatches",
            self.token_count,
            self.frames_found,
            self.frames_accepted,
            self.malformed,
            self.checksum_mismatches
        )
    }
}

/// Result of a successful parse
#[derive(Debug, Clone)]
pub struct ParsedMotion {
    pub sequence: KeyframeSequence,
    pub report: ParseReport,
}

/// Motion file parser
#[derive(Debug, Clone, Default)]
pub struct MotionFileParser {
    config: ParserConfig,
}

impl MotionFileParser {
    pub fn new(config: ParserConfig) -> Self {
        Self { config }
    }

    /// Parse the full text of a motion file
    pub fn parse(&self, text: &str) -> Result<ParsedMotion> {
        let payload = self.payload(text)?;
        let tokens: Vec<&str> = payload.split_whitespace().collect();

        let mut report = ParseReport {
            token_count: tokens.len(),
            ..Default::default()
        };
        let mut frames = Vec::new();

        log::debug!("Motion payload: {} tokens", tokens.len());

        let mut seek = 0;
        while seek < tokens.len() {
            if !self.is_candidate(&tokens, seek) {
                seek += 1;
                continue;
            }

            report.frames_found += 1;
            let end = (seek + POSE_FRAME_TOKENS).min(tokens.len());
            let window = &tokens[seek..end];

            match self.parse_window(window, seek) {
                Ok(frame) => {
                    frames.push(frame);
                    report.frames_accepted += 1;
                    if self.config.scan_mode == ScanMode::Strict {
                        seek += POSE_FRAME_TOKENS;
                        continue;
                    }
                }
                Err(Error::ChecksumMismatch { expected, actual }) => {
                    log::warn!(
                        "Skipping frame at token {}: checksum expected {:02X}, got {:02X}",
                        seek,
                        expected,
                        actual
                    );
                    report.checksum_mismatches += 1;
                }
                Err(e) => {
                    log::warn!("Skipping frame at token {}: {}", seek, e);
                    report.malformed += 1;
                }
            }

            seek += 1;
        }

        log::info!("Motion file parsed: {}", report);

        Ok(ParsedMotion {
            sequence: KeyframeSequence::new(frames),
            report,
        })
    }

    /// Text following the payload marker
    fn payload<'a>(&self, text: &'a str) -> Result<&'a str> {
        let marker = self.config.payload_marker.as_str();
        let Some(index) = text.find(marker) else {
            log::error!("Payload marker {:?} not found", marker);
            return Err(Error::MissingPayloadMarker);
        };
        Ok(&text[index + marker.len()..])
    }

    fn is_candidate(&self, tokens: &[&str], seek: usize) -> bool {
        seek + 2 + MIN_CANDIDATE_LOOKAHEAD <= tokens.len()
            && is_byte(tokens[seek], POSE_FRAME_LENGTH)
            && is_byte(tokens[seek + 1], CMD_POSE)
    }

    /// Decode one 80-token window
    fn parse_window(&self, window: &[&str], offset: usize) -> Result<Keyframe> {
        if window.len() != POSE_FRAME_TOKENS {
            return Err(Error::MalformedFrame {
                offset,
                tokens: window.len(),
            });
        }

        let header = FrameHeader {
            length: parse_hex_token(window[0])?,
            command: parse_hex_token(window[1])?,
            padding: parse_hex_token(window[2])?,
        };
        let wait = parse_hex_token(window[3])? as u32;

        let mut servos = Vec::with_capacity(SERVO_COUNT);
        for entry in window[HEADER_LEN..HEADER_LEN + SERVO_COUNT * SERVO_ENTRY_LEN]
            .chunks_exact(SERVO_ENTRY_LEN)
        {
            let id = parse_hex_token(entry[0])?;
            let value = servo::decode(entry[1], entry[2])?;
            servos.push(ServoEntry::new(id, value));
        }

        let stored = parse_hex_token(window[POSE_FRAME_TOKENS - 1])?;
        if self.config.verify_checksum {
            let body = window[..POSE_FRAME_TOKENS - 1]
                .iter()
                .map(|t| parse_hex_token(t))
                .collect::<Result<Vec<u8>>>()?;
            let expected = checksum(&body);
            if expected != stored {
                return Err(Error::ChecksumMismatch {
                    expected,
                    actual: stored,
                });
            }
        }

        Ok(Keyframe::new(header, wait, servos, stored))
    }
}

/// Parse with default settings
pub fn parse_motion(text: &str) -> Result<ParsedMotion> {
    MotionFileParser::default().parse(text)
}

#[inline]
fn is_byte(token: &str, byte: u8) -> bool {
    parse_hex_token(token).map(|b| b == byte).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::constants::SERVO_IDS;
    use crate::protocol::{build_stop_command, hex_string, ServoValue, TxFrame};

    /// 80-token frame text with all servos at `value` and the given wait
    fn frame_text(wait: u8, value: ServoValue) -> String {
        let mut frame = TxFrame::new();
        frame
            .set_pose(SERVO_IDS.iter().map(|&id| (id, value)), wait)
            .unwrap();
        frame.to_hex()
    }

    fn file(payload: &str) -> String {
        format!("タイトル=test\r\nデータ={}", payload)
    }

    #[test]
    fn test_missing_marker() {
        let err = parse_motion("no payload here 50 18 00").unwrap_err();
        assert!(matches!(err, Error::MissingPayloadMarker));
    }

    #[test]
    fn test_single_frame() {
        let parsed = parse_motion(&file(&frame_text(0x0A, ServoValue::CENTER))).unwrap();
        assert_eq!(parsed.sequence.len(), 1);
        let frame = parsed.sequence.first().unwrap();
        assert_eq!(frame.wait(), 10);
        assert_eq!(frame.servos().len(), SERVO_COUNT);
        assert_eq!(frame.servos()[0].id, 0x02);
        assert_eq!(frame.servos()[0].value, ServoValue::CENTER);
        assert_eq!(frame.header().command, CMD_POSE);
        assert_eq!(parsed.report.frames_found, 1);
        assert_eq!(parsed.report.frames_accepted, 1);
    }

    #[test]
    fn test_truncated_tail_is_skipped() {
        let good = frame_text(0xFF, ServoValue::CENTER);
        let truncated: Vec<&str> = good.split(' ').take(40).collect();
        let text = file(&format!("{} {}", good, truncated.join(" ")));

        let parsed = parse_motion(&text).unwrap();
        assert_eq!(parsed.sequence.len(), 1);
        assert_eq!(parsed.report.frames_accepted, 1);
    }

    #[test]
    fn test_short_window_counted_as_malformed() {
        // 50 18 followed by exactly 76 tokens: a candidate, but only 78 long
        let good = frame_text(0x10, ServoValue::CENTER);
        let short: Vec<&str> = good.split(' ').take(78).collect();
        let parsed = parse_motion(&file(&short.join(" "))).unwrap();
        assert!(parsed.sequence.is_empty());
        assert_eq!(parsed.report.frames_found, 1);
        assert_eq!(parsed.report.malformed, 1);
    }

    #[test]
    fn test_bad_token_skips_only_that_frame() {
        let first = frame_text(0x01, ServoValue::CENTER);
        let mut broken: Vec<String> = first.split(' ').map(str::to_string).collect();
        broken[10] = "ZZ".to_string();
        let second = frame_text(0x02, ServoValue::MAX);
        let text = file(&format!("{} {}", broken.join(" "), second));

        let parsed = parse_motion(&text).unwrap();
        assert_eq!(parsed.sequence.len(), 1);
        assert_eq!(parsed.sequence.first().unwrap().wait(), 2);
        assert!(parsed.report.malformed >= 1);
    }

    #[test]
    fn test_multiple_frames_in_order_with_noise() {
        let text = file(&format!(
            "00 01 02\n{}\r\n{}  FF",
            frame_text(0x05, ServoValue::MIN),
            frame_text(0x06, ServoValue::MAX)
        ));
        let parsed = parse_motion(&text).unwrap();
        assert_eq!(parsed.sequence.len(), 2);
        assert_eq!(parsed.sequence.get(0).unwrap().wait(), 5);
        assert_eq!(parsed.sequence.get(1).unwrap().wait(), 6);
        assert_eq!(parsed.sequence.total_duration(), 11);
    }

    #[test]
    fn test_checksum_not_enforced_by_default() {
        let mut tokens: Vec<String> = frame_text(0x05, ServoValue::CENTER)
            .split(' ')
            .map(str::to_string)
            .collect();
        tokens[79] = "00".to_string();
        let text = file(&tokens.join(" "));

        let parsed = parse_motion(&text).unwrap();
        assert_eq!(parsed.sequence.len(), 1);
        assert_eq!(parsed.sequence.first().unwrap().checksum(), 0x00);

        let strict = MotionFileParser::new(ParserConfig {
            verify_checksum: true,
            ..Default::default()
        });
        let parsed = strict.parse(&text).unwrap();
        assert!(parsed.sequence.is_empty());
        assert_eq!(parsed.report.checksum_mismatches, 1);
    }

    #[test]
    fn test_strict_mode_skips_inner_candidates() {
        // 0x1850 goes on the wire as hb=50 lb=18, a "50 18" pair inside the body
        let mut frame = TxFrame::new();
        frame
            .set_pose(
                SERVO_IDS.iter().map(|&id| {
                    let value = if id == 0x02 { 0x1850 } else { 7500 };
                    (id, ServoValue::from_raw(value))
                }),
                0x05,
            )
            .unwrap();
        let single = frame.to_hex();
        let text = file(&format!("{} {}", single, frame_text(0x07, ServoValue::CENTER)));

        let permissive = parse_motion(&text).unwrap();
        let strict = MotionFileParser::new(ParserConfig {
            scan_mode: ScanMode::Strict,
            ..Default::default()
        })
        .parse(&text)
        .unwrap();

        assert!(permissive.report.frames_found > strict.report.frames_found);
        assert_eq!(strict.sequence.len(), 2);
        assert_eq!(strict.report.frames_found, 2);
    }

    #[test]
    fn test_stop_command_parses_as_frame() {
        let text = file(&build_stop_command().to_hex());
        let parsed = parse_motion(&text).unwrap();
        let frame = parsed.sequence.first().unwrap();
        assert_eq!(frame.wait(), 6);
        assert!(frame.servos().iter().all(|s| s.value.raw() == 0));
    }

    #[test]
    fn test_custom_marker() {
        let parser = MotionFileParser::new(ParserConfig {
            payload_marker: "DATA=".to_string(),
            ..Default::default()
        });
        let body = hex_string(build_stop_command().as_bytes(), " ");
        let parsed = parser.parse(&format!("DATA={}", body)).unwrap();
        assert_eq!(parsed.sequence.len(), 1);
    }
}
