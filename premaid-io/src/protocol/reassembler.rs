//! Incremental reassembly of inbound telemetry
//!
//! The robot answers with a length-prefixed token stream:
//!
//! ```text
//! [len] [len tokens ...] [sep] [len] [len tokens ...] ...
//! ```
//!
//! Rules, applied repeatedly to the front of the buffer:
//!
//! 1. Fewer than 2 tokens buffered: wait for more data.
//! 2. `len == 0`: noise, drop that single token and look again.
//! 3. Fewer than `1 + len` tokens buffered: wait for more data.
//! 4. Otherwise emit the `len` tokens after the prefix as one frame, consume
//!    them, and drop one following separator token if one is buffered.
//!
//! The reassembler never blocks. Partial data stays buffered between calls.

use super::constants::REASSEMBLY_BUFFER_SIZE;
use super::frame::{bytes_from_hex, ProtocolFrame};
use super::ring_buffer::RingBuffer;
use crate::config::ReassemblerConfig;
use crate::error::Result;

/// Stateful decoder from raw stream bytes to [`ProtocolFrame`]s
pub struct FrameReassembler {
    buffer: RingBuffer<REASSEMBLY_BUFFER_SIZE>,
    config: ReassemblerConfig,
}

impl FrameReassembler {
    pub fn new(config: ReassemblerConfig) -> Self {
        Self {
            buffer: RingBuffer::new(),
            config,
        }
    }

    /// Append newly arrived bytes and return every frame they complete
    pub fn push(&mut self, bytes: &[u8]) -> Vec<ProtocolFrame> {
        let dropped = self.buffer.extend(bytes);
        if dropped > 0 {
            log::warn!(
                "Reassembly buffer full ({} bytes), dropped {} bytes",
                self.buffer.capacity(),
                dropped
            );
        }

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame() {
            frames.push(frame);
        }
        frames
    }

    /// Same as [`push`](Self::push) for hex text (`"02 AA BB"` or `"02AABB"`)
    pub fn push_hex(&mut self, text: &str) -> Result<Vec<ProtocolFrame>> {
        let bytes = bytes_from_hex(text)?;
        Ok(self.push(&bytes))
    }

    /// Bytes received but not yet part of a complete frame
    pub fn pending(&self) -> Vec<u8> {
        self.buffer.to_vec()
    }

    pub fn pending_len(&self) -> usize {
        self.buffer.len()
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
    }

    fn next_frame(&mut self) -> Option<ProtocolFrame> {
        loop {
            if self.buffer.len() < 2 {
                return None;
            }

            let order_length = self.buffer.get(0)? as usize;
            if order_length == 0 {
                self.buffer.advance(1);
                continue;
            }

            let total = 1 + order_length;
            if self.buffer.len() < total {
                return None;
            }

            let bytes = self.buffer.copy_range(1, order_length)?;
            self.buffer.advance(total);
            if self.config.drop_separator && !self.buffer.is_empty() {
                self.buffer.advance(1);
            }

            let frame = ProtocolFrame::new(bytes);
            if self.config.verify_checksum {
                if let Err(e) = frame.verify_checksum() {
                    log::warn!("Dropping inbound frame {}: {}", frame, e);
                    continue;
                }
            }

            log::trace!("Reassembled frame: {}", frame);
            return Some(frame);
        }
    }
}

impl Default for FrameReassembler {
    fn default() -> Self {
        Self::new(ReassemblerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_separator() -> FrameReassembler {
        FrameReassembler::new(ReassemblerConfig {
            drop_separator: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_single_frame() {
        let mut r = FrameReassembler::default();
        let frames = r.push_hex("02 AA BB").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].to_hex(), "AABB");
        assert!(r.pending().is_empty());
    }

    #[test]
    fn test_leading_zero_discarded() {
        let mut r = FrameReassembler::default();
        let frames = r.push(&[0x00, 0x02, 0xAA]);
        assert!(frames.is_empty());
        assert_eq!(r.pending(), vec![0x02, 0xAA]);

        let frames = r.push(&[0xBB]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].to_hex(), "AABB");
    }

    #[test]
    fn test_only_zero_discards_one_token() {
        let mut r = FrameReassembler::default();
        assert!(r.push(&[0x00, 0x00]).is_empty());
        // Second zero is a lone token now; rule 1 waits
        assert_eq!(r.pending(), vec![0x00]);
    }

    #[test]
    fn test_waits_for_length_prefix_and_body() {
        let mut r = FrameReassembler::default();
        assert!(r.push(&[0x03]).is_empty());
        assert!(r.push(&[0x11, 0x22]).is_empty());
        assert_eq!(r.pending_len(), 3);
        let frames = r.push(&[0x33]);
        assert_eq!(frames[0].as_bytes(), &[0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_separator_dropped_between_frames() {
        let mut r = FrameReassembler::default();
        let frames = r.push_hex("02 AA BB 00 01 CC").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].to_hex(), "CC");
    }

    #[test]
    fn test_back_to_back_frames_without_separator() {
        let mut r = no_separator();
        let frames = r.push_hex("02 AA BB 01 CC").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].to_hex(), "AABB");
        assert_eq!(frames[1].to_hex(), "CC");
    }

    #[test]
    fn test_checksum_verification_drops_bad_frames() {
        let mut r = FrameReassembler::new(ReassemblerConfig {
            drop_separator: false,
            verify_checksum: true,
        });
        // 03 1F 00 1C is valid, 03 1F 00 1D is not
        let frames = r.push_hex("03 1F 00 1D 03 1F 00 1C").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].to_hex(), "1F001C");
    }

    #[test]
    fn test_bad_hex_leaves_buffer_untouched() {
        let mut r = FrameReassembler::default();
        r.push(&[0x05, 0x01]);
        assert!(r.push_hex("0G").is_err());
        assert_eq!(r.pending(), vec![0x05, 0x01]);
    }

    #[test]
    fn test_reset() {
        let mut r = FrameReassembler::default();
        r.push(&[0x05, 0x01]);
        r.reset();
        assert_eq!(r.pending_len(), 0);
    }
}
