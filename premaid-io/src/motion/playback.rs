//! Timed playback of a keyframe sequence
//!
//! The caller owns the clock: every method that depends on time takes the
//! current [`Instant`], so a render loop, a serial streaming loop and tests
//! all drive the session the same way.

use super::interpolator::PlaybackInterpolator;
use super::keyframe::{KeyframeSequence, Pose};
use crate::config::PlaybackConfig;
use crate::error::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlaybackState {
    Stopped,
    Playing { started: Instant },
}

/// Play/stop and frame stepping over one motion
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    interpolator: PlaybackInterpolator,
    komas_per_second: f32,
    state: PlaybackState,
    current_koma: u32,
    /// Discrete cursor for stepping; may leave the valid range
    current_frame: isize,
}

impl PlaybackSession {
    pub fn new(sequence: KeyframeSequence, config: PlaybackConfig) -> Self {
        Self::from_shared(Arc::new(sequence), config)
    }

    pub fn from_shared(sequence: Arc<KeyframeSequence>, config: PlaybackConfig) -> Self {
        Self {
            interpolator: PlaybackInterpolator::new(sequence),
            komas_per_second: config.komas_per_second,
            state: PlaybackState::Stopped,
            current_koma: 0,
            current_frame: 0,
        }
    }

    pub fn interpolator(&self) -> &PlaybackInterpolator {
        &self.interpolator
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing { .. })
    }

    /// Koma reached by the last [`update`](Self::update)
    pub fn current_koma(&self) -> u32 {
        self.current_koma
    }

    pub fn current_frame(&self) -> isize {
        self.current_frame
    }

    /// Start playback from koma 0, or stop it
    ///
    /// Stopping resets the koma count and returns the pose of the discrete
    /// frame cursor, if it points at a keyframe.
    pub fn toggle_play(&mut self, now: Instant) -> Option<Pose> {
        self.current_koma = 0;
        match self.state {
            PlaybackState::Playing { .. } => {
                self.state = PlaybackState::Stopped;
                log::debug!("Playback stopped");
                self.frame_pose()
            }
            PlaybackState::Stopped => {
                self.state = PlaybackState::Playing { started: now };
                log::debug!(
                    "Playback started ({} keyframes, {} komas)",
                    self.interpolator.sequence().len(),
                    self.interpolator.duration()
                );
                None
            }
        }
    }

    /// Advance to `now` and return the interpolated pose
    ///
    /// `Ok(None)` while stopped. Playback does not loop: past the end the
    /// last keyframe's pose is returned until stopped.
    pub fn update(&mut self, now: Instant) -> Result<Option<Pose>> {
        let PlaybackState::Playing { started } = self.state else {
            return Ok(None);
        };
        self.current_koma = self.koma_at(now.saturating_duration_since(started));
        self.interpolator.pose_at_tick(self.current_koma).map(Some)
    }

    /// Koma count after `elapsed` wall-clock time
    pub fn koma_at(&self, elapsed: Duration) -> u32 {
        // Float to int casts saturate, and NaN becomes 0
        (elapsed.as_secs_f64() * self.komas_per_second as f64).floor() as u32
    }

    /// Whether playback has run past the last keyframe
    pub fn is_finished(&self, now: Instant) -> bool {
        match self.state {
            PlaybackState::Playing { started } => {
                self.koma_at(now.saturating_duration_since(started)) as u64
                    > self.interpolator.duration()
            }
            PlaybackState::Stopped => false,
        }
    }

    /// Move the frame cursor forward and return that keyframe's pose
    pub fn step_forward(&mut self) -> Option<Pose> {
        self.current_frame = self.current_frame.saturating_add(1);
        self.frame_pose()
    }

    /// Move the frame cursor back and return that keyframe's pose
    pub fn step_back(&mut self) -> Option<Pose> {
        self.current_frame = self.current_frame.saturating_sub(1);
        self.frame_pose()
    }

    fn frame_pose(&self) -> Option<Pose> {
        let index = usize::try_from(self.current_frame).ok()?;
        self.interpolator.pose_at_frame_index(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::keyframe::{FrameHeader, Keyframe, ServoEntry};
    use crate::protocol::ServoValue;
    use approx::assert_relative_eq;

    fn session() -> PlaybackSession {
        let header = FrameHeader {
            length: 0x50,
            command: 0x18,
            padding: 0x00,
        };
        let seq: KeyframeSequence = [7500u16, 8300, 9100]
            .into_iter()
            .map(|raw| {
                Keyframe::new(
                    header,
                    10,
                    vec![ServoEntry::new(0x02, ServoValue::from_raw(raw))],
                    0,
                )
            })
            .collect();
        PlaybackSession::new(seq, PlaybackConfig::default())
    }

    #[test]
    fn test_stopped_session_yields_nothing() {
        let mut s = session();
        assert!(!s.is_playing());
        assert!(s.update(Instant::now()).unwrap().is_none());
        assert!(!s.is_finished(Instant::now()));
    }

    #[test]
    fn test_update_follows_clock() {
        let mut s = session();
        let t0 = Instant::now();
        assert!(s.toggle_play(t0).is_none());
        assert!(s.is_playing());

        // 50 komas/s: 0.5 s is koma 25, between keyframe 1 and 2
        let pose = s.update(t0 + Duration::from_millis(500)).unwrap().unwrap();
        assert_eq!(s.current_koma(), 25);
        assert_relative_eq!(pose.get(0x02).unwrap(), 40.5);

        let pose = s.update(t0 + Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(s.current_koma(), 50);
        assert_eq!(pose.get(0x02), Some(54.0));
        assert!(s.is_finished(t0 + Duration::from_secs(1)));
        assert!(!s.is_finished(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_stop_resets_and_returns_cursor_pose() {
        let mut s = session();
        let t0 = Instant::now();
        s.toggle_play(t0);
        s.update(t0 + Duration::from_millis(500)).unwrap();

        let pose = s.toggle_play(t0 + Duration::from_secs(1)).unwrap();
        assert!(!s.is_playing());
        assert_eq!(s.current_koma(), 0);
        assert_eq!(pose.get(0x02), Some(0.0));
    }

    #[test]
    fn test_stepping() {
        let mut s = session();
        assert_eq!(s.step_forward().unwrap().get(0x02), Some(27.0));
        assert_eq!(s.step_forward().unwrap().get(0x02), Some(54.0));
        assert!(s.step_forward().is_none());
        assert_eq!(s.step_back().unwrap().get(0x02), Some(54.0));
        s.step_back();
        s.step_back();
        assert_eq!(s.current_frame(), 0);
        assert!(s.step_back().is_none());
        assert_eq!(s.current_frame(), -1);
        assert_eq!(s.step_forward().unwrap().get(0x02), Some(0.0));
    }

    #[test]
    fn test_empty_sequence_update_errors() {
        let mut s = PlaybackSession::new(KeyframeSequence::default(), PlaybackConfig::default());
        let t0 = Instant::now();
        s.toggle_play(t0);
        assert!(s.update(t0).is_err());
        assert!(s.step_forward().is_none());
    }

    #[test]
    fn test_koma_rate_from_config() {
        let s = PlaybackSession::new(
            KeyframeSequence::default(),
            PlaybackConfig {
                komas_per_second: 100.0,
            },
        );
        assert_eq!(s.koma_at(Duration::from_millis(250)), 25);
        assert_eq!(s.koma_at(Duration::ZERO), 0);
    }
}
