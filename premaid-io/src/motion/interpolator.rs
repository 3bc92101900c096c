//! Keyframe interpolation
//!
//! Maps an elapsed koma count to a pose. The sequence is walked while
//! accumulating `wait` values until the running total reaches the requested
//! koma; the keyframes on either side of that point are blended.
//!
//! ```text
//! wait:      |--- f0.wait ---|--- f1.wait ---|--- f2.wait ---|
//! koma:  0 ... f0 pose ......|<- f0 -> f1 ->|<- f1 -> f2 ->| ... f2 pose
//! ```
//!
//! - Before the end of the first keyframe's wait: first pose verbatim
//! - Past the total duration: last pose verbatim (no looping)
//! - Otherwise: `weight = clamp01((koma - elapsed) / previous.wait)` where
//!   `elapsed` is the total through the previous keyframe

use super::keyframe::{Keyframe, KeyframeSequence, Pose};
use crate::error::{Error, Result};
use crate::protocol::JointAngle;
use std::sync::Arc;

/// Where a koma falls in a sequence
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bracket {
    /// Before the first keyframe's wait has elapsed
    First,
    /// Between two keyframes, `weight` in `[0, 1]`
    Between {
        previous: usize,
        next: usize,
        weight: f32,
    },
    /// Beyond the total duration
    Last,
}

/// Pose lookup over a shared keyframe sequence
#[derive(Debug, Clone)]
pub struct PlaybackInterpolator {
    sequence: Arc<KeyframeSequence>,
}

impl PlaybackInterpolator {
    pub fn new(sequence: Arc<KeyframeSequence>) -> Self {
        Self { sequence }
    }

    pub fn sequence(&self) -> &KeyframeSequence {
        &self.sequence
    }

    /// Locate the keyframes bracketing `koma`
    pub fn locate(&self, koma: u32) -> Result<Bracket> {
        if self.sequence.is_empty() {
            return Err(Error::EmptySequence);
        }

        let koma = koma as u64;
        let mut elapsed: u64 = 0;
        let mut previous: Option<(usize, &Keyframe)> = None;

        for (index, next) in self.sequence.iter().enumerate() {
            if elapsed + next.wait() as u64 >= koma {
                let Some((prev_index, prev)) = previous else {
                    return Ok(Bracket::First);
                };
                let weight = if prev.wait() == 0 {
                    1.0
                } else {
                    ((koma - elapsed) as f32 / prev.wait() as f32).clamp(0.0, 1.0)
                };
                return Ok(Bracket::Between {
                    previous: prev_index,
                    next: index,
                    weight,
                });
            }
            elapsed += next.wait() as u64;
            previous = Some((index, next));
        }

        Ok(Bracket::Last)
    }

    /// Interpolated pose at `koma` komas after playback start
    pub fn pose_at_tick(&self, koma: u32) -> Result<Pose> {
        let pose = match self.locate(koma)? {
            Bracket::First => self.sequence.first().map(Keyframe::pose),
            Bracket::Last => self.sequence.last().map(Keyframe::pose),
            Bracket::Between {
                previous,
                next,
                weight,
            } => match (self.sequence.get(previous), self.sequence.get(next)) {
                (Some(prev), Some(next)) => Some(interpolate(prev, next, weight)),
                _ => None,
            },
        };
        pose.ok_or(Error::EmptySequence)
    }

    /// Keyframe pose by position, no interpolation
    pub fn pose_at_frame_index(&self, index: usize) -> Option<Pose> {
        self.sequence.get(index).map(Keyframe::pose)
    }

    /// Total duration in komas
    pub fn duration(&self) -> u64 {
        self.sequence.total_duration()
    }
}

/// Blend two keyframes joint by joint
///
/// A joint missing from `next` keeps its angle from `previous`.
pub fn interpolate(previous: &Keyframe, next: &Keyframe, weight: f32) -> Pose {
    previous
        .servos()
        .iter()
        .map(|prev| {
            let angle = match next.servo(prev.id) {
                Some(n) => lerp_angle(prev.angle(), n.angle(), weight),
                None => prev.angle(),
            };
            (prev.id, angle)
        })
        .collect()
}

/// Interpolate between two angles (degrees) along the shortest arc
///
/// `lerp_angle(170.0, -170.0, 0.5)` is `180.0`, not `0.0`.
pub fn lerp_angle(from: JointAngle, to: JointAngle, t: f32) -> JointAngle {
    let mut delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    from + delta * t.clamp(0.0, 1.0)
}
