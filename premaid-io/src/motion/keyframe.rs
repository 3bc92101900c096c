//! Keyframe and pose types

use crate::protocol::{JointAngle, ServoId, ServoValue};
use std::collections::BTreeMap;

/// One servo entry of a keyframe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServoEntry {
    pub id: ServoId,
    pub value: ServoValue,
}

impl ServoEntry {
    pub fn new(id: ServoId, value: ServoValue) -> Self {
        Self { id, value }
    }

    /// Joint angle in degrees
    #[inline]
    pub fn angle(&self) -> JointAngle {
        self.value.to_angle()
    }
}

/// Raw header tokens of a motion frame, kept for inspection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame length token (0x50 for a full frame)
    pub length: u8,
    /// Command token (0x18)
    pub command: u8,
    /// Padding token (0x00)
    pub padding: u8,
}

/// One recorded pose plus the hold time before the next one
///
/// Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct Keyframe {
    header: FrameHeader,
    wait: u32,
    servos: Vec<ServoEntry>,
    checksum: u8,
}

impl Keyframe {
    pub fn new(header: FrameHeader, wait: u32, servos: Vec<ServoEntry>, checksum: u8) -> Self {
        Self {
            header,
            wait,
            servos,
            checksum,
        }
    }

    /// Hold duration in komas
    #[inline]
    pub fn wait(&self) -> u32 {
        self.wait
    }

    /// Servo entries in file order
    #[inline]
    pub fn servos(&self) -> &[ServoEntry] {
        &self.servos
    }

    /// Look up one servo by id
    pub fn servo(&self, id: ServoId) -> Option<&ServoEntry> {
        self.servos.iter().find(|s| s.id == id)
    }

    #[inline]
    pub fn header(&self) -> &FrameHeader {
        &self.header
    }

    /// Checksum token as stored in the file (not validated here)
    #[inline]
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// The keyframe's joint angles
    pub fn pose(&self) -> Pose {
        self.servos.iter().map(|s| (s.id, s.angle())).collect()
    }
}

/// Ordered keyframes; insertion order is playback order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyframeSequence {
    frames: Vec<Keyframe>,
}

impl KeyframeSequence {
    pub fn new(frames: Vec<Keyframe>) -> Self {
        Self { frames }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Keyframe> {
        self.frames.get(index)
    }

    pub fn first(&self) -> Option<&Keyframe> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&Keyframe> {
        self.frames.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keyframe> {
        self.frames.iter()
    }

    /// Sum of every keyframe's wait, in komas
    pub fn total_duration(&self) -> u64 {
        self.frames.iter().map(|f| f.wait as u64).sum()
    }
}

impl FromIterator<Keyframe> for KeyframeSequence {
    fn from_iter<T: IntoIterator<Item = Keyframe>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KeyframeSequence {
    type Item = &'a Keyframe;
    type IntoIter = std::slice::Iter<'a, Keyframe>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.iter()
    }
}

/// Receiver of joint angles (a renderer, a servo table, ...)
///
/// Implementations ignore ids they do not know.
pub trait PoseSink {
    fn apply_servo_angle(&mut self, servo_id: ServoId, angle: JointAngle);
}

/// Servo id to joint angle, iterated in ascending id order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    angles: BTreeMap<ServoId, JointAngle>,
}

impl Pose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: ServoId, angle: JointAngle) {
        self.angles.insert(id, angle);
    }

    pub fn get(&self, id: ServoId) -> Option<JointAngle> {
        self.angles.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ServoId, JointAngle)> + '_ {
        self.angles.iter().map(|(&id, &angle)| (id, angle))
    }

    /// Push every joint into a sink, once per joint
    pub fn apply_to<S: PoseSink + ?Sized>(&self, sink: &mut S) {
        for (id, angle) in self.iter() {
            sink.apply_servo_angle(id, angle);
        }
    }
}

impl FromIterator<(ServoId, JointAngle)> for Pose {
    fn from_iter<T: IntoIterator<Item = (ServoId, JointAngle)>>(iter: T) -> Self {
        Self {
            angles: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> FrameHeader {
        FrameHeader {
            length: 0x50,
            command: 0x18,
            padding: 0x00,
        }
    }

    #[test]
    fn test_keyframe_pose_angles() {
        let frame = Keyframe::new(
            header(),
            10,
            vec![
                ServoEntry::new(0x03, ServoValue::MAX),
                ServoEntry::new(0x02, ServoValue::CENTER),
            ],
            0,
        );
        let pose = frame.pose();
        assert_eq!(pose.get(0x02), Some(0.0));
        assert_eq!(pose.get(0x03), Some(135.0));
        // Pose iterates in id order regardless of file order
        let ids: Vec<_> = pose.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0x02, 0x03]);
    }

    #[test]
    fn test_total_duration() {
        let seq: KeyframeSequence = [10, 20, 255]
            .into_iter()
            .map(|w| Keyframe::new(header(), w, Vec::new(), 0))
            .collect();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.total_duration(), 285);
    }

    #[test]
    fn test_apply_to_sink() {
        struct Recorder(Vec<(ServoId, JointAngle)>);
        impl PoseSink for Recorder {
            fn apply_servo_angle(&mut self, servo_id: ServoId, angle: JointAngle) {
                self.0.push((servo_id, angle));
            }
        }

        let pose: Pose = [(0x05, 10.0), (0x02, -5.0)].into_iter().collect();
        let mut rec = Recorder(Vec::new());
        pose.apply_to(&mut rec);
        assert_eq!(rec.0, vec![(0x02, -5.0), (0x05, 10.0)]);
    }
}
