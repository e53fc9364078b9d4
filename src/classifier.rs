//! Finger-state classifier: which fingers are extended, and where the cursor is.
//!
//! No temporal smoothing happens here. Frame-to-frame noise is absorbed by the
//! mode arbiter (any count change breaks the stroke) and by the jump guard in
//! the stroke renderer.

use crate::landmarks::{Finger, HandLandmarks, HandReading};
use crate::types::{FrameSize, Point};

/// Extension thresholds in normalized image-fraction units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Thresholds {
    /// Thumb tip must be farther than this from its IP joint.
    pub thumb: f32,
    /// Other fingertips must sit at least this far above their PIP joint.
    pub finger: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            thumb: 0.08,
            finger: 0.02,
        }
    }
}

/// Set of extended fingers, one bit per [`Finger`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FingerSet(u8);

impl FingerSet {
    const fn bit(finger: Finger) -> u8 {
        1 << finger as u8
    }

    pub fn insert(&mut self, finger: Finger) {
        self.0 |= Self::bit(finger);
    }

    pub const fn contains(self, finger: Finger) -> bool {
        self.0 & Self::bit(finger) != 0
    }

    pub const fn len(self) -> u8 {
        self.0.count_ones() as u8
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Finger> {
        Finger::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Finger> for FingerSet {
    fn from_iter<I: IntoIterator<Item = Finger>>(iter: I) -> Self {
        let mut set = FingerSet::default();
        for finger in iter {
            set.insert(finger);
        }
        set
    }
}

/// Per-frame classification result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GestureReading {
    /// Always `extended.len()`; 0 when no hand was seen.
    pub extended_count: u8,
    pub extended: FingerSet,
    /// Present exactly when a hand was detected this frame.
    pub cursor: Option<Point>,
}

impl GestureReading {
    pub const NO_HAND: GestureReading = GestureReading {
        extended_count: 0,
        extended: FingerSet(0),
        cursor: None,
    };
}

/// Whether one finger passes its extension test.
///
/// The thumb folds sideways across the palm, so it is judged by tip-to-IP
/// distance. The other four are judged by the tip rising above the PIP joint
/// (smaller y, top-left origin).
pub fn is_extended(hand: &HandLandmarks, finger: Finger, thresholds: Thresholds) -> bool {
    let tip = hand.tip(finger);
    let joint = hand.second_joint(finger);
    match finger {
        Finger::Thumb => tip.distance(joint) > thresholds.thumb,
        _ => tip.y < joint.y - thresholds.finger,
    }
}

/// The set of extended fingers on one hand.
pub fn extended_fingers(hand: &HandLandmarks, thresholds: Thresholds) -> FingerSet {
    Finger::ALL
        .into_iter()
        .filter(|f| is_extended(hand, *f, thresholds))
        .collect()
}

/// Map the index fingertip into canvas pixels (truncating toward zero).
/// The anchor is clamped to one frame beyond each edge first.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn cursor_position(hand: &HandLandmarks, size: FrameSize) -> Point {
    let anchor = hand.cursor_anchor();
    Point::new(
        (anchor.x.clamp(-1.0, 2.0) * size.width as f32) as i32,
        (anchor.y.clamp(-1.0, 2.0) * size.height as f32) as i32,
    )
}

/// Classify one frame's detection into a finger count and cursor.
pub fn classify(reading: &HandReading, size: FrameSize, thresholds: Thresholds) -> GestureReading {
    match reading {
        HandReading::NoHand => GestureReading::NO_HAND,
        HandReading::Hand(hand) => {
            let extended = extended_fingers(hand, thresholds);
            GestureReading {
                extended_count: extended.len(),
                extended,
                cursor: Some(cursor_position(hand, size)),
            }
        }
    }
}
