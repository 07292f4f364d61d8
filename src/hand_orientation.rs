//! Hand orientation from two landmarks, with left/right mirroring.
//!
//! The in-plane rotation of a hand is the direction of the wrist to
//! index-finger-base vector. The right hand's angle is negated so both hands
//! drive a bilaterally symmetric skeleton the same way.

use crate::{
    constants::{HAND_INDEX_MCP, HAND_WRIST},
    landmarks::{DetectedHand, Landmark},
};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Which skeleton side a hand drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    /// Side for a hand by detection order: first is left, second is right
    #[must_use]
    pub const fn from_detection_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::Left),
            1 => Some(Self::Right),
            _ => None,
        }
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    /// Sign applied to the raw angle for this side
    #[must_use]
    pub const fn mirror_sign(self) -> f64 {
        match self {
            Self::Left => 1.0,
            Self::Right => -1.0,
        }
    }
}

/// The two landmarks of one hand used for orientation, tagged with a side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandSample {
    pub side: HandSide,
    pub wrist: Landmark,
    pub index_base: Landmark,
}

impl HandSample {
    #[must_use]
    pub const fn new(side: HandSide, wrist: Landmark, index_base: Landmark) -> Self {
        Self {
            side,
            wrist,
            index_base,
        }
    }

    /// Raw in-plane angle in degrees, `atan2(dy, dx)` of wrist to index base
    #[must_use]
    pub fn raw_angle(&self) -> f64 {
        let dx = self.index_base.x - self.wrist.x;
        let dy = self.index_base.y - self.wrist.y;
        dy.atan2(dx).to_degrees()
    }

    /// Angle after mirroring for the sample's side
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.side.mirror_sign() * self.raw_angle()
    }
}

/// How detected hands are mapped onto skeleton sides
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandAssignment {
    /// Detection order: first hand is left, second is right
    #[default]
    Positional,
    /// Detector handedness label, detection order when unlabelled
    Handedness,
    /// Keep each side on the hand whose wrist is nearest to where that side's
    /// wrist was last seen
    Nearest,
}

/// Assigns sides to the hands of each frame and builds their samples
#[derive(Debug, Clone, Default)]
pub struct HandOrientationEstimator {
    assignment: HandAssignment,
    wrist_index: usize,
    index_base_index: usize,
    last_left: Option<Vector2<f64>>,
    last_right: Option<Vector2<f64>>,
}

impl HandOrientationEstimator {
    #[must_use]
    pub fn new(assignment: HandAssignment) -> Self {
        Self::with_landmarks(assignment, HAND_WRIST, HAND_INDEX_MCP)
    }

    /// Use custom landmark indices for the wrist and the index finger base
    #[must_use]
    pub fn with_landmarks(assignment: HandAssignment, wrist_index: usize, index_base_index: usize) -> Self {
        Self {
            assignment,
            wrist_index,
            index_base_index,
            last_left: None,
            last_right: None,
        }
    }

    #[must_use]
    pub const fn assignment(&self) -> HandAssignment {
        self.assignment
    }

    /// Build at most one sample per side from the frame's hands.
    ///
    /// Hands missing either landmark are ignored. With positional assignment
    /// any hand beyond the second is ignored as well.
    pub fn samples(&mut self, hands: &[DetectedHand]) -> Vec<HandSample> {
        let points: Vec<Option<(Landmark, Landmark)>> = hands
            .iter()
            .map(|hand| {
                let [wrist, index_base] = hand.landmarks.select(&[self.wrist_index, self.index_base_index])?;
                Some((wrist, index_base))
            })
            .collect();

        let sides = match self.assignment {
            HandAssignment::Positional => positional_sides(hands.len()),
            HandAssignment::Handedness => labelled_sides(hands),
            HandAssignment::Nearest => self.nearest_sides(&points),
        };

        let mut samples: Vec<HandSample> = sides
            .into_iter()
            .zip(points)
            .filter_map(|(side, points)| {
                let side = side?;
                let (wrist, index_base) = points?;
                Some(HandSample::new(side, wrist, index_base))
            })
            .collect();

        // One sample per side; the earlier detection wins
        let mut seen = (false, false);
        samples.retain(|sample| {
            let flag = match sample.side {
                HandSide::Left => &mut seen.0,
                HandSide::Right => &mut seen.1,
            };
            !std::mem::replace(flag, true)
        });

        for sample in &samples {
            let wrist = Vector2::new(sample.wrist.x, sample.wrist.y);
            match sample.side {
                HandSide::Left => self.last_left = Some(wrist),
                HandSide::Right => self.last_right = Some(wrist),
            }
        }

        samples
    }

    fn nearest_sides(&self, points: &[Option<(Landmark, Landmark)>]) -> Vec<Option<HandSide>> {
        let wrists: Vec<Option<Vector2<f64>>> = points
            .iter()
            .map(|p| p.map(|(wrist, _)| Vector2::new(wrist.x, wrist.y)))
            .collect();

        let distance = |wrist: Option<Vector2<f64>>, last: Option<Vector2<f64>>| match (wrist, last) {
            (Some(w), Some(l)) => Some((w - l).norm()),
            _ => None,
        };

        match wrists.as_slice() {
            [single] => {
                let left = distance(*single, self.last_left);
                let right = distance(*single, self.last_right);
                let side = match (left, right) {
                    (Some(l), Some(r)) if r < l => HandSide::Right,
                    (None, Some(_)) => HandSide::Right,
                    _ => HandSide::Left,
                };
                vec![Some(side)]
            }
            [first, second, ..] => {
                let straight = distance(*first, self.last_left).zip(distance(*second, self.last_right));
                let swapped = distance(*first, self.last_right).zip(distance(*second, self.last_left));
                let mut sides = positional_sides(wrists.len());
                if let (Some((a, b)), Some((c, d))) = (straight, swapped) {
                    if c + d < a + b {
                        sides[0] = Some(HandSide::Right);
                        sides[1] = Some(HandSide::Left);
                    }
                }
                sides
            }
            [] => Vec::new(),
        }
    }

    /// Forget tracked wrist positions
    pub fn reset(&mut self) {
        self.last_left = None;
        self.last_right = None;
    }
}

fn positional_sides(count: usize) -> Vec<Option<HandSide>> {
    (0..count).map(HandSide::from_detection_index).collect()
}

fn labelled_sides(hands: &[DetectedHand]) -> Vec<Option<HandSide>> {
    if hands.iter().all(|hand| hand.handedness.is_some()) {
        hands.iter().map(|hand| hand.handedness).collect()
    } else {
        positional_sides(hands.len())
    }
}
