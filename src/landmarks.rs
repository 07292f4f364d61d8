//! Per-frame landmark buffer supplied by the external perception service.
//!
//! Landmarks arrive once per processed frame in pixel space, keyed by the
//! detector's semantic index. The core only ever reads them.

use crate::hand_orientation::HandSide;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A detected keypoint in pixel coordinates with an optional depth proxy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal pixel coordinate
    pub x: f64,
    /// Vertical pixel coordinate
    pub y: f64,
    /// Unitless depth proxy, already scaled from the normalized estimate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
}

impl Landmark {
    /// Create a 2D landmark without depth
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Create a landmark with a depth proxy
    #[must_use]
    pub const fn with_depth(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }

    /// Convert detector output in image fractions to pixel space.
    ///
    /// `nz` is the detector's relative depth; it is multiplied by
    /// `depth_scale` so it lives on roughly the same scale as the pixels.
    #[must_use]
    pub fn from_normalized(nx: f64, ny: f64, nz: f64, width: u32, height: u32, depth_scale: f64) -> Self {
        Self {
            x: nx * f64::from(width),
            y: ny * f64::from(height),
            z: Some(nz * depth_scale),
        }
    }

    /// Depth proxy, zero when the detector did not provide one
    #[must_use]
    pub fn depth(&self) -> f64 {
        self.z.unwrap_or(0.0)
    }

    /// Whether all present coordinates are finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.map_or(true, f64::is_finite)
    }
}

/// Landmarks of one tracked subject keyed by semantic index
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet {
    points: BTreeMap<usize, Landmark>,
}

impl LandmarkSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a dense list where the position is the index
    #[must_use]
    pub fn from_dense(points: &[Landmark]) -> Self {
        Self {
            points: points.iter().copied().enumerate().collect(),
        }
    }

    /// Insert or replace the landmark at `index`
    pub fn insert(&mut self, index: usize, landmark: Landmark) {
        self.points.insert(index, landmark);
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(&index)
    }

    /// Look up several indices at once; `None` if any is missing or non-finite
    #[must_use]
    pub fn select<const N: usize>(&self, indices: &[usize; N]) -> Option<[Landmark; N]> {
        let mut out = [Landmark::new(0.0, 0.0); N];
        for (slot, &index) in out.iter_mut().zip(indices) {
            let landmark = self.points.get(&index).filter(|lm| lm.is_finite())?;
            *slot = *landmark;
        }
        Some(out)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Landmark)> {
        self.points.iter().map(|(&index, landmark)| (index, landmark))
    }
}

impl FromIterator<(usize, Landmark)> for LandmarkSet {
    fn from_iter<T: IntoIterator<Item = (usize, Landmark)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// One hand as reported by the hand detector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedHand {
    /// Handedness label, when the detector provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handedness: Option<HandSide>,
    /// The hand's keypoints
    pub landmarks: LandmarkSet,
}

impl DetectedHand {
    #[must_use]
    pub fn new(landmarks: LandmarkSet) -> Self {
        Self {
            handedness: None,
            landmarks,
        }
    }

    #[must_use]
    pub fn with_handedness(mut self, side: HandSide) -> Self {
        self.handedness = Some(side);
        self
    }
}

/// Everything the perception service produced for one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameLandmarks {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Face landmarks, absent when no face was detected
    #[serde(default)]
    pub face: Option<LandmarkSet>,
    /// Hands in detection order
    #[serde(default)]
    pub hands: Vec<DetectedHand>,
}

impl FrameLandmarks {
    /// An empty frame: nothing detected
    #[must_use]
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            face: None,
            hands: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_face(mut self, face: LandmarkSet) -> Self {
        self.face = Some(face);
        self
    }

    #[must_use]
    pub fn with_hand(mut self, hand: DetectedHand) -> Self {
        self.hands.push(hand);
        self
    }

    /// Whether the frame carries no detections at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.face.as_ref().map_or(true, LandmarkSet::is_empty) && self.hands.is_empty()
    }

    /// Reinterpret every landmark as detector-normalized output and convert
    /// it with [`Landmark::from_normalized`]
    #[must_use]
    pub fn into_pixels(self, depth_scale: f64) -> Self {
        let (width, height) = (self.width, self.height);
        let convert = |set: LandmarkSet| -> LandmarkSet {
            set.iter()
                .map(|(index, lm)| (index, Landmark::from_normalized(lm.x, lm.y, lm.depth(), width, height, depth_scale)))
                .collect()
        };

        Self {
            width,
            height,
            face: self.face.map(convert),
            hands: self
                .hands
                .into_iter()
                .map(|hand| DetectedHand {
                    handedness: hand.handedness,
                    landmarks: convert(hand.landmarks),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_normalized() {
        let lm = Landmark::from_normalized(0.5, 0.25, -0.01, 640, 480, 3000.0);
        assert_eq!(lm.x, 320.0);
        assert_eq!(lm.y, 120.0);
        assert!((lm.depth() + 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_select_requires_all_indices() {
        let mut set = LandmarkSet::new();
        set.insert(1, Landmark::new(1.0, 2.0));
        set.insert(33, Landmark::new(3.0, 4.0));

        let picked = set.select(&[33, 1]).unwrap();
        assert_eq!(picked[0], Landmark::new(3.0, 4.0));
        assert_eq!(picked[1], Landmark::new(1.0, 2.0));

        assert!(set.select(&[1, 33, 263]).is_none());
    }

    #[test]
    fn test_select_rejects_non_finite() {
        let mut set = LandmarkSet::new();
        set.insert(0, Landmark::new(f64::NAN, 1.0));
        assert!(set.select(&[0]).is_none());
    }

    #[test]
    fn test_frame_json_shape() {
        let json = r#"{
            "width": 640,
            "height": 480,
            "face": {"1": {"x": 320.0, "y": 240.0, "z": -12.0}},
            "hands": [{"handedness": "right", "landmarks": {"0": {"x": 1.0, "y": 2.0}}}]
        }"#;
        let frame: FrameLandmarks = serde_json::from_str(json).unwrap();
        assert_eq!(frame.width, 640);
        let face = frame.face.as_ref().unwrap();
        assert_eq!(face.get(1).unwrap().z, Some(-12.0));
        assert_eq!(frame.hands[0].handedness, Some(HandSide::Right));
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_empty_frame() {
        let frame = FrameLandmarks::empty(640, 480);
        assert!(frame.is_empty());
        let json = r#"{"width": 640, "height": 480}"#;
        let parsed: FrameLandmarks = serde_json::from_str(json).unwrap();
        assert_eq!(parsed, frame);
    }
}
