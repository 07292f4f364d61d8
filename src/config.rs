//! Configuration management for the pose retargeting application

use crate::{
    constants::{
        DEFAULT_DEPTH_SCALE, DEFAULT_FPS, DEFAULT_HAND_ALPHA, DEFAULT_HEAD_ALPHA, HAND_INDEX_MCP, HAND_WRIST,
        HEAD_LANDMARK_INDICES, NUM_HEAD_CORRESPONDENCES,
    },
    filters::FilterKind,
    hand_orientation::HandAssignment,
    joint_mapper::{JointTarget, Quantity},
    pipeline::PipelineOptions,
    pose_estimation::HeadModel,
    Error, Result,
};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, path::Path, time::Duration};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Camera and input scaling
    pub camera: CameraConfig,

    /// Head pose estimation
    pub head: HeadConfig,

    /// Hand orientation estimation
    pub hands: HandsConfig,

    /// Per-quantity smoothing
    pub smoothing: SmoothingConfig,

    /// Neutral pose calibration
    pub calibration: CalibrationConfig,

    /// Built-in skeleton
    pub skeleton: SkeletonConfig,

    /// Quantity to joint routing
    pub joints: Vec<JointTarget>,

    /// Run loop
    pub pipeline: PipelineConfig,
}

/// Camera and input scaling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Gain applied to normalized depth when converting input
    pub depth_scale: f64,

    /// Input coordinates are image fractions rather than pixels
    pub normalized_input: bool,
}

/// Head pose parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadConfig {
    pub enabled: bool,

    /// Face landmark indices: nose tip, eye corners, mouth corners, chin
    pub landmarks: [usize; NUM_HEAD_CORRESPONDENCES],

    /// Source of the 3D correspondence points
    pub model: HeadModel,

    /// Reject solves whose RMS reprojection error exceeds this many pixels
    pub max_reprojection_error: Option<f64>,
}

/// Hand orientation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandsConfig {
    pub enabled: bool,

    /// Hand landmark index of the wrist
    pub wrist: usize,

    /// Hand landmark index of the index finger base
    pub index_base: usize,

    /// How detected hands map to skeleton sides
    pub assignment: HandAssignment,
}

/// Smoothing configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Filter applied to every quantity
    pub filter: FilterKind,

    /// Alpha for head pitch, yaw and roll
    pub head_alpha: f64,

    /// Alpha for both hands
    pub hand_alpha: f64,

    /// Per-quantity alpha overrides
    pub overrides: BTreeMap<Quantity, f64>,
}

/// Neutral pose calibration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    /// Head estimates averaged into the neutral offset, 0 disables
    pub samples: usize,
}

/// Joints of the built-in in-memory skeleton
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkeletonConfig {
    pub joints: Vec<String>,
}

/// Run loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Target frame rate
    pub target_fps: f64,

    /// Sleep to hold the target frame rate
    pub paced: bool,

    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            head: HeadConfig::default(),
            hands: HandsConfig::default(),
            smoothing: SmoothingConfig::default(),
            calibration: CalibrationConfig::default(),
            skeleton: SkeletonConfig::default(),
            joints: JointTarget::default_targets(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            depth_scale: DEFAULT_DEPTH_SCALE,
            normalized_input: false,
        }
    }
}

impl Default for HeadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            landmarks: HEAD_LANDMARK_INDICES,
            model: HeadModel::default(),
            max_reprojection_error: None,
        }
    }
}

impl Default for HandsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wrist: HAND_WRIST,
            index_base: HAND_INDEX_MCP,
            assignment: HandAssignment::default(),
        }
    }
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            filter: FilterKind::default(),
            head_alpha: DEFAULT_HEAD_ALPHA,
            hand_alpha: DEFAULT_HAND_ALPHA,
            overrides: BTreeMap::new(),
        }
    }
}

impl Default for SkeletonConfig {
    fn default() -> Self {
        let mut joints: Vec<String> = Vec::new();
        for target in JointTarget::default_targets() {
            if !joints.contains(&target.joint) {
                joints.push(target.joint);
            }
        }
        Self { joints }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_FPS,
            paced: true,
            max_frames: None,
        }
    }
}

impl SmoothingConfig {
    /// Alpha used for a quantity, honouring overrides
    #[must_use]
    pub fn alpha_for(&self, quantity: Quantity) -> f64 {
        self.overrides.get(&quantity).copied().unwrap_or(if quantity.is_head() {
            self.head_alpha
        } else {
            self.hand_alpha
        })
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn options(&self) -> PipelineOptions {
        PipelineOptions {
            target_fps: self.paced.then_some(self.target_fps),
            max_frames: self.max_frames,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text; missing sections take defaults
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if the text is not a valid configuration
    pub fn from_yaml(content: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, self.to_yaml()?).map_err(|e| Error::IoError(e.to_string()))?;
        Ok(())
    }

    /// Serialize configuration to YAML text
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` if serialization fails
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `Error::ConfigError` describing the first invalid setting
    pub fn validate(&self) -> Result<()> {
        // Smoothing
        for quantity in Quantity::ALL {
            let alpha = self.smoothing.alpha_for(quantity);
            if !(alpha > 0.0 && alpha <= 1.0) {
                return Err(Error::ConfigError(format!(
                    "Smoothing alpha for {quantity} must be in (0, 1], got {alpha}"
                )));
            }
        }

        // Head
        let mut indices = self.head.landmarks.to_vec();
        indices.sort_unstable();
        indices.dedup();
        if indices.len() != NUM_HEAD_CORRESPONDENCES {
            return Err(Error::ConfigError(
                "Head landmark indices must be six distinct values".to_string(),
            ));
        }
        if let Some(limit) = self.head.max_reprojection_error {
            if !(limit.is_finite() && limit > 0.0) {
                return Err(Error::ConfigError(format!(
                    "Maximum reprojection error must be positive, got {limit}"
                )));
            }
        }

        // Hands
        if self.hands.wrist == self.hands.index_base {
            return Err(Error::ConfigError(
                "Wrist and index base must be different hand landmarks".to_string(),
            ));
        }

        // Camera
        if !(self.camera.depth_scale.is_finite() && self.camera.depth_scale > 0.0) {
            return Err(Error::ConfigError(format!(
                "Depth scale must be positive, got {}",
                self.camera.depth_scale
            )));
        }

        // Pipeline
        if !(self.pipeline.target_fps.is_finite() && self.pipeline.target_fps > 0.0) {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }
        if Duration::try_from_secs_f64(self.pipeline.target_fps.recip()).is_err() {
            return Err(Error::ConfigError(format!(
                "Target FPS {} is too low for a frame period",
                self.pipeline.target_fps
            )));
        }
        if self.pipeline.max_frames == Some(0) {
            return Err(Error::ConfigError("Frame limit must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Pose Retargeting Configuration

# Input scaling
camera:
  depth_scale: 3000.0
  normalized_input: false

# Head pose
head:
  enabled: true
  # nose tip, left eye outer, right eye outer, left mouth, right mouth, chin
  landmarks: [1, 33, 263, 61, 291, 199]
  model: observed
  max_reprojection_error: null

# Hand orientation
hands:
  enabled: true
  wrist: 0
  index_base: 5
  assignment: positional

# Smoothing
smoothing:
  filter: exponential
  head_alpha: 0.3
  hand_alpha: 0.5
  overrides: {}

# Neutral pose calibration (0 disables)
calibration:
  samples: 0

# Built-in skeleton
skeleton:
  joints:
    - Head
    - hand.L
    - f_index.01.L
    - hand.R
    - f_index.01.R

# Joint routing
joints:
  - { quantity: head_yaw, joint: Head, axis: heading, scale: 1.0, offset: 0.0 }
  - { quantity: head_pitch, joint: Head, axis: pitch, scale: 1.0, offset: 0.0 }
  - { quantity: head_roll, joint: Head, axis: roll, scale: 1.0, offset: 0.0 }
  - { quantity: left_hand, joint: hand.L, axis: heading, scale: 1.0, offset: 0.0 }
  - { quantity: left_hand, joint: f_index.01.L, axis: heading, scale: 1.2, offset: 0.0 }
  - { quantity: right_hand, joint: hand.R, axis: heading, scale: 1.0, offset: 0.0 }
  - { quantity: right_hand, joint: f_index.01.R, axis: heading, scale: 1.2, offset: 0.0 }

# Run loop
pipeline:
  target_fps: 30.0
  paced: true
  max_frames: null
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses_to_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        parsed.validate().unwrap();
    }

    #[test]
    fn test_missing_sections_get_defaults() {
        let parsed = Config::from_yaml("smoothing:\n  head_alpha: 0.2\n").unwrap();
        assert_eq!(parsed.joints, JointTarget::default_targets());
        assert_eq!(parsed.smoothing.head_alpha, 0.2);
        assert_eq!(parsed.smoothing.hand_alpha, DEFAULT_HAND_ALPHA);

        let empty = Config::from_yaml("").unwrap();
        assert_eq!(empty, Config::default());
    }

    #[test]
    fn test_alpha_overrides() {
        let mut config = Config::default();
        config.smoothing.overrides.insert(Quantity::HeadRoll, 0.9);
        assert_eq!(config.smoothing.alpha_for(Quantity::HeadRoll), 0.9);
        assert_eq!(config.smoothing.alpha_for(Quantity::HeadYaw), DEFAULT_HEAD_ALPHA);
        assert_eq!(config.smoothing.alpha_for(Quantity::LeftHand), DEFAULT_HAND_ALPHA);
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = Config::default();
        config.smoothing.head_alpha = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.head.landmarks = [1, 1, 263, 61, 291, 199];
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.target_fps = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.pipeline.max_frames = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.hands.index_base = config.hands.wrist;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_options() {
        let mut config = PipelineConfig::default();
        assert_eq!(config.options().target_fps, Some(DEFAULT_FPS));
        config.paced = false;
        config.max_frames = Some(10);
        let options = config.options();
        assert_eq!(options.target_fps, None);
        assert_eq!(options.max_frames, Some(10));
    }
}
