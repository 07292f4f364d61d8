//! Per-run tracking state.
//!
//! A [`Session`] owns everything that survives from one frame to the next:
//! the camera cache, the pose estimator settings, one smoother per quantity,
//! hand identity tracking, the neutral calibration and the resolved joint
//! table together with the last value of every quantity.

use crate::{
    calibration::{CalibrationStep, NeutralCalibration},
    camera::CameraCache,
    config::Config,
    constants::NUM_HEAD_CORRESPONDENCES,
    filters::{filter_for, AngleFilter},
    hand_orientation::{HandOrientationEstimator, HandSample, HandSide},
    joint_mapper::{JointMapper, Quantity, QuantityValues},
    landmarks::{DetectedHand, LandmarkSet},
    pose_estimation::{CorrespondenceSet, HeadModel, PoseEstimate, PoseEstimator},
    skeleton::Skeleton,
    Result,
};
use std::collections::HashMap;

/// What happened to the head quantities on one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadUpdate {
    /// Smoothed pose after this frame's estimate
    Updated(PoseEstimate),
    /// Estimate consumed by the neutral pose calibration
    Calibrating { collected: usize, required: usize },
    /// No face, or a required landmark was missing
    NoLandmarks,
    /// The pose solve failed; the previous pose is held
    SolveFailed,
    /// Head tracking is turned off
    Disabled,
}

impl HeadUpdate {
    #[must_use]
    pub const fn is_updated(&self) -> bool {
        matches!(self, Self::Updated(_))
    }
}

/// Raw head measurement of one frame, before smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadEstimate {
    /// Calibrated raw pose
    Pose(PoseEstimate),
    /// No pose this frame; carries the outcome to report
    Unavailable(HeadUpdate),
}

/// Tracking state carried across frames
pub struct Session {
    camera: CameraCache,
    estimator: PoseEstimator,
    head_enabled: bool,
    head_indices: [usize; NUM_HEAD_CORRESPONDENCES],
    head_model: HeadModel,
    hands_enabled: bool,
    hands: HandOrientationEstimator,
    filters: HashMap<Quantity, Box<dyn AngleFilter>>,
    calibration: NeutralCalibration,
    mapper: JointMapper,
    values: QuantityValues,
}

impl Session {
    /// Build a session and resolve the configured joint targets.
    ///
    /// # Errors
    ///
    /// Fails before any frame is processed when the configuration is invalid,
    /// a smoothing alpha is outside `(0, 1]` or a target names a joint the
    /// skeleton does not have
    pub fn new<S: Skeleton + ?Sized>(config: &Config, skeleton: &S) -> Result<Self> {
        config.validate()?;

        let mut filters = HashMap::new();
        for quantity in Quantity::ALL {
            let alpha = config.smoothing.alpha_for(quantity);
            let filter = filter_for(config.smoothing.filter, alpha)?;
            log::debug!("{quantity}: {} (alpha {alpha})", filter.name());
            filters.insert(quantity, filter);
        }

        let mapper = JointMapper::resolve(&config.joints, skeleton)?;

        let estimator = PoseEstimator::new().with_max_reprojection_error(config.head.max_reprojection_error);
        let hands = HandOrientationEstimator::with_landmarks(
            config.hands.assignment,
            config.hands.wrist,
            config.hands.index_base,
        );

        log::info!(
            "Session ready: head {} ({:?} model), hands {} ({:?} assignment), calibration {} samples",
            if config.head.enabled { "on" } else { "off" },
            config.head.model,
            if config.hands.enabled { "on" } else { "off" },
            config.hands.assignment,
            config.calibration.samples
        );

        Ok(Self {
            camera: CameraCache::new(),
            estimator,
            head_enabled: config.head.enabled,
            head_indices: config.head.landmarks,
            head_model: config.head.model,
            hands_enabled: config.hands.enabled,
            hands,
            filters,
            calibration: NeutralCalibration::new(config.calibration.samples),
            mapper,
            values: QuantityValues::new(),
        })
    }

    /// Latest smoothed value of every quantity
    #[must_use]
    pub const fn values(&self) -> &QuantityValues {
        &self.values
    }

    #[must_use]
    pub const fn mapper(&self) -> &JointMapper {
        &self.mapper
    }

    #[must_use]
    pub const fn calibration(&self) -> &NeutralCalibration {
        &self.calibration
    }

    /// Estimate the head pose and run it through the neutral calibration.
    ///
    /// Nothing is smoothed or stored; feed the result to [`Self::smooth_head`].
    pub fn estimate_head(&mut self, face: Option<&LandmarkSet>, width: u32, height: u32) -> HeadEstimate {
        if !self.head_enabled {
            return HeadEstimate::Unavailable(HeadUpdate::Disabled);
        }

        let Some(correspondences) =
            face.and_then(|face| CorrespondenceSet::from_face(face, &self.head_indices, self.head_model))
        else {
            return HeadEstimate::Unavailable(HeadUpdate::NoLandmarks);
        };

        let raw = match self
            .camera
            .for_frame(width, height)
            .and_then(|camera| self.estimator.estimate(&correspondences, &camera))
        {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("Head pose unavailable, holding previous pose: {e}");
                return HeadEstimate::Unavailable(HeadUpdate::SolveFailed);
            }
        };

        match self.calibration.process(raw) {
            CalibrationStep::Collecting { collected, required } => {
                HeadEstimate::Unavailable(HeadUpdate::Calibrating { collected, required })
            }
            CalibrationStep::Ready(pose) => HeadEstimate::Pose(pose),
        }
    }

    /// Smooth a head estimate into the stored head quantities
    pub fn smooth_head(&mut self, estimate: HeadEstimate) -> HeadUpdate {
        match estimate {
            HeadEstimate::Unavailable(update) => update,
            HeadEstimate::Pose(pose) => {
                let smoothed = PoseEstimate::new(
                    self.smooth(Quantity::HeadPitch, pose.pitch),
                    self.smooth(Quantity::HeadYaw, pose.yaw),
                    self.smooth(Quantity::HeadRoll, pose.roll),
                );
                log::trace!(
                    "Head raw ({:.2}, {:.2}, {:.2}) smoothed ({:.2}, {:.2}, {:.2})",
                    pose.pitch,
                    pose.yaw,
                    pose.roll,
                    smoothed.pitch,
                    smoothed.yaw,
                    smoothed.roll
                );
                HeadUpdate::Updated(smoothed)
            }
        }
    }

    /// Estimate, calibrate and smooth the head pose in one step
    pub fn update_head(&mut self, face: Option<&LandmarkSet>, width: u32, height: u32) -> HeadUpdate {
        let estimate = self.estimate_head(face, width, height);
        self.smooth_head(estimate)
    }

    /// One raw sample per visible hand side, empty when hands are disabled
    pub fn estimate_hands(&mut self, hands: &[DetectedHand]) -> Vec<HandSample> {
        if !self.hands_enabled {
            return Vec::new();
        }
        self.hands.samples(hands)
    }

    /// Smooth hand samples into the stored hand quantities.
    ///
    /// Returns the sides that were updated; sides without a sample keep their
    /// previous value.
    pub fn smooth_hands(&mut self, samples: &[HandSample]) -> Vec<HandSide> {
        let mut updated = Vec::with_capacity(samples.len());
        for sample in samples {
            let quantity = match sample.side {
                HandSide::Left => Quantity::LeftHand,
                HandSide::Right => Quantity::RightHand,
            };
            let smoothed = self.smooth(quantity, sample.angle());
            log::trace!("{quantity}: raw {:.2} smoothed {smoothed:.2}", sample.angle());
            updated.push(sample.side);
        }
        updated
    }

    /// Estimate and smooth the rotation of each visible hand in one step
    pub fn update_hands(&mut self, hands: &[DetectedHand]) -> Vec<HandSide> {
        let samples = self.estimate_hands(hands);
        self.smooth_hands(&samples)
    }

    /// Write every quantity's latest value to the skeleton
    pub fn apply<S: Skeleton + ?Sized>(&self, skeleton: &mut S) -> usize {
        self.mapper.apply(&self.values, skeleton)
    }

    /// Start the neutral pose calibration over; head smoothing restarts too
    pub fn recalibrate(&mut self) {
        self.calibration.restart();
        for quantity in [Quantity::HeadPitch, Quantity::HeadYaw, Quantity::HeadRoll] {
            if let Some(filter) = self.filters.get_mut(&quantity) {
                filter.reset();
            }
        }
    }

    /// Forget all tracking history
    pub fn reset(&mut self) {
        for filter in self.filters.values_mut() {
            filter.reset();
        }
        self.hands.reset();
        self.calibration.restart();
        self.values = QuantityValues::new();
    }

    fn smooth(&mut self, quantity: Quantity, raw: f64) -> f64 {
        let value = match self.filters.get_mut(&quantity) {
            Some(filter) => filter.apply(raw),
            None => raw,
        };
        self.values.set(quantity, value);
        value
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("camera", &self.camera)
            .field("head_enabled", &self.head_enabled)
            .field("hands_enabled", &self.hands_enabled)
            .field("calibration", &self.calibration)
            .field("values", &self.values)
            .finish_non_exhaustive()
    }
}
