//! Neutral head pose calibration.
//!
//! The first few successful head estimates are taken while the user faces the
//! camera. Their mean becomes the neutral offset subtracted from every later
//! estimate, which removes most of the bias the depth proxy introduces.

use crate::{pose_estimation::PoseEstimate, utils::{mean, wrap_degrees}};

/// Collects raw head poses and turns them into a neutral offset
#[derive(Debug, Clone)]
pub struct NeutralCalibration {
    target_samples: usize,
    samples: Vec<PoseEstimate>,
    offset: Option<PoseEstimate>,
}

/// Outcome of feeding one raw pose to the calibration
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStep {
    /// Still collecting; the pose must not be applied
    Collecting { collected: usize, required: usize },
    /// Calibrated pose ready for smoothing
    Ready(PoseEstimate),
}

impl NeutralCalibration {
    /// A calibration that averages `samples` poses; zero disables it
    #[must_use]
    pub fn new(samples: usize) -> Self {
        Self {
            target_samples: samples,
            samples: Vec::with_capacity(samples),
            offset: (samples == 0).then(PoseEstimate::default),
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.target_samples > 0
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.offset.is_some()
    }

    /// Neutral offset once collection has finished
    #[must_use]
    pub const fn offset(&self) -> Option<PoseEstimate> {
        self.offset
    }

    /// Feed one raw pose
    pub fn process(&mut self, raw: PoseEstimate) -> CalibrationStep {
        if let Some(offset) = self.offset {
            return CalibrationStep::Ready(PoseEstimate::new(
                wrap_degrees(raw.pitch - offset.pitch),
                wrap_degrees(raw.yaw - offset.yaw),
                wrap_degrees(raw.roll - offset.roll),
            ));
        }

        self.samples.push(raw);
        if self.samples.len() >= self.target_samples {
            let pitches: Vec<f64> = self.samples.iter().map(|p| p.pitch).collect();
            let yaws: Vec<f64> = self.samples.iter().map(|p| p.yaw).collect();
            let rolls: Vec<f64> = self.samples.iter().map(|p| p.roll).collect();
            let offset = PoseEstimate::new(
                mean(&pitches).unwrap_or_default(),
                mean(&yaws).unwrap_or_default(),
                mean(&rolls).unwrap_or_default(),
            );
            log::info!(
                "Neutral pose calibrated from {} samples: pitch {:.2}, yaw {:.2}, roll {:.2}",
                self.samples.len(),
                offset.pitch,
                offset.yaw,
                offset.roll
            );
            self.offset = Some(offset);
            self.samples.clear();
        }

        CalibrationStep::Collecting {
            collected: self.samples.len(),
            required: self.target_samples,
        }
    }

    /// Discard the offset and start collecting again
    pub fn restart(&mut self) {
        self.samples.clear();
        self.offset = (self.target_samples == 0).then(PoseEstimate::default);
        if self.is_enabled() {
            log::info!("Neutral pose calibration restarted ({} samples)", self.target_samples);
        }
    }
}
