//! Face and hand orientation retargeting library.
//!
//! Landmarks tracked on a 2D video stream are turned into joint rotations of
//! a synthetic skeleton:
//! 1. Six face landmarks are matched to 3D points and a Perspective-n-Point
//!    solve recovers the head rotation, decomposed into pitch, yaw and roll
//! 2. Each hand's in-plane rotation comes from the wrist to index-finger-base
//!    direction, mirrored for the right hand
//! 3. Every angle stream is exponentially smoothed
//! 4. Joint targets route the smoothed angles onto skeleton joint axes with
//!    a scale and an offset
//!
//! # Examples
//!
//! ## Head pose from correspondences
//!
//! ```no_run
//! use pose_retarget::{camera::CameraModel, pose_estimation::{CorrespondenceSet, HeadModel, PoseEstimator}};
//! use pose_retarget::landmarks::{Landmark, LandmarkSet};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut face = LandmarkSet::new();
//! for (index, (x, y)) in [(1, (320.0, 250.0)), (33, (270.0, 200.0)), (263, (370.0, 200.0)),
//!                         (61, (285.0, 300.0)), (291, (355.0, 300.0)), (199, (320.0, 340.0))] {
//!     face.insert(index, Landmark::with_depth(x, y, 0.0));
//! }
//!
//! let camera = CameraModel::from_frame_size(640, 480)?;
//! if let Some(set) = CorrespondenceSet::from_face_default(&face, HeadModel::Observed) {
//!     let pose = PoseEstimator::new().estimate(&set, &camera)?;
//!     println!("Pitch: {:.2}°, Yaw: {:.2}°, Roll: {:.2}°", pose.pitch, pose.yaw, pose.roll);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Complete pipeline
//!
//! ```no_run
//! use pose_retarget::{
//!     config::Config,
//!     pipeline::FramePipeline,
//!     session::Session,
//!     skeleton::InMemorySkeleton,
//!     source::JsonLinesSource,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let skeleton = InMemorySkeleton::new(config.skeleton.joints.clone())?;
//! let session = Session::new(&config, &skeleton)?;
//! let source = JsonLinesSource::open("landmarks.jsonl")?;
//!
//! let mut pipeline = FramePipeline::new(session, skeleton, source, config.pipeline.options());
//! let summary = pipeline.run()?;
//! println!("{} frames, {} head updates", summary.frames, summary.head_updates);
//! println!("{:?}", pipeline.skeleton().rotation_of("Head"));
//! # Ok(())
//! # }
//! ```

/// Per-frame landmark buffer
pub mod landmarks;

/// Pinhole camera model derived from the frame size
pub mod camera;

/// Head pose estimation module using `PnP` algorithm
pub mod pose_estimation;

/// Signal filtering algorithms for smoothing angle streams
pub mod filters;

/// Hand rotation from wrist and index finger base
pub mod hand_orientation;

/// Skeleton interface and in-memory rig
pub mod skeleton;

/// Routing of angles onto joint axes
pub mod joint_mapper;

/// Neutral head pose calibration
pub mod calibration;

/// Cross-frame tracking state
pub mod session;

/// Frame-synchronous run loop
pub mod pipeline;

/// Landmark sources
pub mod source;

/// Rotation and angle utilities
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
