//! Pinhole camera model derived from frame dimensions.

use crate::{constants::CAMERA_CENTER_FACTOR, Error, Result};
use nalgebra::{Matrix3, Point2, Vector2};

/// Intrinsics approximated from the frame size: focal length equals the frame
/// width, the principal point sits at the frame centre and there is no lens
/// distortion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraModel {
    width: u32,
    height: u32,
    focal_length: f64,
    center: Point2<f64>,
}

impl CameraModel {
    /// Create the camera model for a frame of the given size
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero
    pub fn from_frame_size(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidInput(format!(
                "Frame dimensions must be non-zero, got {width}x{height}"
            )));
        }

        let focal_length = f64::from(width);
        let center = Point2::new(
            f64::from(width) / CAMERA_CENTER_FACTOR,
            f64::from(height) / CAMERA_CENTER_FACTOR,
        );

        Ok(Self {
            width,
            height,
            focal_length,
            center,
        })
    }

    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub const fn focal_length(&self) -> f64 {
        self.focal_length
    }

    /// Principal point `(cx, cy)`
    #[must_use]
    pub const fn principal_point(&self) -> Point2<f64> {
        self.center
    }

    /// Whether this model was built for the given frame size
    #[must_use]
    pub const fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    /// The 3x3 intrinsic matrix `K`
    #[must_use]
    pub fn matrix(&self) -> Matrix3<f64> {
        let f = self.focal_length;
        Matrix3::new(f, 0.0, self.center.x, 0.0, f, self.center.y, 0.0, 0.0, 1.0)
    }

    /// Map a pixel to normalized image coordinates (`K^-1 * [u, v, 1]`)
    #[must_use]
    pub fn normalize(&self, pixel: &Point2<f64>) -> Vector2<f64> {
        (pixel - self.center) / self.focal_length
    }

    /// Map normalized image coordinates back to pixels
    #[must_use]
    pub fn denormalize(&self, normalized: &Vector2<f64>) -> Point2<f64> {
        self.center + normalized * self.focal_length
    }
}

/// Camera model cache, rebuilt only when the frame size changes
#[derive(Debug, Default)]
pub struct CameraCache {
    current: Option<CameraModel>,
}

impl CameraCache {
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Camera model for a frame of the given size
    ///
    /// # Errors
    ///
    /// Returns an error if either dimension is zero
    pub fn for_frame(&mut self, width: u32, height: u32) -> Result<CameraModel> {
        match self.current {
            Some(camera) if camera.matches(width, height) => Ok(camera),
            previous => {
                let camera = CameraModel::from_frame_size(width, height)?;
                if previous.is_some() {
                    log::info!("Frame size changed to {width}x{height}, rebuilding camera model");
                } else {
                    log::debug!("Camera model for {width}x{height}: f = {}", camera.focal_length());
                }
                self.current = Some(camera);
                Ok(camera)
            }
        }
    }

    /// Currently cached model, if any frame has been seen
    #[must_use]
    pub const fn current(&self) -> Option<CameraModel> {
        self.current
    }
}
