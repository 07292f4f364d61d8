//! Constants used throughout the application

/// Number of landmark correspondences used by the head pose solve
pub const NUM_HEAD_CORRESPONDENCES: usize = 6;

/// Face mesh index of the nose tip
pub const NOSE_TIP: usize = 1;
/// Face mesh index of the left eye outer corner
pub const LEFT_EYE_OUTER: usize = 33;
/// Face mesh index of the right eye outer corner
pub const RIGHT_EYE_OUTER: usize = 263;
/// Face mesh index of the left mouth corner
pub const LEFT_MOUTH_CORNER: usize = 61;
/// Face mesh index of the right mouth corner
pub const RIGHT_MOUTH_CORNER: usize = 291;
/// Face mesh index of the chin
pub const CHIN: usize = 199;

/// Head landmark indices in correspondence order
pub const HEAD_LANDMARK_INDICES: [usize; NUM_HEAD_CORRESPONDENCES] =
    [NOSE_TIP, LEFT_EYE_OUTER, RIGHT_EYE_OUTER, LEFT_MOUTH_CORNER, RIGHT_MOUTH_CORNER, CHIN];

/// Canonical 3D face model in correspondence order.
///
/// Image-aligned axes: x right, y down, z away from the camera, so a face
/// looking straight into the lens solves to the identity rotation.
pub const REFERENCE_FACE_MODEL: [[f64; 3]; NUM_HEAD_CORRESPONDENCES] = [
    [0.0, 0.0, 0.0],
    [-225.0, -170.0, 135.0],
    [225.0, -170.0, 135.0],
    [-150.0, 150.0, 125.0],
    [150.0, 150.0, 125.0],
    [0.0, 330.0, 65.0],
];

/// Hand landmark index of the wrist
pub const HAND_WRIST: usize = 0;
/// Hand landmark index of the index finger base (MCP joint)
pub const HAND_INDEX_MCP: usize = 5;

/// Gain applied to the detector's normalized depth estimate
pub const DEFAULT_DEPTH_SCALE: f64 = 3000.0;

/// Default frames per second assumption
pub const DEFAULT_FPS: f64 = 30.0;

/// Camera matrix center factor
pub const CAMERA_CENTER_FACTOR: f64 = 2.0;

/// Default filter parameters
pub const DEFAULT_EXPONENTIAL_ALPHA: f64 = 0.5;

/// Default smoothing factors
pub const DEFAULT_HEAD_ALPHA: f64 = 0.3;
pub const DEFAULT_HAND_ALPHA: f64 = 0.5;

/// Index finger joints follow the hand at this gain
pub const INDEX_FINGER_GAIN: f64 = 1.2;

/// Levenberg-Marquardt iteration cap for the pose refinement
pub const PNP_MAX_ITERATIONS: usize = 20;

/// Ratio of covariance eigenvalues below which object points count as planar
pub const PLANARITY_THRESHOLD: f64 = 1e-3;

/// Numeric precision epsilon
pub const EPSILON: f64 = 1e-10;
