//! Rotation conversions: axis-angle to matrix and RQ decomposition into Euler angles.

use nalgebra::{Matrix3, Rotation3, Vector3};

/// Convert a rotation vector (axis scaled by angle in radians) to a rotation
/// matrix via the matrix exponential
#[must_use]
pub fn rodrigues(rotation_vector: &Vector3<f64>) -> Matrix3<f64> {
    Rotation3::from_scaled_axis(*rotation_vector).into_inner()
}

/// Inverse of [`rodrigues`]: rotation matrix to rotation vector.
///
/// The input is projected onto the nearest rotation first.
#[must_use]
pub fn rotation_vector(matrix: &Matrix3<f64>) -> Vector3<f64> {
    Rotation3::from_matrix(matrix).scaled_axis()
}

/// Result of decomposing `M = R * Q` with `R` upper triangular and
/// `Q = Qz^T * Qy^T * Qx^T`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RqDecomposition {
    /// Upper triangular factor
    pub r: Matrix3<f64>,
    /// Orthogonal factor
    pub q: Matrix3<f64>,
    /// Givens rotation about x
    pub qx: Matrix3<f64>,
    /// Givens rotation about y
    pub qy: Matrix3<f64>,
    /// Givens rotation about z
    pub qz: Matrix3<f64>,
    /// Rotation angles about x, y and z in degrees
    pub euler_degrees: Vector3<f64>,
}

/// RQ decomposition of a 3x3 matrix by three Givens rotations.
///
/// The x rotation zeroes `m[2][1]`, the y rotation zeroes `m[2][0]` and the z
/// rotation zeroes `m[1][0]`. For a rotation matrix built as
/// `Rz(c) * Ry(b) * Rx(a)` the Euler angles come out as `(a, b, c)` as long
/// as `|b| < 90°`. The decomposition is not unique: near ±90° about y it hits
/// gimbal lock and the angles jump. Callers get those discontinuities as-is.
#[must_use]
pub fn rq_decompose_3x3(m: &Matrix3<f64>) -> RqDecomposition {
    let (c, s) = givens(m[(2, 2)], m[(2, 1)]);
    let qx = Matrix3::new(1.0, 0.0, 0.0, 0.0, c, s, 0.0, -s, c);
    let r = m * qx;

    let (c, s) = givens(r[(2, 2)], -r[(2, 0)]);
    let mut qy = Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c);
    let m1 = r * qy;

    let (c, s) = givens(m1[(1, 1)], m1[(1, 0)]);
    let mut qz = Matrix3::new(c, s, 0.0, -s, c, 0.0, 0.0, 0.0, 1.0);
    let mut r = m1 * qz;

    // Keep the first two diagonal entries of R positive by moving a 180°
    // rotation from R into Q.
    if r[(0, 0)] < 0.0 {
        if r[(1, 1)] < 0.0 {
            // 180° about z
            r[(0, 0)] *= -1.0;
            r[(0, 1)] *= -1.0;
            r[(1, 1)] *= -1.0;

            qz[(0, 0)] *= -1.0;
            qz[(0, 1)] *= -1.0;
            qz[(1, 0)] *= -1.0;
            qz[(1, 1)] *= -1.0;
        } else {
            // 180° about y
            r[(0, 0)] *= -1.0;
            r[(0, 2)] *= -1.0;
            r[(1, 0)] *= -1.0;
            r[(2, 2)] *= -1.0;

            qz = qz.transpose();

            qy[(0, 0)] *= -1.0;
            qy[(0, 2)] *= -1.0;
            qy[(2, 0)] *= -1.0;
            qy[(2, 2)] *= -1.0;
        }
    } else if r[(1, 1)] < 0.0 {
        // 180° about x
        r[(0, 1)] *= -1.0;
        r[(0, 2)] *= -1.0;
        r[(1, 1)] *= -1.0;
        r[(1, 2)] *= -1.0;
        r[(2, 2)] *= -1.0;

        qz = qz.transpose();

        qy[(0, 0)] *= -1.0;
        qy[(0, 2)] *= -1.0;
        qy[(2, 0)] *= -1.0;
        qy[(2, 2)] *= -1.0;
    }

    let euler_degrees = Vector3::new(
        signed_angle(qx[(1, 1)], qx[(1, 2)]),
        signed_angle(qy[(0, 0)], qy[(2, 0)]),
        signed_angle(qz[(0, 0)], qz[(0, 1)]),
    );

    let q = qz.transpose() * qy.transpose() * qx.transpose();

    RqDecomposition {
        r,
        q,
        qx,
        qy,
        qz,
        euler_degrees,
    }
}

/// Cosine and sine of the Givens rotation for the pair `(c, s)`
fn givens(c: f64, s: f64) -> (f64, f64) {
    let z = 1.0 / (c * c + s * s + f64::EPSILON).sqrt();
    (c * z, s * z)
}

/// Angle in degrees recovered from a cosine entry and the sign of a sine entry
fn signed_angle(cos: f64, sin: f64) -> f64 {
    let magnitude = cos.clamp(-1.0, 1.0).acos().to_degrees();
    if sin >= 0.0 {
        magnitude
    } else {
        -magnitude
    }
}
