use crate::{
    camera::CameraModel,
    constants::{EPSILON, HEAD_LANDMARK_INDICES, NUM_HEAD_CORRESPONDENCES, PLANARITY_THRESHOLD, PNP_MAX_ITERATIONS, REFERENCE_FACE_MODEL},
    landmarks::LandmarkSet,
    utils::rotation::{rodrigues, rotation_vector, rq_decompose_3x3},
    Error, Result,
};
use nalgebra::{
    DMatrix, Matrix2x6, Matrix3, Matrix3x4, Matrix4, Matrix6, Point2, Point3, SymmetricEigen, Vector2, Vector3,
    Vector6,
};
use serde::{Deserialize, Serialize};

/// Head orientation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    /// Rotation about the camera x axis (nodding)
    pub pitch: f64,
    /// Rotation about the camera y axis (turning)
    pub yaw: f64,
    /// Rotation about the camera z axis (tilting)
    pub roll: f64,
}

impl PoseEstimate {
    #[must_use]
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// All three angles finite and strictly inside (-180, 180)
    #[must_use]
    pub fn is_bounded(&self) -> bool {
        [self.pitch, self.yaw, self.roll]
            .iter()
            .all(|angle| angle.is_finite() && angle.abs() < 180.0)
    }
}

/// Where the 3D half of the head correspondences comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadModel {
    /// Observed pixel positions lifted by the scaled depth proxy
    #[default]
    Observed,
    /// Fixed canonical face model
    Reference,
}

/// Six ordered `(2D, 3D)` pairs for the head pose solve
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceSet {
    image_points: [Point2<f64>; NUM_HEAD_CORRESPONDENCES],
    object_points: [Point3<f64>; NUM_HEAD_CORRESPONDENCES],
}

impl CorrespondenceSet {
    /// Build a set from matching image and object point lists
    ///
    /// # Errors
    ///
    /// Returns an error if either list does not hold exactly six points or
    /// the lists differ in length
    pub fn new(image_points: &[Point2<f64>], object_points: &[Point3<f64>]) -> Result<Self> {
        if image_points.len() != NUM_HEAD_CORRESPONDENCES || object_points.len() != NUM_HEAD_CORRESPONDENCES {
            return Err(Error::InvalidInput(format!(
                "Expected {NUM_HEAD_CORRESPONDENCES} correspondences, got {} image and {} object points",
                image_points.len(),
                object_points.len()
            )));
        }

        let mut set = Self {
            image_points: [Point2::origin(); NUM_HEAD_CORRESPONDENCES],
            object_points: [Point3::origin(); NUM_HEAD_CORRESPONDENCES],
        };
        set.image_points.copy_from_slice(image_points);
        set.object_points.copy_from_slice(object_points);
        Ok(set)
    }

    /// Pick the head correspondences out of a frame's face landmarks.
    ///
    /// Returns `None` when any of the six landmarks is missing, which the
    /// pipeline treats as "no head update this frame".
    #[must_use]
    pub fn from_face(face: &LandmarkSet, indices: &[usize; NUM_HEAD_CORRESPONDENCES], model: HeadModel) -> Option<Self> {
        let landmarks = face.select(indices)?;
        let image_points = landmarks.map(|lm| Point2::new(lm.x, lm.y));
        let object_points = match model {
            HeadModel::Observed => landmarks.map(|lm| Point3::new(lm.x, lm.y, lm.depth())),
            HeadModel::Reference => REFERENCE_FACE_MODEL.map(Point3::from),
        };
        Some(Self {
            image_points,
            object_points,
        })
    }

    /// Same as [`Self::from_face`] with the default face mesh indices
    #[must_use]
    pub fn from_face_default(face: &LandmarkSet, model: HeadModel) -> Option<Self> {
        Self::from_face(face, &HEAD_LANDMARK_INDICES, model)
    }

    #[must_use]
    pub const fn image_points(&self) -> &[Point2<f64>; NUM_HEAD_CORRESPONDENCES] {
        &self.image_points
    }

    #[must_use]
    pub const fn object_points(&self) -> &[Point3<f64>; NUM_HEAD_CORRESPONDENCES] {
        &self.object_points
    }
}

/// Full output of the perspective pose solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSolution {
    /// Axis-angle rotation (radians)
    pub rotation_vector: Vector3<f64>,
    /// Translation of the object origin in camera space
    pub translation: Vector3<f64>,
    /// Rotation matrix from the rotation vector
    pub rotation_matrix: Matrix3<f64>,
    /// Root-mean-square reprojection error in pixels
    pub reprojection_rms: f64,
    /// Refinement iterations performed
    pub iterations: usize,
}

/// Head pose estimator using a Perspective-n-Point solve
#[derive(Debug, Clone)]
pub struct PoseEstimator {
    max_iterations: usize,
    max_reprojection_error: Option<f64>,
}

impl Default for PoseEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rotation vector and translation packed as LM parameters
type Params = Vector6<f64>;

/// Relative step size at which the refinement stops
const STEP_TOLERANCE: f64 = 1e-12;

/// Reprojection error above which a second initial guess is tried
const FALLBACK_RMS_PIXELS: f64 = 2.0;

impl PoseEstimator {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_iterations: PNP_MAX_ITERATIONS,
            max_reprojection_error: None,
        }
    }

    /// Treat solves whose RMS reprojection error exceeds `pixels` as failed
    #[must_use]
    pub const fn with_max_reprojection_error(mut self, pixels: Option<f64>) -> Self {
        self.max_reprojection_error = pixels;
        self
    }

    /// Estimate head orientation in degrees
    ///
    /// # Errors
    ///
    /// Returns `Error::PoseSolve` if the solve does not converge
    pub fn estimate(&self, correspondences: &CorrespondenceSet, camera: &CameraModel) -> Result<PoseEstimate> {
        let solution = self.solve(correspondences, camera)?;
        Ok(Self::rotation_matrix_to_euler(&solution.rotation_matrix))
    }

    /// Decompose a rotation matrix into pitch, yaw and roll (degrees)
    #[must_use]
    pub fn rotation_matrix_to_euler(rotation_matrix: &Matrix3<f64>) -> PoseEstimate {
        let angles = rq_decompose_3x3(rotation_matrix).euler_degrees;
        PoseEstimate::new(angles.x, angles.y, angles.z)
    }

    /// Solve for the rotation and translation mapping the object points onto
    /// the image points under the camera intrinsics (no distortion)
    ///
    /// # Errors
    ///
    /// Returns `Error::PoseSolve` if:
    /// - The object points are degenerate (coincident or collinear)
    /// - The refinement produces non-finite parameters
    /// - Points end up behind the camera
    /// - The reprojection error exceeds the configured limit
    pub fn solve(&self, correspondences: &CorrespondenceSet, camera: &CameraModel) -> Result<PoseSolution> {
        let object = correspondences.object_points();
        let observed: Vec<Vector2<f64>> = correspondences
            .image_points()
            .iter()
            .map(|p| camera.normalize(p))
            .collect();

        if observed.iter().any(|p| !p.x.is_finite() || !p.y.is_finite())
            || object.iter().any(|p| !p.coords.iter().all(|v| v.is_finite()))
        {
            return Err(Error::PoseSolve("Non-finite correspondence".to_string()));
        }

        let initial = initial_pose(object, &observed)?;
        let focal = camera.focal_length();

        let mut best = self.refine(object, &observed, initial);
        let needs_fallback = match &best {
            Ok((_, cost, _)) => {
                let error = rms(*cost, object.len(), focal);
                error > FALLBACK_RMS_PIXELS || self.exceeds_limit(error)
            }
            Err(_) => true,
        };
        if needs_fallback {
            log::trace!("Primary PnP initialisation rejected, retrying from a fronto-parallel guess");
            let fallback = fronto_parallel_pose(object, &observed)
                .and_then(|guess| self.refine(object, &observed, guess));
            best = match (best, fallback) {
                (Ok(a), Ok(b)) => Ok(if b.1 < a.1 { b } else { a }),
                (Ok(a), Err(_)) => Ok(a),
                (Err(_), Ok(b)) => Ok(b),
                (Err(e), Err(_)) => Err(e),
            };
        }

        let (params, cost, iterations) = best?;
        let reprojection_rms = rms(cost, object.len(), focal);
        if self.exceeds_limit(reprojection_rms) {
            return Err(Error::PoseSolve(format!(
                "Reprojection error {reprojection_rms:.2}px exceeds limit"
            )));
        }

        let rotation_vector: Vector3<f64> = params.fixed_rows::<3>(0).into_owned();
        let translation: Vector3<f64> = params.fixed_rows::<3>(3).into_owned();
        let rotation_matrix = rodrigues(&rotation_vector);

        log::trace!(
            "PnP solved in {iterations} iterations, rms {reprojection_rms:.4}px, t = [{:.1}, {:.1}, {:.1}]",
            translation.x,
            translation.y,
            translation.z
        );

        Ok(PoseSolution {
            rotation_vector,
            translation,
            rotation_matrix,
            reprojection_rms,
            iterations,
        })
    }

    fn exceeds_limit(&self, reprojection_rms: f64) -> bool {
        !reprojection_rms.is_finite() || self.max_reprojection_error.is_some_and(|limit| reprojection_rms > limit)
    }

    /// Levenberg-Marquardt refinement of the reprojection error.
    ///
    /// Returns the parameters, the final cost in normalized units and the
    /// number of iterations.
    fn refine(&self, object: &[Point3<f64>], observed: &[Vector2<f64>], initial: Params) -> Result<(Params, f64, usize)> {
        let mut params = initial;
        let mut current =
            residuals(object, observed, &params).ok_or_else(|| Error::PoseSolve("Initial pose is degenerate".into()))?;
        let mut cost = sum_squares(&current);
        let mut lambda = 1e-3;
        let mut iterations = 0;

        while iterations < self.max_iterations {
            iterations += 1;

            let jacobians = jacobian(object, observed, &params)
                .ok_or_else(|| Error::PoseSolve("Jacobian evaluation hit a point at zero depth".into()))?;

            let mut jtj = Matrix6::zeros();
            let mut jtr = Vector6::zeros();
            for (j, r) in jacobians.iter().zip(&current) {
                jtj += j.transpose() * j;
                jtr += j.transpose() * r;
            }

            let mut accepted = false;
            let mut step_norm = 0.0;
            for _ in 0..10 {
                let damped = jtj + Matrix6::from_diagonal(&jtj.diagonal()) * lambda + Matrix6::identity() * EPSILON;
                let Some(step) = damped.cholesky().map(|c| c.solve(&(-jtr))) else {
                    lambda *= 10.0;
                    continue;
                };

                let candidate = params + step;
                match residuals_of(object, observed, &candidate) {
                    Some((r, c)) if c <= cost => {
                        params = candidate;
                        current = r;
                        cost = c;
                        lambda = (lambda / 10.0).max(1e-12);
                        step_norm = step.norm();
                        accepted = true;
                        break;
                    }
                    _ => lambda *= 10.0,
                }
            }

            if !accepted || step_norm < STEP_TOLERANCE * (params.norm() + STEP_TOLERANCE) || cost < EPSILON * EPSILON {
                break;
            }
        }

        if !params.iter().all(|v| v.is_finite()) {
            return Err(Error::PoseSolve("Refinement diverged".to_string()));
        }

        let rotation = rodrigues(&params.fixed_rows::<3>(0).into_owned());
        let translation: Vector3<f64> = params.fixed_rows::<3>(3).into_owned();
        if object.iter().any(|p| (rotation * p.coords + translation).z <= 0.0) {
            return Err(Error::PoseSolve("Solution places points behind the camera".to_string()));
        }

        Ok((params, cost, iterations))
    }
}

/// RMS reprojection error in pixels from a cost in normalized units
#[allow(clippy::cast_precision_loss)]
fn rms(cost: f64, count: usize, focal: f64) -> f64 {
    (cost / count.max(1) as f64).sqrt() * focal
}

fn sum_squares(residuals: &[Vector2<f64>]) -> f64 {
    residuals.iter().map(Vector2::norm_squared).sum()
}

/// Project with the packed parameters; `None` if a point sits at zero depth
fn residuals(object: &[Point3<f64>], observed: &[Vector2<f64>], params: &Params) -> Option<Vec<Vector2<f64>>> {
    let rotation = rodrigues(&params.fixed_rows::<3>(0).into_owned());
    let translation: Vector3<f64> = params.fixed_rows::<3>(3).into_owned();

    object
        .iter()
        .zip(observed)
        .map(|(p, obs)| {
            let cam = rotation * p.coords + translation;
            if cam.z.abs() < EPSILON {
                None
            } else {
                Some(Vector2::new(cam.x / cam.z, cam.y / cam.z) - obs)
            }
        })
        .collect()
}

fn residuals_of(object: &[Point3<f64>], observed: &[Vector2<f64>], params: &Params) -> Option<(Vec<Vector2<f64>>, f64)> {
    let r = residuals(object, observed, params)?;
    let cost = sum_squares(&r);
    cost.is_finite().then_some((r, cost))
}

/// Per-point 2x6 Jacobians by central differences
fn jacobian(object: &[Point3<f64>], observed: &[Vector2<f64>], params: &Params) -> Option<Vec<Matrix2x6<f64>>> {
    const STEP: f64 = 1e-7;
    let mut jacobians = vec![Matrix2x6::zeros(); object.len()];

    for k in 0..6 {
        let mut plus = *params;
        let mut minus = *params;
        let h = STEP * params[k].abs().max(1.0);
        plus[k] += h;
        minus[k] -= h;

        let rp = residuals(object, observed, &plus)?;
        let rm = residuals(object, observed, &minus)?;
        for (j, (a, b)) in jacobians.iter_mut().zip(rp.iter().zip(&rm)) {
            j.set_column(k, &((a - b) / (2.0 * h)));
        }
    }

    Some(jacobians)
}

fn pack(rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> Params {
    let r = rotation_vector(rotation);
    Params::new(r.x, r.y, r.z, translation.x, translation.y, translation.z)
}

#[allow(clippy::cast_precision_loss)]
fn centroid(points: &[Point3<f64>]) -> Vector3<f64> {
    points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords) / points.len() as f64
}

/// Initial pose: homography for planar objects, DLT otherwise
fn initial_pose(object: &[Point3<f64>], observed: &[Vector2<f64>]) -> Result<Params> {
    let center = centroid(object);
    let mut covariance = Matrix3::zeros();
    for p in object {
        let d = p.coords - center;
        covariance += d * d.transpose();
    }

    let eigen = SymmetricEigen::new(covariance);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));
    let (largest, middle, smallest) = (
        eigen.eigenvalues[order[0]],
        eigen.eigenvalues[order[1]],
        eigen.eigenvalues[order[2]],
    );

    if largest <= EPSILON || middle <= EPSILON * largest {
        return Err(Error::PoseSolve("Object points are coincident or collinear".to_string()));
    }

    if smallest <= PLANARITY_THRESHOLD * middle {
        // Rows of the basis are the in-plane axes followed by the normal
        let mut basis = Matrix3::from_rows(&[
            eigen.eigenvectors.column(order[0]).transpose(),
            eigen.eigenvectors.column(order[1]).transpose(),
            eigen.eigenvectors.column(order[2]).transpose(),
        ]);
        if basis.determinant() < 0.0 {
            basis.row_mut(2).neg_mut();
        }
        planar_pose(object, observed, &basis, &center)
    } else {
        dlt_pose(object, observed)
    }
}

/// Unit vector minimising `|A x|`, with `A` padded to at least square
fn null_vector(a: DMatrix<f64>) -> Result<Vec<f64>> {
    let svd = a.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| Error::PoseSolve("SVD did not produce right singular vectors".to_string()))?;
    let (index, _) = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .ok_or_else(|| Error::PoseSolve("SVD produced no singular values".to_string()))?;
    Ok(v_t.row(index).iter().copied().collect())
}

/// Nearest proper rotation to `m`
fn orthonormalize(m: &Matrix3<f64>) -> Result<Matrix3<f64>> {
    let svd = m.svd(true, true);
    let (Some(mut u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(Error::PoseSolve("SVD failed while orthonormalizing".to_string()));
    };
    if (u * v_t).determinant() < 0.0 {
        u.column_mut(2).neg_mut();
    }
    Ok(u * v_t)
}

fn planar_pose(
    object: &[Point3<f64>],
    observed: &[Vector2<f64>],
    basis: &Matrix3<f64>,
    center: &Vector3<f64>,
) -> Result<Params> {
    let plane: Vec<Vector2<f64>> = object
        .iter()
        .map(|p| {
            let q = basis * (p.coords - center);
            Vector2::new(q.x, q.y)
        })
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let mean_distance = plane.iter().map(Vector2::norm).sum::<f64>() / plane.len() as f64;
    if mean_distance <= EPSILON {
        return Err(Error::PoseSolve("Planar object points have no extent".to_string()));
    }
    let s = std::f64::consts::SQRT_2 / mean_distance;

    let rows = (2 * plane.len()).max(9);
    let mut a = DMatrix::zeros(rows, 9);
    for (i, (q, obs)) in plane.iter().zip(observed).enumerate() {
        let (x, y) = (q.x * s, q.y * s);
        let (u, v) = (obs.x, obs.y);
        let r = 2 * i;
        for (c, value) in [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u].into_iter().enumerate() {
            a[(r, c)] = value;
        }
        for (c, value) in [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, -v].into_iter().enumerate() {
            a[(r + 1, c)] = value;
        }
    }

    let h = null_vector(a)?;
    let normalization = Matrix3::new(s, 0.0, 0.0, 0.0, s, 0.0, 0.0, 0.0, 1.0);
    let homography = Matrix3::from_row_slice(&h) * normalization;

    let h1: Vector3<f64> = homography.column(0).into_owned();
    let h2: Vector3<f64> = homography.column(1).into_owned();
    let h3: Vector3<f64> = homography.column(2).into_owned();

    let norm = (h1.norm() + h2.norm()) / 2.0;
    if norm <= EPSILON {
        return Err(Error::PoseSolve("Degenerate homography".to_string()));
    }
    let mut scale = 1.0 / norm;
    if h3.z * scale < 0.0 {
        scale = -scale;
    }

    let r1 = h1 * scale;
    let r2 = h2 * scale;
    let plane_rotation = orthonormalize(&Matrix3::from_columns(&[r1, r2, r1.cross(&r2)]))?;
    let plane_translation = h3 * scale;

    let rotation = plane_rotation * basis;
    let translation = plane_translation - rotation * center;
    Ok(pack(&rotation, &translation))
}

fn dlt_pose(object: &[Point3<f64>], observed: &[Vector2<f64>]) -> Result<Params> {
    let center = centroid(object);
    #[allow(clippy::cast_precision_loss)]
    let mean_distance = object.iter().map(|p| (p.coords - center).norm()).sum::<f64>() / object.len() as f64;
    let s = 3.0_f64.sqrt() / mean_distance;
    let normalization = Matrix4::new(
        s, 0.0, 0.0, -s * center.x,
        0.0, s, 0.0, -s * center.y,
        0.0, 0.0, s, -s * center.z,
        0.0, 0.0, 0.0, 1.0,
    );

    let rows = (2 * object.len()).max(12);
    let mut a = DMatrix::zeros(rows, 12);
    for (i, (p, obs)) in object.iter().zip(observed).enumerate() {
        let q = (p.coords - center) * s;
        let (x, y, z) = (q.x, q.y, q.z);
        let (u, v) = (obs.x, obs.y);
        let r = 2 * i;
        for (c, value) in [x, y, z, 1.0, 0.0, 0.0, 0.0, 0.0, -u * x, -u * y, -u * z, -u]
            .into_iter()
            .enumerate()
        {
            a[(r, c)] = value;
        }
        for (c, value) in [0.0, 0.0, 0.0, 0.0, x, y, z, 1.0, -v * x, -v * y, -v * z, -v]
            .into_iter()
            .enumerate()
        {
            a[(r + 1, c)] = value;
        }
    }

    let p = null_vector(a)?;
    let mut projection = Matrix3x4::from_row_slice(&p) * normalization;
    let mut m: Matrix3<f64> = projection.fixed_columns::<3>(0).into_owned();
    if m.determinant() < 0.0 {
        projection = -projection;
        m = -m;
    }

    let svd = m.svd(true, true);
    let (Some(u), Some(v_t)) = (svd.u, svd.v_t) else {
        return Err(Error::PoseSolve("SVD failed on the DLT rotation block".to_string()));
    };
    let scale = svd.singular_values.sum() / 3.0;
    if scale <= EPSILON {
        return Err(Error::PoseSolve("Degenerate DLT solution".to_string()));
    }

    let rotation = u * v_t;
    let translation: Vector3<f64> = projection.column(3).into_owned() / scale;
    Ok(pack(&rotation, &translation))
}

/// Identity rotation with the object centroid placed on the ray through the
/// image centroid, at the depth that matches the observed spread
#[allow(clippy::cast_precision_loss)]
fn fronto_parallel_pose(object: &[Point3<f64>], observed: &[Vector2<f64>]) -> Result<Params> {
    let center = centroid(object);
    let image_center = observed.iter().fold(Vector2::zeros(), |acc, p| acc + p) / observed.len() as f64;

    let object_spread = object
        .iter()
        .map(|p| {
            let d = p.coords - center;
            Vector2::new(d.x, d.y).norm()
        })
        .sum::<f64>();
    let image_spread = observed.iter().map(|p| (p - image_center).norm()).sum::<f64>();
    if image_spread <= EPSILON || object_spread <= EPSILON {
        return Err(Error::PoseSolve("Correspondences have no spread".to_string()));
    }

    let depth = object_spread / image_spread;
    let translation = Vector3::new(image_center.x * depth, image_center.y * depth, depth) - center;
    Ok(pack(&Matrix3::identity(), &translation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Landmark;
    use nalgebra::Rotation3;

    fn project(
        camera: &CameraModel,
        rotation: &Matrix3<f64>,
        translation: &Vector3<f64>,
        points: &[Point3<f64>],
    ) -> Vec<Point2<f64>> {
        points
            .iter()
            .map(|p| {
                let c = rotation * p.coords + translation;
                camera.denormalize(&Vector2::new(c.x / c.z, c.y / c.z))
            })
            .collect()
    }

    #[test]
    fn test_euler_angle_conversion() {
        let angles = PoseEstimator::rotation_matrix_to_euler(&Matrix3::identity());
        assert!(angles.pitch.abs() < 1e-6);
        assert!(angles.yaw.abs() < 1e-6);
        assert!(angles.roll.abs() < 1e-6);
    }

    #[test]
    fn test_correspondence_count_enforced() {
        let image = vec![Point2::new(0.0, 0.0); 5];
        let object = vec![Point3::new(0.0, 0.0, 0.0); 6];
        assert!(CorrespondenceSet::new(&image, &object).is_err());

        let image = vec![Point2::new(0.0, 0.0); 6];
        assert!(CorrespondenceSet::new(&image, &object).is_ok());
    }

    #[test]
    fn test_from_face_requires_all_landmarks() {
        let mut face = LandmarkSet::new();
        for (i, &index) in HEAD_LANDMARK_INDICES.iter().enumerate().take(5) {
            face.insert(index, Landmark::with_depth(i as f64, i as f64, 0.0));
        }
        assert!(CorrespondenceSet::from_face_default(&face, HeadModel::Observed).is_none());

        face.insert(HEAD_LANDMARK_INDICES[5], Landmark::new(10.0, 20.0));
        let set = CorrespondenceSet::from_face_default(&face, HeadModel::Observed).unwrap();
        assert_eq!(set.image_points()[5], Point2::new(10.0, 20.0));
        assert_eq!(set.object_points()[5], Point3::new(10.0, 20.0, 0.0));
    }

    #[test]
    fn test_planar_identity_solve() {
        let camera = CameraModel::from_frame_size(640, 480).unwrap();
        let pixels = [
            Point2::new(320.0, 250.0),
            Point2::new(270.0, 200.0),
            Point2::new(370.0, 200.0),
            Point2::new(285.0, 300.0),
            Point2::new(355.0, 300.0),
            Point2::new(320.0, 340.0),
        ];
        let object: Vec<Point3<f64>> = pixels.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
        let set = CorrespondenceSet::new(&pixels, &object).unwrap();

        let solution = PoseEstimator::new().solve(&set, &camera).unwrap();
        assert!(solution.rotation_vector.norm() < 1e-6);
        assert!((solution.translation - Vector3::new(-320.0, -240.0, 640.0)).norm() < 1e-3);
        assert!(solution.reprojection_rms < 1e-6);
    }

    #[test]
    fn test_non_planar_recovers_rotation() {
        let camera = CameraModel::from_frame_size(640, 480).unwrap();
        let object = REFERENCE_FACE_MODEL.map(Point3::from);
        let truth = Rotation3::from_euler_angles(0.15, -0.3, 0.05).into_inner();
        let translation = Vector3::new(30.0, -20.0, 2500.0);
        let image = project(&camera, &truth, &translation, &object);

        let set = CorrespondenceSet::new(&image, &object).unwrap();
        let solution = PoseEstimator::new().solve(&set, &camera).unwrap();
        assert!((solution.rotation_matrix - truth).norm() < 1e-6);
        assert!((solution.translation - translation).norm() < 1e-2);
    }

    #[test]
    fn test_degenerate_points_fail() {
        let camera = CameraModel::from_frame_size(640, 480).unwrap();
        let image = vec![Point2::new(100.0, 100.0); 6];
        let object = vec![Point3::new(1.0, 2.0, 3.0); 6];
        let set = CorrespondenceSet::new(&image, &object).unwrap();
        assert!(matches!(PoseEstimator::new().solve(&set, &camera), Err(Error::PoseSolve(_))));
    }

    #[test]
    fn test_reprojection_limit() {
        let camera = CameraModel::from_frame_size(640, 480).unwrap();
        // Mirror-swapped image points cannot be explained by a rigid motion
        let object = REFERENCE_FACE_MODEL.map(Point3::from);
        let image = project(&camera, &Matrix3::identity(), &Vector3::new(0.0, 0.0, 2500.0), &object);
        let scrambled = [image[2], image[0], image[5], image[1], image[4], image[3]];
        let set = CorrespondenceSet::new(&scrambled, &object).unwrap();

        let strict = PoseEstimator::new().with_max_reprojection_error(Some(0.5));
        assert!(strict.solve(&set, &camera).is_err());
    }
}
