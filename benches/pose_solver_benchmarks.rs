//! Benchmarks for the head pose solve and rotation utilities

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::{Matrix3, Point3, Rotation3, Vector2, Vector3};
use pose_retarget::{
    camera::CameraModel,
    constants::REFERENCE_FACE_MODEL,
    pose_estimation::{CorrespondenceSet, PoseEstimator},
    utils::rotation::{rodrigues, rq_decompose_3x3},
};

fn project(camera: &CameraModel, rotation: &Matrix3<f64>, translation: &Vector3<f64>) -> CorrespondenceSet {
    let object = REFERENCE_FACE_MODEL.map(Point3::from);
    let image: Vec<_> = object
        .iter()
        .map(|p| {
            let c = rotation * p.coords + translation;
            camera.denormalize(&Vector2::new(c.x / c.z, c.y / c.z))
        })
        .collect();
    CorrespondenceSet::new(&image, &object).expect("six correspondences")
}

fn benchmark_pose_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("pose_solve");

    let camera = CameraModel::from_frame_size(640, 480).expect("valid frame size");
    let estimator = PoseEstimator::new();

    let frontal = project(&camera, &Matrix3::identity(), &Vector3::new(0.0, 0.0, 2500.0));
    let turned = project(
        &camera,
        &Rotation3::from_euler_angles(0.2, -0.5, 0.1).into_inner(),
        &Vector3::new(40.0, -30.0, 2500.0),
    );

    // Planar correspondences take the homography path
    let pixels: Vec<_> = frontal.image_points().to_vec();
    let flat: Vec<_> = pixels.iter().map(|p| Point3::new(p.x, p.y, 0.0)).collect();
    let planar = CorrespondenceSet::new(&pixels, &flat).expect("six correspondences");

    group.bench_function("reference_frontal", |b| {
        b.iter(|| black_box(estimator.estimate(black_box(&frontal), &camera).expect("solve")));
    });

    group.bench_function("reference_turned", |b| {
        b.iter(|| black_box(estimator.estimate(black_box(&turned), &camera).expect("solve")));
    });

    group.bench_function("planar", |b| {
        b.iter(|| black_box(estimator.estimate(black_box(&planar), &camera).expect("solve")));
    });

    group.finish();
}

fn benchmark_rotation(c: &mut Criterion) {
    let mut group = c.benchmark_group("rotation");

    let rvec = Vector3::new(0.1, -0.4, 0.25);
    let matrix = rodrigues(&rvec);

    group.bench_function("rodrigues", |b| {
        b.iter(|| black_box(rodrigues(black_box(&rvec))));
    });

    group.bench_function("rq_decompose", |b| {
        b.iter(|| black_box(rq_decompose_3x3(black_box(&matrix))));
    });

    group.finish();
}

criterion_group!(benches, benchmark_pose_solve, benchmark_rotation);
criterion_main!(benches);
