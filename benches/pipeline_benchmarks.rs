//! Benchmarks for whole-frame processing

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pose_retarget::{
    config::Config,
    constants::{HAND_INDEX_MCP, HAND_WRIST, HEAD_LANDMARK_INDICES},
    landmarks::{DetectedHand, FrameLandmarks, Landmark, LandmarkSet},
    pipeline::FramePipeline,
    session::Session,
    skeleton::InMemorySkeleton,
    source::FrameQueue,
};

fn frame() -> FrameLandmarks {
    let face: LandmarkSet = HEAD_LANDMARK_INDICES
        .iter()
        .zip([
            (320.0, 250.0, -60.0),
            (268.0, 198.0, 12.0),
            (372.0, 198.0, 12.0),
            (287.0, 302.0, -8.0),
            (353.0, 302.0, -8.0),
            (320.0, 345.0, -15.0),
        ])
        .map(|(&index, (x, y, z))| (index, Landmark::with_depth(x, y, z)))
        .collect();

    let hand = |wx: f64, ix: f64| {
        let mut set = LandmarkSet::new();
        set.insert(HAND_WRIST, Landmark::new(wx, 400.0));
        set.insert(HAND_INDEX_MCP, Landmark::new(ix, 360.0));
        DetectedHand::new(set)
    };

    FrameLandmarks::empty(640, 480)
        .with_face(face)
        .with_hand(hand(100.0, 120.0))
        .with_hand(hand(540.0, 520.0))
}

fn benchmark_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");

    let config = Config::default();
    let skeleton = InMemorySkeleton::new(config.skeleton.joints.clone()).expect("valid joints");
    let session = Session::new(&config, &skeleton).expect("valid config");
    let mut pipeline = FramePipeline::new(session, skeleton, FrameQueue::new(), config.pipeline.options());

    let full = frame();
    let empty = FrameLandmarks::empty(640, 480);

    group.bench_function("face_and_two_hands", |b| {
        b.iter(|| black_box(pipeline.process_frame(black_box(&full))));
    });

    group.bench_function("held_frame", |b| {
        b.iter(|| black_box(pipeline.process_frame(black_box(&empty))));
    });

    group.finish();
}

criterion_group!(benches, benchmark_pipeline);
criterion_main!(benches);
