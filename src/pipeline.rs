//! Frame-synchronous retargeting loop.
//!
//! Each frame walks `Idle -> Acquire -> Estimate -> Smooth -> Apply -> Idle`.
//! Quantities without fresh landmarks skip estimation and smoothing and have
//! their held value re-applied. Only acquisition can end the loop with an
//! error; per-frame tracking problems never do.

use crate::{
    hand_orientation::HandSide,
    joint_mapper::QuantityValues,
    landmarks::FrameLandmarks,
    session::{HeadUpdate, Session},
    skeleton::Skeleton,
    source::LandmarkSource,
    Error, Result,
};
use serde::Serialize;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Stage of the per-frame state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Acquire,
    Estimate,
    Smooth,
    Apply,
}

/// Outcome of one processed frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Zero-based frame counter
    pub frame_index: u64,
    pub head: HeadUpdate,
    /// Hand sides that received a new sample
    pub hands_updated: Vec<HandSide>,
    /// Joints written to the skeleton
    pub joints_written: usize,
    /// Values applied this frame
    pub values: QuantityValues,
}

/// Totals over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub frames: u64,
    pub head_updates: u64,
    pub hand_updates: u64,
    pub solve_failures: u64,
    pub calibration_frames: u64,
    /// Frames the source could not deliver but did not end the run
    pub dropped_frames: u64,
}

impl RunSummary {
    fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        match report.head {
            HeadUpdate::Updated(_) => self.head_updates += 1,
            HeadUpdate::SolveFailed => self.solve_failures += 1,
            HeadUpdate::Calibrating { .. } => self.calibration_frames += 1,
            HeadUpdate::NoLandmarks | HeadUpdate::Disabled => {}
        }
        self.hand_updates += report.hands_updated.len() as u64;
    }
}

/// Loop pacing and limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineOptions {
    /// Frame rate the loop paces itself to; `None` runs as fast as frames arrive
    pub target_fps: Option<f64>,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            target_fps: Some(crate::constants::DEFAULT_FPS),
            max_frames: None,
        }
    }
}

impl PipelineOptions {
    fn frame_period(&self) -> Option<Duration> {
        self.target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .and_then(|fps| Duration::try_from_secs_f64(fps.recip()).ok())
    }
}

/// Drives a session from a landmark source onto a skeleton
pub struct FramePipeline<S, L> {
    session: Session,
    skeleton: S,
    source: L,
    options: PipelineOptions,
    state: PipelineState,
    frame_index: u64,
    stop: Arc<AtomicBool>,
}

impl<S: Skeleton, L: LandmarkSource> FramePipeline<S, L> {
    pub fn new(session: Session, skeleton: S, source: L, options: PipelineOptions) -> Self {
        Self {
            session,
            skeleton,
            source,
            options,
            state: PipelineState::Idle,
            frame_index: 0,
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag that ends [`Self::run`] before the next acquisition when set
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    #[must_use]
    pub const fn state(&self) -> PipelineState {
        self.state
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    #[must_use]
    pub const fn skeleton(&self) -> &S {
        &self.skeleton
    }

    /// Hand back the skeleton and the session
    pub fn into_parts(self) -> (Session, S) {
        (self.session, self.skeleton)
    }

    /// Run one frame's estimate, smooth and apply stages
    pub fn process_frame(&mut self, frame: &FrameLandmarks) -> FrameReport {
        self.transition(PipelineState::Estimate);
        let head = self.session.estimate_head(frame.face.as_ref(), frame.width, frame.height);
        let hands = self.session.estimate_hands(&frame.hands);

        self.transition(PipelineState::Smooth);
        let head = self.session.smooth_head(head);
        let hands_updated = self.session.smooth_hands(&hands);

        self.transition(PipelineState::Apply);
        let joints_written = self.session.apply(&mut self.skeleton);

        let report = FrameReport {
            frame_index: self.frame_index,
            head,
            hands_updated,
            joints_written,
            values: *self.session.values(),
        };
        self.frame_index += 1;
        self.transition(PipelineState::Idle);
        report
    }

    /// Pull frames until the source ends, the frame limit is reached or the
    /// stop flag is raised.
    ///
    /// A source error that is not fatal drops that frame and the loop goes on.
    ///
    /// # Errors
    ///
    /// Returns `Error::Acquisition` when the source fails fatally
    pub fn run(&mut self) -> Result<RunSummary> {
        self.run_with(|_, _| Ok(()))
    }

    /// Like [`Self::run`], calling `observer` after every applied frame
    ///
    /// # Errors
    ///
    /// Returns the first source or observer error
    pub fn run_with<F>(&mut self, mut observer: F) -> Result<RunSummary>
    where
        F: FnMut(&FrameReport, &S) -> Result<()>,
    {
        let period = self.options.frame_period();
        let mut summary = RunSummary::default();
        let started = Instant::now();

        log::info!(
            "Pipeline started{}",
            period.map_or_else(String::new, |p| format!(" at {:.1} fps", 1.0 / p.as_secs_f64()))
        );

        while !self.stop.load(Ordering::Relaxed) {
            if self.options.max_frames.is_some_and(|max| summary.frames >= max) {
                log::info!("Frame limit reached");
                break;
            }

            let tick = Instant::now();
            self.transition(PipelineState::Acquire);
            let frame = match self.source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::info!("Landmark stream ended");
                    self.transition(PipelineState::Idle);
                    break;
                }
                Err(e) if !e.is_fatal() => {
                    self.transition(PipelineState::Idle);
                    log::warn!("Dropping unreadable frame: {e}");
                    summary.dropped_frames += 1;
                    continue;
                }
                Err(e) => {
                    self.transition(PipelineState::Idle);
                    log::warn!("Acquisition failed, stopping pipeline: {e}");
                    return Err(match e {
                        Error::Acquisition(_) => e,
                        other => Error::Acquisition(other.to_string()),
                    });
                }
            };

            let report = self.process_frame(&frame);
            log::debug!(
                "Frame {}: head {:?}, hands {:?}, {} joints",
                report.frame_index,
                report.head,
                report.hands_updated,
                report.joints_written
            );
            summary.record(&report);
            observer(&report, &self.skeleton)?;

            if let Some(period) = period {
                let elapsed = tick.elapsed();
                if elapsed < period {
                    std::thread::sleep(period - elapsed);
                } else {
                    log::trace!("Frame {} overran its budget by {:?}", report.frame_index, elapsed - period);
                }
            }
        }

        log::info!(
            "Pipeline stopped after {} frames in {:.2}s ({} head updates, {} hand updates, {} solve failures, {} dropped)",
            summary.frames,
            started.elapsed().as_secs_f64(),
            summary.head_updates,
            summary.hand_updates,
            summary.solve_failures,
            summary.dropped_frames
        );
        Ok(summary)
    }

    fn transition(&mut self, next: PipelineState) {
        log::trace!("{:?} -> {next:?}", self.state);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        landmarks::{DetectedHand, Landmark, LandmarkSet},
        skeleton::InMemorySkeleton,
        source::FrameQueue,
    };

    struct FailingSource;

    impl LandmarkSource for FailingSource {
        fn next_frame(&mut self) -> Result<Option<FrameLandmarks>> {
            Err(Error::Io(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed")))
        }
    }

    /// Yields one unreadable frame, then whatever the queue holds
    struct FlakySource {
        failed: bool,
        queue: FrameQueue,
    }

    impl LandmarkSource for FlakySource {
        fn next_frame(&mut self) -> Result<Option<FrameLandmarks>> {
            if !self.failed {
                self.failed = true;
                return Err(Error::InvalidInput("truncated frame".to_string()));
            }
            self.queue.next_frame()
        }
    }

    fn unpaced() -> PipelineOptions {
        PipelineOptions {
            target_fps: None,
            max_frames: None,
        }
    }

    fn pipeline<L: LandmarkSource>(source: L) -> FramePipeline<InMemorySkeleton, L> {
        let config = Config::default();
        let skeleton = InMemorySkeleton::new(config.skeleton.joints.clone()).unwrap();
        let session = Session::new(&config, &skeleton).unwrap();
        FramePipeline::new(session, skeleton, source, unpaced())
    }

    fn frame_with_hand(dx: f64, dy: f64) -> FrameLandmarks {
        let mut set = LandmarkSet::new();
        set.insert(0, Landmark::new(0.0, 0.0));
        set.insert(5, Landmark::new(dx, dy));
        FrameLandmarks::empty(640, 480).with_hand(DetectedHand::new(set))
    }

    #[test]
    fn test_run_until_source_ends() {
        let queue: FrameQueue = vec![frame_with_hand(10.0, 0.0), FrameLandmarks::empty(640, 480)].into_iter().collect();
        let mut pipeline = pipeline(queue);
        let summary = pipeline.run().unwrap();
        assert_eq!(summary.frames, 2);
        assert_eq!(summary.hand_updates, 1);
        assert_eq!(pipeline.state(), PipelineState::Idle);
    }

    #[test]
    fn test_acquisition_error_stops_run() {
        let mut pipeline = pipeline(FailingSource);
        assert!(matches!(pipeline.run(), Err(Error::Acquisition(_))));
    }

    #[test]
    fn test_recoverable_source_error_drops_one_frame() {
        let queue: FrameQueue = vec![frame_with_hand(10.0, 0.0)].into_iter().collect();
        let mut pipeline = pipeline(FlakySource { failed: false, queue });
        let summary = pipeline.run().unwrap();
        assert_eq!(summary.dropped_frames, 1);
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.hand_updates, 1);
    }

    #[test]
    fn test_unrepresentable_frame_period_runs_unpaced() {
        let options = PipelineOptions {
            target_fps: Some(1e-30),
            max_frames: None,
        };
        assert_eq!(options.frame_period(), None);

        let queue: FrameQueue = (0..2).map(|_| FrameLandmarks::empty(640, 480)).collect();
        let mut pipeline = pipeline(queue);
        pipeline.options = options;
        assert_eq!(pipeline.run().unwrap().frames, 2);
    }

    #[test]
    fn test_max_frames() {
        let queue: FrameQueue = (0..10).map(|_| FrameLandmarks::empty(640, 480)).collect();
        let mut pipeline = pipeline(queue);
        pipeline.options.max_frames = Some(3);
        assert_eq!(pipeline.run().unwrap().frames, 3);
    }

    #[test]
    fn test_stop_flag() {
        let queue: FrameQueue = (0..5).map(|_| FrameLandmarks::empty(640, 480)).collect();
        let mut pipeline = pipeline(queue);
        let stop = pipeline.stop_handle();
        let summary = pipeline
            .run_with(|report, _| {
                if report.frame_index == 1 {
                    stop.store(true, Ordering::Relaxed);
                }
                Ok(())
            })
            .unwrap();
        assert_eq!(summary.frames, 2);
    }

    #[test]
    fn test_empty_frame_reapplies_held_values() {
        let mut pipeline = pipeline(FrameQueue::new());
        let first = pipeline.process_frame(&frame_with_hand(0.0, 10.0));
        let before = pipeline.skeleton().rotation_of("hand.L");

        let second = pipeline.process_frame(&FrameLandmarks::empty(640, 480));
        assert_eq!(second.values, first.values);
        assert_eq!(pipeline.skeleton().rotation_of("hand.L"), before);
        assert_eq!(second.joints_written, first.joints_written);
    }
}
