//! Main application module for landmark replay and retargeting.

use crate::{
    config::Config,
    error::Result,
    pipeline::{FramePipeline, FrameReport, RunSummary},
    session::Session,
    skeleton::{AxisAngles, InMemorySkeleton},
    source::{JsonLinesSource, LandmarkSource},
    Error,
};
use log::info;
use serde::Serialize;
use std::{
    io::{self, BufReader, Write},
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};

/// Where landmark frames are read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// JSON lines on standard input
    Stdin,
    /// JSON-lines recording on disk
    File(PathBuf),
}

impl InputSource {
    /// `-` selects standard input, anything else is a path
    #[must_use]
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(arg))
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Tracking and retargeting settings
    pub config: Config,
    /// Landmark input
    pub input: InputSource,
    /// Print every frame's joint rotations as JSON lines on stdout
    pub emit_poses: bool,
}

/// One line of pose output
#[derive(Debug, Serialize)]
struct PoseLine<'a> {
    frame: u64,
    joints: Vec<JointLine<'a>>,
}

#[derive(Debug, Serialize)]
struct JointLine<'a> {
    name: &'a str,
    #[serde(flatten)]
    angles: AxisAngles,
}

/// Main application struct
pub struct RetargetApp {
    pipeline: FramePipeline<InMemorySkeleton, Box<dyn LandmarkSource>>,
    emit_poses: bool,
}

impl RetargetApp {
    /// Build the skeleton, session and source
    ///
    /// # Errors
    ///
    /// Returns an error for invalid configuration, unknown joints or an input
    /// that cannot be opened
    pub fn new(app_config: AppConfig) -> Result<Self> {
        info!("Initializing pose retargeting application");
        let config = app_config.config;

        let skeleton = InMemorySkeleton::new(config.skeleton.joints.iter().cloned())?;
        info!("Skeleton has {} joints", skeleton.len());

        let session = Session::new(&config, &skeleton)?;
        let source = open_source(&app_config.input, &config)?;

        let pipeline = FramePipeline::new(session, skeleton, source, config.pipeline.options());
        Ok(Self {
            pipeline,
            emit_poses: app_config.emit_poses,
        })
    }

    /// Flag that stops the run loop when set
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.pipeline.stop_handle()
    }

    /// Run until the input ends, the frame limit is reached or a stop is requested
    ///
    /// # Errors
    ///
    /// Returns an error if acquisition or pose output fails
    pub fn run(&mut self) -> Result<RunSummary> {
        info!("Starting main application loop");

        let summary = if self.emit_poses {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            self.pipeline
                .run_with(|report, skeleton| write_pose_line(&mut out, report, skeleton))?
        } else {
            self.pipeline.run()?
        };

        info!(
            "Processed {} frames: {} head updates, {} hand updates, {} solve failures, {} calibration frames, {} dropped",
            summary.frames,
            summary.head_updates,
            summary.hand_updates,
            summary.solve_failures,
            summary.calibration_frames,
            summary.dropped_frames
        );
        Ok(summary)
    }

    /// Final joint rotations
    #[must_use]
    pub fn skeleton(&self) -> &InMemorySkeleton {
        self.pipeline.skeleton()
    }
}

fn open_source(input: &InputSource, config: &Config) -> Result<Box<dyn LandmarkSource>> {
    fn finish<R: io::BufRead + 'static>(source: JsonLinesSource<R>, config: &Config) -> Box<dyn LandmarkSource> {
        if config.camera.normalized_input {
            Box::new(source.normalized(config.camera.depth_scale))
        } else {
            Box::new(source)
        }
    }

    match input {
        InputSource::Stdin => {
            info!("Reading landmarks from standard input");
            Ok(finish(JsonLinesSource::new(BufReader::new(io::stdin())), config))
        }
        InputSource::File(path) => Ok(finish(JsonLinesSource::open(path)?, config)),
    }
}

/// Write one frame's skeleton pose as a JSON line
///
/// # Errors
///
/// Returns an error if serialization or the write fails
pub fn write_pose_line<W: Write>(out: &mut W, report: &FrameReport, skeleton: &InMemorySkeleton) -> Result<()> {
    let line = PoseLine {
        frame: report.frame_index,
        joints: skeleton.pose().map(|(name, angles)| JointLine { name, angles }).collect(),
    };
    serde_json::to_writer(&mut *out, &line).map_err(|e| Error::IoError(e.to_string()))?;
    writeln!(out)?;
    Ok(())
}
