//! Pose retargeting application: replays tracked landmarks onto a skeleton.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pose_retarget::{
    app::{AppConfig, InputSource, RetargetApp},
    config::{Config, EXAMPLE_CONFIG},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// JSON-lines landmark recording, `-` for standard input
    #[arg(short, long, default_value = "-")]
    input: String,

    /// Target frame rate (overrides the configuration)
    #[arg(long)]
    fps: Option<f64>,

    /// Process frames as fast as they arrive
    #[arg(long)]
    no_pacing: bool,

    /// Stop after this many frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Neutral pose calibration samples (0 disables)
    #[arg(long)]
    calibrate: Option<usize>,

    /// Print each frame's joint rotations as JSON lines
    #[arg(short, long)]
    emit_poses: bool,

    /// Print the example configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Pose Retargeting");

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            Config::from_file(path).with_context(|| format!("Failed to load config file {path}"))?
        }
        None => Config::default(),
    };

    if let Some(fps) = args.fps {
        config.pipeline.target_fps = fps;
    }
    if args.no_pacing {
        config.pipeline.paced = false;
    }
    if args.max_frames.is_some() {
        config.pipeline.max_frames = args.max_frames;
    }
    if let Some(samples) = args.calibrate {
        config.calibration.samples = samples;
    }

    let app_config = AppConfig {
        config,
        input: InputSource::from_arg(&args.input),
        emit_poses: args.emit_poses,
    };

    // Create and run application
    let mut app = RetargetApp::new(app_config).context("Failed to initialize")?;
    app.run()?;

    Ok(())
}
