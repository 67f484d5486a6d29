//! # Geodesic Reel CLI
//!
//! Renders the built-in light-ray movies.
//!
//! ## Commands
//! - `render`: play a movie, optionally capturing it to video or PNGs
//! - `plan`: print the resolved movie configuration as JSON
//!
//! Runtime switches come from flags or the matching `REEL_*` environment
//! variables and are read once at startup.

use anyhow::{Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand, ValueEnum};
use reel_core::capture::{
    capture_frame_count, Capture, EncoderSettings, FfmpegCapture, PngSequenceCapture,
};
use reel_core::render::WireframeRenderer;
use reel_core::{
    build_movie, DefaultAssetLoader, FixedRateScheduler, MovieConfig, MovieResources,
    RenderDriver, RuntimeConfig,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "geodesic-reel")]
#[command(about = "Plays precomputed black-hole light-ray trajectories as looping movies")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    runtime: RuntimeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RuntimeArgs {
    /// Capture the movie to a file
    #[arg(long, global = true, env = "REEL_CAPTURE_ON", value_parser = BoolishValueParser::new())]
    capture: bool,

    /// Seconds of movie time to capture
    #[arg(long, global = true, env = "REEL_CAPTURE_SECONDS", default_value_t = 15.0)]
    capture_seconds: f64,

    /// Movie variant selector (1-5)
    #[arg(short, long, global = true, env = "REEL_MOVIE", default_value_t = 1)]
    movie: i64,

    /// Trail capacity in points
    #[arg(long, global = true, env = "REEL_MAX_POINTS", default_value_t = 10_000)]
    max_points: usize,

    #[arg(long, global = true, env = "REEL_FPS", default_value_t = 60)]
    fps: u32,

    #[arg(long, global = true, env = "REEL_WIDTH", default_value_t = 1280)]
    width: u32,

    #[arg(long, global = true, env = "REEL_HEIGHT", default_value_t = 720)]
    height: u32,

    /// Directory trajectory and model paths are resolved against
    #[arg(long, global = true, env = "REEL_ASSET_ROOT", default_value = ".")]
    asset_root: PathBuf,

    /// Video file (ffmpeg) or directory (png) to capture into
    #[arg(short, long, global = true, env = "REEL_OUTPUT", default_value = "movie.webm")]
    output: PathBuf,
}

impl From<RuntimeArgs> for RuntimeConfig {
    fn from(args: RuntimeArgs) -> Self {
        Self {
            capture_on: args.capture,
            capture_seconds: args.capture_seconds,
            variant: args.movie,
            max_trail_points: args.max_points,
            fps: args.fps,
            width: args.width,
            height: args.height,
            asset_root: args.asset_root,
            output: args.output,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Backend {
    Ffmpeg,
    Png,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a movie
    Render {
        /// Stop after this many frames (preview)
        #[arg(long)]
        frames: Option<u64>,

        /// Pace frames to wall-clock time
        #[arg(long)]
        paced: bool,

        /// Capture backend
        #[arg(long, value_enum, default_value = "ffmpeg")]
        backend: Backend,
    },

    /// Print the resolved movie configuration as JSON
    Plan,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geodesic_reel=info,reel_core=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let runtime = RuntimeConfig::from(cli.runtime);

    let result = match cli.command {
        Commands::Render {
            frames,
            paced,
            backend,
        } => cmd_render(&runtime, frames, paced, backend),
        Commands::Plan => cmd_plan(&runtime),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn resolve_movie(runtime: &RuntimeConfig) -> Result<MovieConfig> {
    runtime.validate().context("Invalid runtime configuration")?;
    MovieConfig::from_runtime(runtime).context("Failed to select movie")
}

fn cmd_plan(runtime: &RuntimeConfig) -> Result<()> {
    let config = resolve_movie(runtime)?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn cmd_render(runtime: &RuntimeConfig, frames: Option<u64>, paced: bool, backend: Backend) -> Result<()> {
    let config = resolve_movie(runtime)?;
    info!("Starting {:?} movie from {:?}", config.variant, runtime.asset_root);

    let loader = DefaultAssetLoader::new(&runtime.asset_root);
    let resources = MovieResources::load(&loader, &config).context("Failed to load movie resources")?;
    let movie = build_movie(&config, resources, runtime.fps).context("Failed to build movie")?;

    let renderer = WireframeRenderer::new(runtime.width, runtime.height)?;
    let mut driver = RenderDriver::new(
        movie.sequencer,
        movie.stage,
        Box::new(renderer),
        movie.camera_motion,
    );

    if runtime.capture_on {
        let sink: Box<dyn Capture> = match backend {
            Backend::Ffmpeg => {
                let settings = EncoderSettings::new(runtime.width, runtime.height, runtime.fps);
                Box::new(FfmpegCapture::start(&runtime.output, &settings).context("Failed to start ffmpeg capture")?)
            }
            Backend::Png => Box::new(
                PngSequenceCapture::start(&runtime.output).context("Failed to start PNG capture")?,
            ),
        };
        let count = capture_frame_count(runtime.capture_seconds, runtime.fps);
        driver = driver.with_capture(sink, count);
    } else if frames.is_none() {
        warn!("Capture is off and no frame limit is set; the movie loops until interrupted");
    }

    let scheduler = FixedRateScheduler {
        fps: runtime.fps,
        paced,
        max_frames: frames,
    };
    let rendered = scheduler.run(&mut driver)?;
    info!(
        "Rendered {} frames over {} loops",
        rendered,
        driver.sequencer.loops()
    );
    Ok(())
}
