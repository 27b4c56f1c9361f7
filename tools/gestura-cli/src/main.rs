//! Gestura CLI: pose streams in, gesture segments out.
//!
//! Usage:
//!   gestura segment <INPUT>     Run the gesture pipeline over a pose file
//!   gestura validate <INPUT>    Check a pose file for ordering and layout issues
//!   gestura info <INPUT>        Show pose stream information
//!   gestura synth <OUTPUT>      Write a synthetic pose stream
//!   gestura bench               Measure per-frame latency on synthetic input

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use gestura_common::config::{AppConfig, LoggingConfig};

mod commands;

use commands::PipelineOverrides;

/// Script used by `synth` and `bench` when none is given.
const DEFAULT_SCRIPT: &str =
    "still:1,wave:2,still:0.5,swipe_right:0.5,still:0.5,swipe_left:0.5,still:1.5";

#[derive(Parser)]
#[command(
    name = "gestura",
    about = "Real-time pose-to-gesture segmentation",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/gestura/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the gesture pipeline over a pose stream file
    Segment {
        /// Pose stream (JSONL)
        input: PathBuf,

        /// Write segments here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        overrides: PipelineOverrides,

        /// Print the pipeline summary as JSON
        #[arg(long)]
        report: bool,
    },

    /// Check a pose stream for ordering, range, and layout issues
    Validate {
        /// Pose stream (JSONL)
        input: PathBuf,
    },

    /// Show pose stream information
    Info {
        /// Pose stream (JSONL)
        input: PathBuf,
    },

    /// Write a synthetic pose stream
    Synth {
        /// Output file
        output: PathBuf,

        /// Motion script: comma-separated <motion>:<seconds> steps
        /// (still, wave, swipe_left, swipe_right, swipe_up, swipe_down, dropout, gap)
        #[arg(long, default_value = DEFAULT_SCRIPT)]
        script: String,

        /// Frame rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Keypoints per frame
        #[arg(long, default_value = "2")]
        keypoints: usize,

        /// Timestamp of the first frame (seconds)
        #[arg(long, default_value = "0.0")]
        start_time: f64,
    },

    /// Measure per-frame latency on a synthetic stream
    Bench {
        /// Number of frames to process
        #[arg(long, default_value = "10000")]
        frames: usize,

        /// Motion script repeated until enough frames exist
        #[arg(long, default_value = DEFAULT_SCRIPT)]
        script: String,

        #[command(flatten)]
        overrides: PipelineOverrides,

        /// Print the latency report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    gestura_common::logging::init_logging(&LoggingConfig {
        level,
        json: cli.json_logs || config.logging.json,
    });

    match cli.command {
        Commands::Segment {
            input,
            output,
            overrides,
            report,
        } => commands::segment::run(&config, input, output, &overrides, report).await,
        Commands::Validate { input } => commands::validate::run(input),
        Commands::Info { input } => commands::info::run(input),
        Commands::Synth {
            output,
            script,
            fps,
            keypoints,
            start_time,
        } => commands::synth::run(output, &script, fps, keypoints, start_time),
        Commands::Bench {
            frames,
            script,
            overrides,
            json,
        } => commands::bench::run(&config, frames, &script, &overrides, json),
    }
}
