use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

use greenkey::{
    composite::Overflow,
    config::{BackgroundMode, Config},
    pipeline::Pipeline,
    video::check_ffmpeg_available,
};

#[derive(Parser)]
#[command(
    name = "greenkey",
    version,
    about = "Replace the green-screen background of a video with another video",
    long_about = "greenkey removes green pixels from every frame of the input video and fills them with the matching frame of the background video, looping the background when it runs out."
)]
struct Cli {
    /// Foreground video filmed against a green screen
    #[arg(short, long, default_value = "input_video.mp4")]
    input: PathBuf,

    /// Output video path (MP4)
    #[arg(short, long, default_value = "output_video.mp4")]
    output: PathBuf,

    /// Background video
    #[arg(short, long, default_value = "background_video.mp4")]
    background: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Reuse the first background frame instead of playing the background
    #[arg(long)]
    static_background: bool,

    /// Skip erosion, dilation and median blur of the mask
    #[arg(long)]
    no_refine: bool,

    /// Clamp channel sums at 255 instead of wrapping
    #[arg(long)]
    saturate: bool,

    /// Write an empty output when the input has no frames
    #[arg(long)]
    allow_empty_input: bool,

    /// Write the effective configuration to this TOML file and exit
    #[arg(long)]
    dump_config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn effective_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(config_path) => {
                info!("Loading configuration from {:?}", config_path);
                Config::from_file(config_path)?
            }
            None => Config::default(),
        };

        if self.static_background {
            config.pipeline.background_mode = BackgroundMode::Static;
        }
        if self.no_refine {
            config.matte.refine = false;
        }
        if self.saturate {
            config.pipeline.overflow = Overflow::Saturating;
        }
        if self.allow_empty_input {
            config.pipeline.allow_empty_input = true;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    info!("Starting greenkey v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.effective_config()?;

    if let Some(path) = &cli.dump_config {
        config.save_to_file(path)?;
        info!("Configuration written to {:?}", path);
        return Ok(());
    }

    if !check_ffmpeg_available() {
        warn!("ffmpeg was not found on PATH; decoding will fail");
    }

    let pipeline = Pipeline::new(config);
    match pipeline.process_files(&cli.input, &cli.output, &cli.background) {
        Ok(summary) => {
            info!(
                "Done! {} frames saved to {:?}",
                summary.frames_written, cli.output
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(e.user_message())),
    }
}
