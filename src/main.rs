mod capture;
mod compositing;
mod enhance;
mod error;
mod filters;
mod fitting;
mod loader;
mod matting;
mod output;
mod pipeline;
#[cfg(test)]
mod test_utils;

use anyhow::{Context, Result};
use capture::{InteractiveCapture, LineControl, Shot};
use clap::{Args, Parser, Subcommand};
use compositing::{BlendPolicy, FeatherConfig, DEFAULT_OPACITY};
use enhance::EnhanceConfig;
use error::CompositeError;
use fitting::{DEFAULT_PADDING_PERCENT, DEFAULT_SCALE_FACTOR};
use image::RgbImage;
use matting::{ChromaKeyConfig, DEFAULT_THRESHOLD, MAX_SENSITIVITY};
use output::{FileSink, OutputSink};
use pipeline::Pipeline;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cut the person out of a photo and put them on a new background
    Replace(ReplaceArgs),
    /// Key out a green screen and place the subject on a background
    GreenScreen(GreenScreenArgs),
    /// Drop a whole photo onto a background as a framed inset
    Inset(InsetArgs),
}

#[derive(Args, Debug)]
struct ReplaceArgs {
    /// New background image
    #[arg(long)]
    background: PathBuf,

    /// Photo of the person; omit to take one with --camera
    #[arg(long, required_unless_present = "camera", conflicts_with = "camera")]
    foreground: Option<PathBuf>,

    /// Webcam device index to take the photo with
    #[arg(long)]
    camera: Option<u32>,

    /// Path to segmentation model (ONNX file)
    #[arg(long)]
    model: String,

    /// Foreground probability above which a pixel belongs to the person
    #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
    threshold: f32,

    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,

    /// Also save the refined mask here
    #[arg(long)]
    mask_output: Option<PathBuf>,

    /// Keep camera frames as the sensor sees them
    #[arg(long)]
    no_mirror: bool,
}

#[derive(Args, Debug)]
struct GreenScreenArgs {
    /// Photo taken in front of the green screen
    #[arg(long)]
    foreground: PathBuf,

    #[arg(long)]
    background: PathBuf,

    /// Hue window half-width around green (0-59)
    #[arg(long, default_value_t = 40, value_parser = clap::value_parser!(u8).range(..=MAX_SENSITIVITY as i64))]
    sensitivity: u8,

    #[arg(long, default_value_t = 50)]
    saturation_threshold: u8,

    #[arg(long, default_value_t = 50)]
    value_threshold: u8,

    /// Margin kept free around the subject, percent of the background
    #[arg(long, default_value_t = DEFAULT_PADDING_PERCENT)]
    padding: f64,

    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,

    /// Also save the refined mask here
    #[arg(long)]
    mask_output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InsetArgs {
    #[arg(long)]
    background: PathBuf,

    /// Photo to place; omit to take one with --camera
    #[arg(long, required_unless_present = "camera", conflicts_with = "camera")]
    photo: Option<PathBuf>,

    /// Webcam device index to take the photo with
    #[arg(long)]
    camera: Option<u32>,

    /// Inset height as a fraction of the background height
    #[arg(long, default_value_t = DEFAULT_SCALE_FACTOR)]
    scale_factor: f64,

    #[arg(long, default_value_t = DEFAULT_OPACITY)]
    opacity: f32,

    /// Hard-edged inset instead of a soft white card
    #[arg(long)]
    plain: bool,

    /// Lift brightness and contrast before placing
    #[arg(long)]
    enhance: bool,

    #[arg(short, long, default_value = "result.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let result = match cli.command {
        Command::Replace(args) => replace(args),
        Command::GreenScreen(args) => green_screen(args),
        Command::Inset(args) => inset(args),
    };

    match result {
        Err(e) if e.downcast_ref::<CompositeError>().is_some_and(CompositeError::is_cancelled) => {
            tracing::info!("Nothing written");
            Ok(())
        }
        other => other,
    }
}

fn replace(args: ReplaceArgs) -> Result<()> {
    let mut sink = FileSink::new(&args.output)?;
    let mut mask_sink = args.mask_output.as_deref().map(FileSink::new).transpose()?;

    tracing::info!("Loading segmentation model from {}", args.model);
    let estimator = matting::create_segmentation_estimator(&args.model, args.threshold)
        .context("Failed to load segmentation model")?;
    let mut pipeline = Pipeline::background_replacement(estimator)?;

    let background = loader::load_image(&args.background).context("Failed to load background")?;
    let foreground = acquire(args.foreground.as_deref(), args.camera, !args.no_mirror)?;

    let outcome = pipeline
        .run(&foreground, &background)
        .context("Failed to replace background")?;

    sink.write_frame(&outcome.image)?;
    if let (Some(mask_sink), Some(mask)) = (mask_sink.as_mut(), outcome.mask.as_ref()) {
        mask_sink.write_mask(mask)?;
    }
    Ok(())
}

fn green_screen(args: GreenScreenArgs) -> Result<()> {
    let mut sink = FileSink::new(&args.output)?;
    let mut mask_sink = args.mask_output.as_deref().map(FileSink::new).transpose()?;

    let config = ChromaKeyConfig {
        sensitivity: args.sensitivity,
        saturation_threshold: args.saturation_threshold,
        value_threshold: args.value_threshold,
    };
    tracing::debug!("Chroma key: {:?}, padding {}%", config, args.padding);
    let mut pipeline = Pipeline::green_screen(config, args.padding)?;

    let foreground = loader::load_image(&args.foreground).context("Failed to load foreground")?;
    let background = loader::load_image(&args.background).context("Failed to load background")?;

    let outcome = pipeline
        .run(&foreground, &background)
        .context("Failed to composite green-screen photo")?;

    sink.write_frame(&outcome.image)?;
    if let (Some(mask_sink), Some(mask)) = (mask_sink.as_mut(), outcome.mask.as_ref()) {
        mask_sink.write_mask(mask)?;
    }
    Ok(())
}

fn inset(args: InsetArgs) -> Result<()> {
    let mut sink = FileSink::new(&args.output)?;

    let blend = if args.plain {
        BlendPolicy::FixedOpacity {
            opacity: args.opacity,
        }
    } else {
        BlendPolicy::Feathered(FeatherConfig {
            opacity: args.opacity,
            ..FeatherConfig::default()
        })
    };
    let enhancement = args.enhance.then(EnhanceConfig::default);
    let mut pipeline = Pipeline::inset(args.scale_factor, blend, enhancement)?;

    let background = loader::load_image(&args.background).context("Failed to load background")?;
    let photo = acquire(args.photo.as_deref(), args.camera, true)?;

    let outcome = pipeline
        .run(&photo, &background)
        .context("Failed to place inset")?;

    sink.write_frame(&outcome.image)?;
    Ok(())
}

/// Load the photo from disk, or take one interactively from the camera
fn acquire(path: Option<&Path>, camera: Option<u32>, mirror: bool) -> Result<RgbImage> {
    if let Some(path) = path {
        return loader::load_image(path).context("Failed to load photo");
    }

    let device_index = camera.unwrap_or(0);
    let source = capture::open_camera(device_index).context("Failed to initialize webcam capture")?;
    let mut session = InteractiveCapture::new(source, LineControl::stdin()).mirrored(mirror);

    match session.acquire()? {
        Shot::Frame(frame) => Ok(frame),
        Shot::Cancelled => Err(CompositeError::Cancelled.into()),
    }
}
