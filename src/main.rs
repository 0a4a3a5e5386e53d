//! Marker trigger application: show a green card to the webcam, get a key press.

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use marker_trigger::{
    app::MarkerTriggerApp,
    config::Config,
    frontend::{Command, Frontend, HeadlessFrontend},
    source::{FrameSource, ImageSequenceSource},
    trigger::{LogSink, TriggerSink, X11KeyInjector},
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index to use
    #[arg(long, default_value = "0")]
    cam: i32,

    /// Directory of image files to process instead of the camera
    #[arg(short, long)]
    frames: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Key to press on every trigger (X11 keysym name)
    #[arg(short, long)]
    key: Option<String>,

    /// Minimum seconds between two triggers
    #[arg(long)]
    delay: Option<f64>,

    /// Half side of the search window around the last marker position
    #[arg(long)]
    search_radius: Option<u32>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Request calibration after the first frame, so it samples the second (headless mode)
    #[arg(long)]
    calibrate: bool,

    /// Only log triggers instead of pressing a key
    #[arg(long)]
    no_keypress: bool,

    /// Do not mirror frames horizontally
    #[arg(long)]
    no_mirror: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logger
    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Marker Trigger");

    // Load configuration if provided
    let mut config = if let Some(config_path) = &args.config {
        info!("Loading configuration from: {}", config_path);
        Config::from_file(config_path).with_context(|| format!("Failed to load config {config_path}"))?
    } else {
        Config::default()
    };
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let source = open_source(&args, &config)?;
    let sink = open_sink(&config);
    let frontend = open_frontend(&args, &config)?;

    // Create and run application
    let mut app = MarkerTriggerApp::new(&config, source, sink, frontend);
    let summary = app.run()?;
    info!("{} triggers over {} frames", summary.triggers, summary.frames);

    Ok(())
}

fn apply_overrides(config: &mut Config, args: &Args) {
    if let Some(key) = &args.key {
        config.trigger.key.clone_from(key);
    }
    if let Some(delay) = args.delay {
        config.trigger.delay_secs = delay;
    }
    if let Some(radius) = args.search_radius {
        config.segmentation.search_radius = radius;
    }
    if args.headless {
        config.display.headless = true;
    }
    if args.no_keypress {
        config.trigger.inject_keys = false;
    }
    if args.no_mirror {
        config.frame.mirror = false;
    }
}

fn open_source(args: &Args, config: &Config) -> Result<Box<dyn FrameSource>> {
    if let Some(dir) = &args.frames {
        let source = ImageSequenceSource::from_dir(dir, config.frame.width, config.frame.height, config.frame.mirror)
            .context("Failed to open frame directory")?;
        return Ok(Box::new(source));
    }

    #[cfg(feature = "gui")]
    {
        let camera = marker_trigger::source::CameraSource::new(
            args.cam,
            config.frame.width,
            config.frame.height,
            config.frame.mirror,
        )
        .context("Could not initialize the webcam")?;
        Ok(Box::new(camera))
    }

    #[cfg(not(feature = "gui"))]
    {
        bail!(
            "Camera {} unavailable: built without the `gui` feature, use --frames <DIR>",
            args.cam
        )
    }
}

fn open_sink(config: &Config) -> Box<dyn TriggerSink> {
    if !config.trigger.inject_keys {
        return Box::new(LogSink);
    }
    match X11KeyInjector::new(&config.trigger.key) {
        Ok(injector) => Box::new(injector),
        Err(e) => {
            warn!("Failed to initialize key injection: {}. Triggers will only be logged.", e);
            Box::new(LogSink)
        }
    }
}

fn open_frontend(args: &Args, config: &Config) -> Result<Box<dyn Frontend>> {
    let scripted = if args.calibrate { vec![Command::Calibrate] } else { Vec::new() };

    if config.display.headless {
        return Ok(Box::new(HeadlessFrontend::new(scripted)));
    }

    #[cfg(feature = "gui")]
    {
        let window = marker_trigger::frontend::HighGuiFrontend::new(&config.display.window_title, &config.classifier)
            .context("Failed to create window")?;
        Ok(Box::new(window))
    }

    #[cfg(not(feature = "gui"))]
    {
        warn!("Built without the `gui` feature, running headless");
        Ok(Box::new(HeadlessFrontend::new(scripted)))
    }
}
