use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use jsoverlay::config::{convert_timearg, ConfigError, OverlayConfig};
use jsoverlay::overlay::{ControlsAnimation, FrameSink, RecordingCanvas};
use jsoverlay::presets::{ControllerKind, Registry};
use jsoverlay::events::Timeline;
use jsoverlay::tools::detect_controller;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Replays a `jstest --event` log through a controller overlay.
#[derive(Parser, Debug)]
#[command(name = "jsoverlay", version)]
struct Args {
    /// Output of `jstest --event`.
    events: PathBuf,

    /// Config file, defaults to the user config directory.
    config: Option<PathBuf>,

    /// Skip this many seconds after the init burst.
    #[arg(short, long, value_parser = parse_seconds, allow_negative_numbers = true)]
    start: Option<i64>,

    /// Delay the overlay by this many seconds.
    #[arg(short, long, value_parser = parse_seconds, allow_negative_numbers = true)]
    delay: Option<i64>,

    /// Controller type, or "auto".
    #[arg(short = 't', long = "type")]
    controller_type: Option<String>,

    #[arg(short, long)]
    layout: Option<String>,

    #[arg(short = 'T', long)]
    theme: Option<String>,

    #[arg(long)]
    scale: Option<f64>,

    #[arg(short = 'r', long)]
    fps: Option<u32>,
}

impl Args {
    /// Flags given on the command line win over the config file.
    fn apply(&self, config: &mut OverlayConfig) {
        if let Some(start) = self.start {
            config.start_ms = start;
        }
        if let Some(delay) = self.delay {
            config.delay_ms = delay;
        }
        if let Some(controller_type) = &self.controller_type {
            config.controller_type = controller_type.clone();
        }
        if let Some(layout) = &self.layout {
            config.layout = layout.clone();
        }
        if let Some(theme) = &self.theme {
            config.theme = theme.clone();
        }
        if let Some(scale) = self.scale {
            config.scale = scale;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
    }
}

fn parse_seconds(arg: &str) -> Result<i64, ConfigError> {
    convert_timearg(Some(arg))
}

fn main() -> Result<()> {
    setup()?;

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(OverlayConfig::default_path);
    let mut config = OverlayConfig::load(&config_path)?;
    args.apply(&mut config);
    if config.fps == 0 {
        return Err(eyre!("fps must be positive"));
    }
    let events_path = args.events;
    let mut registry = Registry::builtin();
    for theme in config.themes.iter().cloned() {
        registry.add_theme(theme);
    }

    let kind = match config.controller_kind()? {
        Some(kind) => kind,
        None => detect(&events_path, &registry)?,
    };
    let ctype = registry.controller_type(kind)?;
    let layout = registry.layout(&config.layout)?;
    let theme = registry.theme(&config.theme)?.clone();
    let controls = layout.controls(ctype)?;
    let (width, height) = layout.frame_size(config.scale);
    info!(
        "Overlay {}x{} px: controller {}, layout {}, theme {}, {} fps",
        width, height, kind, layout.name, theme.name, config.fps
    );

    let timeline = Timeline::new(BufReader::new(open(&events_path)?));
    let mut animation = ControlsAnimation::create(timeline, controls, theme, config.fps)?
        .calibrate(config.calibration())?;

    let mut canvas = RecordingCanvas::new(layout.scale * config.scale);
    let mut sink = LogSink::new(config.fps);
    let frames = animation.render(&mut canvas, &mut sink)?;

    info!(
        "Replayed {} frames ({}s), {} draw ops in total",
        frames,
        frames / u64::from(config.fps.max(1)),
        sink.total_ops
    );
    info!("Final state: {}", animation.states()?);

    let status = animation.timeline().exit_status();
    if status != 0 {
        return Err(eyre!("Replay stopped with exit status {}", status));
    }
    Ok(())
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| eyre!("Failed to open {}: {}", path.display(), e))
}

fn detect(path: &Path, registry: &Registry) -> Result<ControllerKind> {
    match detect_controller(BufReader::new(open(path)?), registry)? {
        Some(kind) => Ok(kind),
        None => {
            warn!("Could not detect controller type, falling back to {}", ControllerKind::Xboxdrv);
            Ok(ControllerKind::Xboxdrv)
        }
    }
}

/// Stands in for a video encoder: counts draw calls and reports progress once per second.
struct LogSink {
    fps: u64,
    total_ops: usize,
}

impl LogSink {
    fn new(fps: u32) -> Self {
        Self {
            fps: u64::from(fps.max(1)),
            total_ops: 0,
        }
    }
}

impl FrameSink for LogSink {
    fn finish_frame(&mut self, frame: u64, canvas: &RecordingCanvas) -> io::Result<()> {
        let ops = canvas.ops().len();
        self.total_ops += ops;
        debug!("Frame {}: {} draw ops", frame, ops);
        if frame % self.fps == 0 {
            info!("{}s rendered", frame / self.fps);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config_values() {
        let args = Args::try_parse_from([
            "jsoverlay", "session.log", "-s", "1.5", "-d", "-0.25", "-t", "xpad", "-T", "dark", "-r", "30",
        ])
        .unwrap();
        assert_eq!(args.events, PathBuf::from("session.log"));
        assert!(args.config.is_none());

        let mut config = OverlayConfig::default();
        args.apply(&mut config);
        assert_eq!(config.start_ms, 1500);
        assert_eq!(config.delay_ms, -250);
        assert_eq!(config.controller_type, "xpad");
        assert_eq!(config.theme, "dark");
        assert_eq!(config.fps, 30);
        assert_eq!(config.layout, "distance");
    }

    #[test]
    fn events_file_is_required() {
        assert!(Args::try_parse_from(["jsoverlay"]).is_err());
        assert!(Args::try_parse_from(["jsoverlay", "a.log", "--start", "soon"]).is_err());
    }
}
