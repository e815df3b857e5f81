//! Overlay configuration
//!
//! Settings are read from a TOML file, by default
//! `<config dir>/jsoverlay/config.toml`. A missing file is not an error: the
//! overlay falls back to its defaults. A file that exists but cannot be read or
//! parsed is an error.
//!
//! ```toml
//! controller_type = "auto"
//! layout = "distance"
//! theme = "midnight"
//! fps = 30
//! start_ms = 12000
//!
//! [[themes]]
//! name = "midnight"
//! bg_color = [0.05, 0.05, 0.1]
//! fg_color = [0.2, 0.2, 0.4]
//! maxed_color = [0.6, 0.6, 1.0]
//! text_color = [0.8, 0.8, 0.8]
//! ```

use crate::overlay::animation::Calibration;
use crate::overlay::error::AdapterError;
use crate::presets::{ControllerKind, Theme};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const CONFIG_DIR: &str = "jsoverlay";
pub const CONFIG_FILE: &str = "config.toml";

/// Controller type value that asks for detection from the device name.
pub const AUTO_CONTROLLER: &str = "auto";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("No such controller type: {0:?}")]
    UnknownControllerType(String),

    #[error("No such layout: {0:?}")]
    UnknownLayout(String),

    #[error("No such theme: {0:?}")]
    UnknownTheme(String),

    #[error("Controller type {controller} has no input {input}")]
    MissingInput { controller: String, input: String },

    #[error("Invalid control: {0}")]
    Adapter(#[from] AdapterError),

    #[error("Invalid time argument {0:?}")]
    InvalidTime(String),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct OverlayConfig {
    /// Controller type name, or `"auto"` to detect it from the log.
    pub controller_type: String,
    pub layout: String,
    pub theme: String,
    pub fps: u32,
    /// Multiplier on the layout's own pixel scale.
    pub scale: f64,
    /// Skips this much of the log after its init burst, matching a video cut.
    pub start_ms: i64,
    /// Shifts the overlay later against the video.
    pub delay_ms: i64,
    /// Absolute event time to skip to before `start_ms` applies.
    pub absolute_start_ms: Option<i64>,
    /// Overlay placement inside the video frame, as fractions of the free space.
    pub position: [f64; 2],
    /// Themes added to the built-in ones.
    pub themes: Vec<Theme>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            controller_type: ControllerKind::Xboxdrv.to_string(),
            layout: "distance".to_string(),
            theme: "default".to_string(),
            fps: 60,
            scale: 1.0,
            start_ms: 0,
            delay_ms: 0,
            absolute_start_ms: None,
            position: [1.0, 0.8],
            themes: Vec::new(),
        }
    }
}

impl OverlayConfig {
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    /// Loads the config at `path`, or the defaults when there is no such file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        debug!("Parsed config: {:?}", config);
        Ok(config)
    }

    /// The configured controller kind, or `None` for detection.
    pub fn controller_kind(&self) -> Result<Option<ControllerKind>, ConfigError> {
        if self.controller_type == AUTO_CONTROLLER {
            return Ok(None);
        }
        self.controller_type.parse().map(Some)
    }

    /// Calibration mapping presentation time zero onto the log.
    pub fn calibration(&self) -> Calibration {
        Calibration {
            start_ms: self.absolute_start_ms,
            offset_ms: self.start_ms - self.delay_ms,
        }
    }
}

/// Converts a time argument in (fractional) seconds to milliseconds.
///
/// A missing argument is zero.
pub fn convert_timearg(arg: Option<&str>) -> Result<i64, ConfigError> {
    let Some(arg) = arg else {
        return Ok(0);
    };
    let seconds: f64 = arg
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidTime(arg.to_string()))?;
    if !seconds.is_finite() {
        return Err(ConfigError::InvalidTime(arg.to_string()));
    }
    Ok((seconds * 1000.0).trunc() as i64)
}
