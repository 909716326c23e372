//! Settings files and command-line options
//!
//! Uses RON (Rusty Object Notation) for human-readable settings files.
//! Missing fields take their defaults.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::rasterizer::RasterSettings;

/// Error type for settings loading
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(ron::error::SpannedError),
    SerializeError(ron::Error),
    /// Values that parse but cannot drive the renderer
    Invalid(String),
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::IoError(e)
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(e: ron::error::SpannedError) -> Self {
        ConfigError::ParseError(e)
    }
}

impl From<ron::Error> for ConfigError {
    fn from(e: ron::Error) -> Self {
        ConfigError::SerializeError(e)
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "Invalid settings: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load settings from a RON file
pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<RasterSettings, ConfigError> {
    let contents = fs::read_to_string(path)?;
    settings_from_str(&contents)
}

/// Parse settings from a RON string
pub fn settings_from_str(s: &str) -> Result<RasterSettings, ConfigError> {
    let settings: RasterSettings = ron::from_str(s)?;
    validate(&settings)?;
    Ok(settings)
}

/// Save settings to a RON file
pub fn save_settings<P: AsRef<Path>>(settings: &RasterSettings, path: P) -> Result<(), ConfigError> {
    let config = ron::ser::PrettyConfig::new()
        .depth_limit(3)
        .indentor("  ".to_string());

    let contents = ron::ser::to_string_pretty(settings, config)?;
    fs::write(path, contents)?;
    Ok(())
}

/// Screen coordinates must stay well inside Q16.16 range
const MAX_DIMENSION: usize = 4096;

fn validate(settings: &RasterSettings) -> Result<(), ConfigError> {
    if settings.width == 0 || settings.height == 0 {
        return Err(ConfigError::Invalid("resolution must be non-zero".to_string()));
    }
    if settings.width > MAX_DIMENSION || settings.height > MAX_DIMENSION {
        return Err(ConfigError::Invalid(format!(
            "resolution {}x{} exceeds {}",
            settings.width, settings.height, MAX_DIMENSION
        )));
    }
    if settings.window_scale == 0 {
        return Err(ConfigError::Invalid("window_scale must be at least 1".to_string()));
    }
    Ok(())
}

/// Options shared by the viewer and the snapshot tool
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about = "Fixed-point software rasterizer", long_about = None)]
pub struct LaunchOptions {
    /// PICO-8 cart supplying the spritesheet and mesh stream
    pub cart: Option<PathBuf>,

    /// PNG that replaces the cart's spritesheet
    #[arg(long)]
    pub sheet: Option<PathBuf>,

    /// RON settings file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Frames to simulate before the snapshot is taken
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub frames: u32,

    /// Where the snapshot PNG is written
    #[arg(long = "out", default_value = "snapshot.png")]
    pub output: PathBuf,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            cart: None,
            sheet: None,
            config: None,
            frames: 1,
            output: PathBuf::from("snapshot.png"),
        }
    }
}

impl LaunchOptions {
    /// Settings from `--config`, or defaults when absent or unreadable
    pub fn settings(&self) -> RasterSettings {
        let Some(path) = &self.config else {
            return RasterSettings::default();
        };
        match load_settings(path) {
            Ok(settings) => {
                log::info!("loaded settings from {}", path.display());
                settings
            }
            Err(e) => {
                log::error!("{}: {}; using defaults", path.display(), e);
                RasterSettings::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rasterizer::{DitherSource, DEFAULT_WINDOW_SCALE};

    #[test]
    fn test_partial_settings_take_defaults() {
        let s = settings_from_str("(fast_recip: false, dither: Bayer)").unwrap();
        assert!(!s.fast_recip);
        assert_eq!(s.dither, DitherSource::Bayer);
        assert_eq!(s.width, RasterSettings::default().width);
        assert_eq!(s.window_scale, DEFAULT_WINDOW_SCALE);
    }

    #[test]
    fn test_settings_round_trip_through_ron() {
        let s = RasterSettings { proj_const: -60.0, clear_color: 1, ..Default::default() };
        let text = ron::ser::to_string_pretty(&s, ron::ser::PrettyConfig::new()).unwrap();
        assert_eq!(settings_from_str(&text).unwrap(), s);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(settings_from_str("(width: 0)"), Err(ConfigError::Invalid(_))));
        assert!(matches!(settings_from_str("(width: \"wide\")"), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = load_settings("/nonexistent/hyperspace.ron").unwrap_err();
        assert!(matches!(err, ConfigError::IoError(_)));
        assert!(err.to_string().starts_with("IO error"));
    }

    #[test]
    fn test_parse_launch_options() {
        let args = ["snapshot", "game.p8", "--frames", "30", "--out", "frame.png", "--config", "hs.ron"];
        let opts = LaunchOptions::try_parse_from(args).unwrap();
        assert_eq!(opts.cart, Some(PathBuf::from("game.p8")));
        assert_eq!(opts.frames, 30);
        assert_eq!(opts.output, PathBuf::from("frame.png"));
        assert_eq!(opts.config, Some(PathBuf::from("hs.ron")));
        assert_eq!(opts.sheet, None);
    }

    #[test]
    fn test_no_arguments_match_default() {
        let opts = LaunchOptions::try_parse_from(["snapshot"]).unwrap();
        assert_eq!(opts, LaunchOptions::default());
    }

    #[test]
    fn test_rejects_bad_arguments() {
        assert!(LaunchOptions::try_parse_from(["snapshot", "--verbose"]).is_err());
        assert!(LaunchOptions::try_parse_from(["snapshot", "--frames", "0"]).is_err());
        assert!(LaunchOptions::try_parse_from(["snapshot", "--frames", "many"]).is_err());
    }
}
