//! Configuration management for Contour
//!
//! This module provides:
//! - Configuration structs for the audio path, the analyzer and the display
//! - TOML persistence with async file I/O
//! - A manager resolving the per-user config file with corrupt-file recovery
//!
//! Parameter values are not part of the configuration: they belong to the
//! host's persisted state.

use crate::domain::audio::validate_sample_rate;
use crate::domain::geometry::Rect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur during configuration operations
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// FFT size used by the spectrum analyzer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FftOrder {
    #[default]
    Order2048,
    Order4096,
    Order8192,
}

impl FftOrder {
    /// log2 of the FFT size
    pub fn order(self) -> u32 {
        match self {
            FftOrder::Order2048 => 11,
            FftOrder::Order4096 => 12,
            FftOrder::Order8192 => 13,
        }
    }

    /// Number of points of the transform
    pub fn size(self) -> usize {
        1 << self.order()
    }

    /// Number of magnitude bins produced per transform (DC..Nyquist)
    pub fn bins(self) -> usize {
        self.size() / 2 + 1
    }
}

/// Audio path configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Frames per host callback
    pub block_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            block_size: 512,
        }
    }
}

/// Spectrum analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub fft_order: FftOrder,

    /// Slots in each lock-free ring buffer
    pub fifo_capacity: usize,

    /// Magnitudes below this level are shown as silence
    pub floor_db: f32,

    /// Magnitude shown at the top edge of the display
    pub ceiling_db: f32,

    /// Analysis ticks per second
    pub refresh_rate_hz: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_order: FftOrder::Order2048,
            fifo_capacity: 30,
            floor_db: -48.0,
            ceiling_db: 6.0,
            refresh_rate_hz: 60,
        }
    }
}

/// Analysis area configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Width of the analysis area in pixels
    pub width: u32,

    /// Height of the analysis area in pixels
    pub height: u32,

    /// Response curve spans ±this many dB
    pub response_range_db: f32,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 133,
            response_range_db: 24.0,
        }
    }
}

impl DisplayConfig {
    /// The analysis area anchored at the origin
    pub fn area(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width as f32, self.height as f32)
    }
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContourConfig {
    #[serde(default)]
    pub audio: AudioConfig,

    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl ContourConfig {
    /// Load configuration from a TOML file
    #[instrument(skip(path))]
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let contents = fs::read_to_string(path).await?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;

        debug!("Configuration loaded successfully");
        Ok(config)
    }

    /// Save configuration to a TOML file
    #[instrument(skip(self, path))]
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        info!(path = %path.display(), "Saving configuration");

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let toml_str = toml::to_string_pretty(self)?;
        fs::write(path, toml_str).await?;

        debug!("Configuration saved successfully");
        Ok(())
    }

    /// Factory default configuration
    pub fn factory_default() -> Self {
        Self::default()
    }

    /// Reject values the signal path cannot run with
    pub fn validate(&self) -> Result<()> {
        validate_sample_rate(f64::from(self.audio.sample_rate))
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        if self.audio.block_size == 0 {
            return Err(ConfigError::Invalid("block_size must be at least 1".to_string()));
        }

        let analyzer = &self.analyzer;
        if analyzer.fifo_capacity == 0 {
            return Err(ConfigError::Invalid("fifo_capacity must be at least 1".to_string()));
        }
        if analyzer.refresh_rate_hz == 0 {
            return Err(ConfigError::Invalid("refresh_rate_hz must be at least 1".to_string()));
        }
        if !(analyzer.floor_db < analyzer.ceiling_db) {
            return Err(ConfigError::Invalid(format!(
                "floor_db ({}) must be below ceiling_db ({})",
                analyzer.floor_db, analyzer.ceiling_db
            )));
        }

        let display = &self.display;
        if display.width == 0 || display.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "display area {}x{} is empty",
                display.width, display.height
            )));
        }
        if !(display.response_range_db > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "response_range_db ({}) must be positive",
                display.response_range_db
            )));
        }

        Ok(())
    }
}

/// How [`ConfigManager::load`] arrived at its configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigOrigin {
    /// Read from the config file and validated
    File,
    /// No file existed; the factory default was written out
    Created,
    /// The file was not valid TOML and was moved aside to `*.toml.corrupt`
    Corrupt,
    /// The file parsed but its values cannot drive the signal path; it is
    /// left in place for the user to fix
    Rejected(String),
    /// The file exists but could not be read
    Unreadable(String),
}

impl ConfigOrigin {
    /// The returned configuration is the factory default
    pub fn is_fallback(&self) -> bool {
        !matches!(self, ConfigOrigin::File)
    }
}

/// Per-user `contour/config.toml`
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Manage `config.toml` inside `config_dir`
    pub fn new(config_dir: PathBuf) -> Self {
        Self {
            config_path: config_dir.join("config.toml"),
        }
    }

    /// Manager for the platform config directory (`~/.config/contour` on Linux)
    pub fn for_user() -> Result<Self> {
        let base = dirs::config_dir()
            .ok_or_else(|| ConfigError::Invalid("no config directory on this platform".to_string()))?;
        Ok(Self::new(base.join("contour")))
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Resolve the configuration, never failing
    ///
    /// Any problem with the file falls back to the factory default; the
    /// returned origin says which case applied.
    #[instrument(skip(self), fields(path = %self.config_path.display()))]
    pub async fn load(&self) -> (ContourConfig, ConfigOrigin) {
        let contents = match fs::read_to_string(&self.config_path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = ContourConfig::factory_default();
                if let Err(e) = self.save(&config).await {
                    warn!(error = %e, "Could not write default configuration");
                }
                info!("Created default configuration");
                return (config, ConfigOrigin::Created);
            }
            Err(e) => {
                warn!(error = %e, "Configuration unreadable, using defaults");
                return (ContourConfig::factory_default(), ConfigOrigin::Unreadable(e.to_string()));
            }
        };

        let config: ContourConfig = match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                let aside = self.config_path.with_extension("toml.corrupt");
                warn!(error = %e, aside = %aside.display(), "Configuration is not valid TOML, using defaults");
                if let Err(e) = fs::rename(&self.config_path, &aside).await {
                    warn!(error = %e, "Could not move corrupt configuration aside");
                }
                return (ContourConfig::factory_default(), ConfigOrigin::Corrupt);
            }
        };

        match config.validate() {
            Ok(()) => {
                debug!(?config, "Configuration loaded");
                (config, ConfigOrigin::File)
            }
            Err(e) => {
                warn!(reason = %e, "Configuration values rejected, using defaults");
                (ContourConfig::factory_default(), ConfigOrigin::Rejected(e.to_string()))
            }
        }
    }

    /// Validate and write `config`
    pub async fn save(&self, config: &ContourConfig) -> Result<()> {
        config.validate()?;
        config.save_to_file(&self.config_path).await
    }
}
