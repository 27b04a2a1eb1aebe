//! Configuration loading and data folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "SNOWLANDER_DATA_FOLDER";

/// File name of the SQLite database inside `<data folder>/database/`
pub const DATABASE_FILE_NAME: &str = "snowlander.db";

/// Player configuration read from `config.toml`
///
/// Every key is optional; a missing key takes the value from `Default`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlayerConfig {
    /// Folder holding the database (and anything else the player writes)
    pub data_folder: Option<PathBuf>,
    /// Explicit database file, overrides `<data_folder>/database/snowlander.db`
    pub database_path: Option<PathBuf>,
    /// Port for the event stream endpoint
    pub port: u16,
    /// Volume used when no status row has been persisted yet (0.0-1.0)
    pub default_volume: f32,
    /// Per-subscriber event buffer before a slow subscriber is dropped
    pub event_buffer: usize,
    /// How often the playback position is sampled into the status snapshot
    pub position_interval_ms: u64,
    /// Upper bound on a single status persistence write
    pub persist_timeout_ms: u64,
    /// Default result bound for catalog searches
    pub search_limit: i64,
    pub decoder: DecoderConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            data_folder: None,
            database_path: None,
            port: 8000,
            default_volume: 0.5,
            event_buffer: 100,
            position_interval_ms: 5000,
            persist_timeout_ms: 2000,
            search_limit: 10,
            decoder: DecoderConfig::default(),
        }
    }
}

/// External decoder process settings
///
/// `args` is a template: `{path}` is replaced by the track file path and
/// `{volume}` by the session volume (0.0-1.0).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DecoderConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// PCM sample rate the decoder is told to produce
    pub sample_rate: u32,
    /// PCM channel count the decoder is told to produce
    pub channels: u16,
    /// Where decoded PCM is written (e.g. a FIFO read by the voice gateway).
    /// A regular file is truncated at the start of each session. `None`
    /// discards the audio.
    pub output: Option<PathBuf>,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        let args = [
            "-hide_banner",
            "-loglevel",
            "error",
            "-nostdin",
            "-i",
            "{path}",
            "-vn",
            "-filter:a",
            "volume={volume}",
            "-f",
            "s16le",
            "-ar",
            "48000",
            "-ac",
            "2",
            "pipe:1",
        ];
        Self {
            program: PathBuf::from("ffmpeg"),
            args: args.iter().map(|s| s.to_string()).collect(),
            sample_rate: 48_000,
            channels: 2,
            output: None,
        }
    }
}

impl PlayerConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text and validate the result
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: PlayerConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config file if there is one, otherwise fall back to defaults
    ///
    /// A missing file is not an error: the player starts with defaults and a
    /// warning. A file that exists but does not parse is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => p,
            None => {
                info!("No config file found, using defaults");
                return Ok(Self::default());
            }
        };

        if !path.exists() {
            warn!("Config file {} does not exist, using defaults", path.display());
            return Ok(Self::default());
        }

        info!("Loading config from {}", path.display());
        Self::load(&path)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            return Err(Error::Config(format!(
                "default_volume must be between 0.0 and 1.0, got {}",
                self.default_volume
            )));
        }
        if self.event_buffer == 0 {
            return Err(Error::Config("event_buffer must be at least 1".to_string()));
        }
        if self.position_interval_ms == 0 {
            return Err(Error::Config(
                "position_interval_ms must be greater than 0".to_string(),
            ));
        }
        if self.search_limit <= 0 {
            return Err(Error::Config("search_limit must be positive".to_string()));
        }
        if self.decoder.sample_rate == 0 || self.decoder.channels == 0 {
            return Err(Error::Config(
                "decoder sample_rate and channels must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Database file for a resolved data folder
    pub fn database_path(&self, data_folder: &Path) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| data_folder.join("database").join(DATABASE_FILE_NAME))
    }
}

/// Data folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. `SNOWLANDER_DATA_FOLDER` environment variable
/// 3. `data_folder` from the config file
/// 4. OS-dependent default
pub fn resolve_data_folder(cli_arg: Option<&Path>, config: &PlayerConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.data_folder {
        return path.clone();
    }

    default_data_folder()
}

/// User config file, then system-wide config file, whichever exists first
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("snowlander").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    #[cfg(unix)]
    {
        let system_config = PathBuf::from("/etc/snowlander/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// OS-dependent default data folder
pub fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("snowlander"))
        .unwrap_or_else(|| PathBuf::from("./snowlander_data"))
}
