//! Configuration system: TOML file + env var overrides + smart defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SrhError};
use crate::pairwise::catalog::{DEFAULT_MYSQL_OPTIONS, OptionCatalog};
use crate::pairwise::generator::WeightRange;
use crate::replay::target::validate_database_name;

/// Full SRH configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub target: TargetConfig,
    pub replay: ReplayConfig,
    pub weights: WeightsConfig,
    pub paths: PathsConfig,
}

/// Where the replay target lives and how to reach it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TargetConfig {
    /// Directory holding one SQLite file per database name.
    pub data_dir: PathBuf,
    /// Database dropped, recreated and selected before each replay.
    pub database: String,
    /// How long a statement waits on a locked database before failing.
    pub busy_timeout_ms: u64,
}

/// Log-scanning knobs for the replay harness.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReplayConfig {
    pub log_path: PathBuf,
    /// Case-insensitive prefix that opens the replay block.
    pub block_start: String,
    /// Lines starting with this marker are skipped inside the block.
    pub comment_marker: String,
}

/// Pairwise weight generation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct WeightsConfig {
    pub output_path: PathBuf,
    pub min_weight: u32,
    pub max_weight: u32,
    /// Fixed RNG seed; `None` draws fresh weights every run.
    pub seed: Option<u64>,
    /// Option catalog, in enumeration order.
    pub options: Vec<String>,
}

/// Filesystem paths used by srh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub event_log: PathBuf,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            data_dir: data_home().join("targets"),
            database: "database0".to_string(),
            busy_timeout_ms: 5_000,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("database0.log"),
            block_start: "CREATE TABLE".to_string(),
            comment_marker: "--".to_string(),
        }
    }
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("mysql_config_weights.txt"),
            min_weight: WeightRange::DEFAULT_MIN,
            max_weight: WeightRange::DEFAULT_MAX,
            seed: None,
            options: DEFAULT_MYSQL_OPTIONS
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let cfg = home_dir().join(".config").join("srh").join("config.toml");
        Self {
            config_file: cfg,
            event_log: data_home().join("events.jsonl"),
        }
    }
}

fn home_dir() -> PathBuf {
    env::var_os("HOME").map_or_else(
        || {
            eprintln!("[SRH-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
            PathBuf::from("/tmp")
        },
        PathBuf::from,
    )
}

fn data_home() -> PathBuf {
    home_dir().join(".local").join("share").join("srh")
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path; defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| SrhError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(SrhError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides_from(env_var)?;
        cfg.normalize();
        cfg.validate()?;
        Ok(cfg)
    }

    /// Deterministic hash of the effective config for logging.
    ///
    /// FNV-1a over the canonical JSON form, stable across processes.
    pub fn stable_hash(&self) -> Result<String> {
        let canonical = serde_json::to_string(self)?;
        let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
        for byte in canonical.as_bytes() {
            hash ^= u64::from(*byte);
            hash = hash.wrapping_mul(0x0100_0000_01b3);
        }
        Ok(format!("{hash:016x}"))
    }

    /// Inclusive weight bounds as a validated range.
    pub fn weight_range(&self) -> Result<WeightRange> {
        WeightRange::new(self.weights.min_weight, self.weights.max_weight)
    }

    /// Option catalog built from the configured names.
    pub fn catalog(&self) -> Result<OptionCatalog> {
        OptionCatalog::new(self.weights.options.iter().cloned())
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // target
        if let Some(raw) = lookup("SRH_TARGET_DATA_DIR") {
            self.target.data_dir = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("SRH_TARGET_DATABASE") {
            self.target.database = raw;
        }
        if let Some(raw) = lookup("SRH_TARGET_BUSY_TIMEOUT_MS") {
            self.target.busy_timeout_ms = parse_env("SRH_TARGET_BUSY_TIMEOUT_MS", &raw)?;
        }

        // replay
        if let Some(raw) = lookup("SRH_REPLAY_LOG_PATH") {
            self.replay.log_path = PathBuf::from(raw);
        }

        // weights
        if let Some(raw) = lookup("SRH_WEIGHTS_OUTPUT_PATH") {
            self.weights.output_path = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("SRH_WEIGHTS_MIN_WEIGHT") {
            self.weights.min_weight = parse_env("SRH_WEIGHTS_MIN_WEIGHT", &raw)?;
        }
        if let Some(raw) = lookup("SRH_WEIGHTS_MAX_WEIGHT") {
            self.weights.max_weight = parse_env("SRH_WEIGHTS_MAX_WEIGHT", &raw)?;
        }
        if let Some(raw) = lookup("SRH_WEIGHTS_SEED") {
            self.weights.seed = Some(parse_env("SRH_WEIGHTS_SEED", &raw)?);
        }

        // paths
        if let Some(raw) = lookup("SRH_EVENT_LOG") {
            self.paths.event_log = PathBuf::from(raw);
        }

        Ok(())
    }

    fn normalize(&mut self) {
        self.target.database = self.target.database.trim().to_string();
        self.replay.block_start = self.replay.block_start.trim().to_string();
        self.replay.comment_marker = self.replay.comment_marker.trim().to_string();
        for name in &mut self.weights.options {
            *name = name.trim().to_string();
        }

        let s = self.target.data_dir.to_string_lossy();
        if s.len() > 1
            && let Some(stripped) = s.strip_suffix('/')
        {
            self.target.data_dir = PathBuf::from(stripped);
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_database_name(&self.target.database)?;

        if self.target.data_dir.as_os_str().is_empty() {
            return Err(SrhError::InvalidConfig {
                details: "target.data_dir must not be empty".to_string(),
            });
        }

        if self.replay.block_start.is_empty() {
            return Err(SrhError::InvalidConfig {
                details: "replay.block_start must not be empty".to_string(),
            });
        }

        if self.replay.comment_marker.is_empty() {
            return Err(SrhError::InvalidConfig {
                details: "replay.comment_marker must not be empty".to_string(),
            });
        }

        self.weight_range()?;
        self.catalog()?;

        Ok(())
    }
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|error| SrhError::ConfigParse {
        context: "env",
        details: format!("{name}={raw:?}: {error}"),
    })
}
