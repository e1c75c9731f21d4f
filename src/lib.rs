//! Drive-state feature engineering for NFL play-by-play data
//!
//! Turns one team's season of plays into a table of leak-free sequential
//! features describing the drive and game at the moment each play begins.

pub mod data;
pub mod features;
pub mod pipeline;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::features::classifier::Granularity;
use crate::features::metric_spec::MetricEntry;

/// Unique identifier for a game
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub String);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for GameId {
    fn from(id: &str) -> Self {
        GameId(id.to_string())
    }
}

/// Offensive play type kept by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayType {
    Run,
    Pass,
}

impl PlayType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayType::Run => "run",
            PlayType::Pass => "pass",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "run" => Some(PlayType::Run),
            "pass" => Some(PlayType::Pass),
            _ => None,
        }
    }
}

impl fmt::Display for PlayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single play as loaded from play-by-play data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayRecord {
    /// Missing only in malformed input; the drive key assigner rejects it
    pub game_id: Option<GameId>,
    /// Drive number within the game
    pub drive: Option<u32>,
    pub play_type: PlayType,
    pub run_location: Option<String>,
    pub pass_location: Option<String>,
    pub pass_length: Option<String>,
    /// Numeric outcome columns, booleans already resolved to 0/1
    pub metrics: BTreeMap<String, f64>,
}

impl PlayRecord {
    pub fn new(game_id: impl Into<String>, drive: u32, play_type: PlayType) -> Self {
        PlayRecord {
            game_id: Some(GameId(game_id.into())),
            drive: Some(drive),
            play_type,
            run_location: None,
            pass_location: None,
            pass_length: None,
            metrics: BTreeMap::new(),
        }
    }

    /// Builder-style metric setter
    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    pub fn with_run_location(mut self, location: &str) -> Self {
        self.run_location = Some(location.to_string());
        self
    }

    pub fn with_pass(mut self, location: &str, length: &str) -> Self {
        self.pass_location = Some(location.to_string());
        self.pass_length = Some(length.to_string());
        self
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum GridironError {
    #[error("Malformed play at row {row}: missing {field}")]
    MalformedPlay { row: usize, field: &'static str },

    #[error("Unsupported aggregation kind: {0} (expected cumulative or rank)")]
    UnsupportedAggregation(String),

    #[error("Unknown scope: {0} (expected drive or game)")]
    UnknownScope(String),

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Column {name} has {found} values, dataset has {expected} rows")]
    ColumnLength {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("Metric {metric} has no value at row {row}")]
    MissingMetric { row: usize, metric: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GridironError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub filter: FilterConfig,
    pub classifier: ClassifierConfig,
    pub metrics: Vec<MetricEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub input_path: String,
    pub output_path: String,
    /// SQLite file to also write the feature table into
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "play_features".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Offensive team abbreviation (`posteam`)
    pub team: String,
    /// Season year; None keeps every game in the input
    #[serde(default)]
    pub season: Option<i32>,
    pub downs: Vec<u8>,
    pub exclude_spikes: bool,
    pub exclude_kneels: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub granularity: Granularity,
    pub placeholder: String,
    /// Overrides the label set implied by the granularity
    #[serde(default)]
    pub allowed: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                input_path: "data/reg_pbp_2018.csv".to_string(),
                output_path: "data/play_features.csv".to_string(),
                database_path: None,
                table: default_table(),
            },
            filter: FilterConfig {
                team: "SF".to_string(),
                season: None,
                downs: vec![1, 2, 3, 4],
                exclude_spikes: true,
                exclude_kneels: true,
            },
            classifier: ClassifierConfig {
                granularity: Granularity::DirectionAndDepth,
                placeholder: "unknown".to_string(),
                allowed: None,
            },
            metrics: features::metric_spec::default_metric_entries(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridironError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| GridironError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GridironError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
