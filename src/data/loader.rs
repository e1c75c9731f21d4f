//! Play-by-play CSV loading
//!
//! Reads an nflscrapR-style export and keeps one team's offensive run and
//! pass plays for a season, in file order.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use crate::data::dataset::PlayDataset;
use crate::{FilterConfig, GameId, GridironError, PlayRecord, PlayType, Result};

/// Which plays survive loading
#[derive(Debug, Clone)]
pub struct PlayFilter {
    pub team: String,
    pub season: Option<i32>,
    pub downs: Vec<u8>,
    pub exclude_spikes: bool,
    pub exclude_kneels: bool,
}

impl PlayFilter {
    /// All downs, spikes and kneels excluded, any season
    pub fn new(team: &str) -> Self {
        PlayFilter {
            team: team.to_string(),
            season: None,
            downs: vec![1, 2, 3, 4],
            exclude_spikes: true,
            exclude_kneels: true,
        }
    }

    pub fn with_season(mut self, season: i32) -> Self {
        self.season = Some(season);
        self
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        if config.team.trim().is_empty() {
            return Err(GridironError::Config("Filter team must not be empty".to_string()));
        }
        if config.downs.is_empty() || config.downs.iter().any(|d| !(1..=4).contains(d)) {
            return Err(GridironError::Config(format!(
                "Filter downs must be within 1-4, got {:?}",
                config.downs
            )));
        }

        Ok(PlayFilter {
            team: config.team.trim().to_string(),
            season: config.season,
            downs: config.downs.clone(),
            exclude_spikes: config.exclude_spikes,
            exclude_kneels: config.exclude_kneels,
        })
    }
}

/// NFL season a game date belongs to (January and February games close the
/// previous year's season)
pub fn season_of(date: NaiveDate) -> i32 {
    if date.month() <= 2 {
        date.year() - 1
    } else {
        date.year()
    }
}

/// Row counts from one load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub read: usize,
    pub other_team: usize,
    pub other_down: usize,
    pub other_play_type: usize,
    pub spike_or_kneel: usize,
    pub other_season: usize,
    pub kept: usize,
}

/// Header positions of the columns the loader reads
struct ColumnIndex {
    game_id: usize,
    drive: usize,
    posteam: usize,
    down: usize,
    play_type: usize,
    run_location: Option<usize>,
    pass_location: Option<usize>,
    pass_length: Option<usize>,
    qb_spike: Option<usize>,
    qb_kneel: Option<usize>,
    game_date: Option<usize>,
    metrics: Vec<(String, usize)>,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord, metrics: &[String]) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let require =
            |name: &str| find(name).ok_or_else(|| GridironError::MissingColumn(name.to_string()));

        let game_id = require("game_id")?;
        let drive = require("drive")?;
        let posteam = require("posteam")?;
        let down = require("down")?;
        let play_type = require("play_type")?;

        let metrics = metrics
            .iter()
            .map(|m| require(m).map(|idx| (m.clone(), idx)))
            .collect::<Result<Vec<_>>>()?;

        Ok(ColumnIndex {
            game_id,
            drive,
            posteam,
            down,
            play_type,
            run_location: find("run_location"),
            pass_location: find("pass_location"),
            pass_length: find("pass_length"),
            qb_spike: find("qb_spike"),
            qb_kneel: find("qb_kneel"),
            game_date: find("game_date"),
            metrics,
        })
    }
}

/// Trimmed cell, `None` when empty or `NA`
fn cell(record: &csv::StringRecord, idx: usize) -> Option<&str> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("na"))
}

fn optional_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<&str> {
    idx.and_then(|i| cell(record, i))
}

/// Resolve a metric cell to a number: missing is 0, booleans are 0/1
fn parse_metric(raw: Option<&str>, column: &str, line: usize) -> Result<f64> {
    let raw = match raw {
        Some(v) => v,
        None => return Ok(0.0),
    };
    if raw.eq_ignore_ascii_case("true") {
        return Ok(1.0);
    }
    if raw.eq_ignore_ascii_case("false") {
        return Ok(0.0);
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_nan() => Ok(0.0),
        Ok(v) => Ok(v),
        Err(_) => Err(GridironError::Parse(format!(
            "Line {}: invalid {} value '{}'",
            line, column, raw
        ))),
    }
}

/// Whole number cell such as `3` or `3.0`
fn parse_whole(raw: &str, column: &str, line: usize) -> Result<u32> {
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.fract() == 0.0 && *v >= 0.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
        .ok_or_else(|| {
            GridironError::Parse(format!("Line {}: invalid {} value '{}'", line, column, raw))
        })
}

/// Loads and filters plays for one team-season
#[derive(Debug, Clone)]
pub struct PlayLoader {
    filter: PlayFilter,
    metrics: Vec<String>,
}

impl PlayLoader {
    pub fn new(filter: PlayFilter) -> Self {
        PlayLoader {
            filter,
            metrics: Vec::new(),
        }
    }

    /// Numeric columns to carry on each play
    pub fn with_metrics<I, S>(mut self, metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics = metrics.into_iter().map(Into::into).collect();
        self
    }

    pub fn load_path<P: AsRef<Path>>(&self, path: P) -> Result<(PlayDataset, LoadStats)> {
        let path = path.as_ref();
        log::info!("Loading plays from {}", path.display());
        let file = std::fs::File::open(path)?;
        self.load_reader(file)
    }

    pub fn load_reader<R: Read>(&self, reader: R) -> Result<(PlayDataset, LoadStats)> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let columns = ColumnIndex::from_headers(csv_reader.headers()?, &self.metrics)?;

        let mut stats = LoadStats::default();
        let mut plays = Vec::new();

        for (index, record) in csv_reader.records().enumerate() {
            let record = record?;
            // header is line 1
            let line = index + 2;
            stats.read += 1;

            if let Some(play) = self.parse_row(&record, &columns, line, &mut stats)? {
                plays.push(play);
            }
        }

        stats.kept = plays.len();
        log::info!(
            "Kept {} of {} plays for {} \
             (team {}, down {}, play type {}, spike/kneel {}, season {})",
            stats.kept,
            stats.read,
            self.filter.team,
            stats.other_team,
            stats.other_down,
            stats.other_play_type,
            stats.spike_or_kneel,
            stats.other_season
        );
        if plays.is_empty() && stats.read > 0 {
            log::warn!("No plays matched the filter for {}", self.filter.team);
        }

        Ok((PlayDataset::new(plays), stats))
    }

    /// Filter and convert one row; `Ok(None)` when the row is filtered out
    fn parse_row(
        &self,
        record: &csv::StringRecord,
        columns: &ColumnIndex,
        line: usize,
        stats: &mut LoadStats,
    ) -> Result<Option<PlayRecord>> {
        if cell(record, columns.posteam) != Some(self.filter.team.as_str()) {
            stats.other_team += 1;
            return Ok(None);
        }

        let down = cell(record, columns.down)
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.fract() == 0.0)
            .map(|d| d as i64);
        let down_ok = matches!(down, Some(d) if self.filter.downs.iter().any(|x| *x as i64 == d));
        if !down_ok {
            stats.other_down += 1;
            return Ok(None);
        }

        let play_type = match cell(record, columns.play_type).and_then(PlayType::parse) {
            Some(pt) => pt,
            None => {
                stats.other_play_type += 1;
                return Ok(None);
            }
        };

        let is_set = |idx: Option<usize>, name: &str| -> Result<bool> {
            Ok(parse_metric(optional_cell(record, idx), name, line)? == 1.0)
        };
        if (self.filter.exclude_spikes && is_set(columns.qb_spike, "qb_spike")?)
            || (self.filter.exclude_kneels && is_set(columns.qb_kneel, "qb_kneel")?)
        {
            stats.spike_or_kneel += 1;
            return Ok(None);
        }

        if let Some(season) = self.filter.season {
            let game_season = optional_cell(record, columns.game_date)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
                .map(season_of);
            if game_season != Some(season) {
                stats.other_season += 1;
                return Ok(None);
            }
        }

        let drive = cell(record, columns.drive)
            .map(|d| parse_whole(d, "drive", line))
            .transpose()?;

        let mut metrics = BTreeMap::new();
        for (name, idx) in &columns.metrics {
            metrics.insert(name.clone(), parse_metric(cell(record, *idx), name, line)?);
        }

        let text = |idx: Option<usize>| optional_cell(record, idx).map(str::to_string);
        Ok(Some(PlayRecord {
            game_id: cell(record, columns.game_id).map(GameId::from),
            drive,
            play_type,
            run_location: text(columns.run_location),
            pass_location: text(columns.pass_location),
            pass_length: text(columns.pass_length),
            metrics,
        }))
    }
}
