//! Declarative metric specification
//!
//! Config entries name a source metric, an aggregation kind and the scopes it
//! is aggregated over. They are validated once into a [`MetricPlan`] of tagged
//! [`MetricSpec`] values before any aggregation runs.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::data::dataset::BASE_COLUMNS;
use crate::features::{
    DRIVE_KEY_COLUMN, FULL_PLAY_TYPE_COLUMN, PASSING_YARDS_COLUMN, PREVIOUS_PLAY_COLUMN,
    RUSHING_YARDS_COLUMN,
};
use crate::{GridironError, Result};

/// Grouping granularity for an aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Resets at the start of every drive
    Drive,
    /// Resets at the start of every game
    Game,
}

impl Scope {
    /// Prefix used for generated output column names
    pub fn prefix(&self) -> &'static str {
        match self {
            Scope::Drive => "drive",
            Scope::Game => "game",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "drive" => Ok(Scope::Drive),
            "game" => Ok(Scope::Game),
            other => Err(GridironError::UnknownScope(other.to_string())),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.prefix())
    }
}

/// One validated aggregation producing exactly one output column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MetricSpec {
    /// Running sum of everything before the current play in its partition
    Cumulative {
        source: String,
        output: String,
        scope: Scope,
        fill: f64,
    },
    /// Stable ordinal rank of the source value within its partition
    Rank {
        source: String,
        output: String,
        scope: Scope,
    },
}

impl MetricSpec {
    pub fn cumulative(source: &str, output: &str, scope: Scope, fill: f64) -> Self {
        MetricSpec::Cumulative {
            source: source.to_string(),
            output: output.to_string(),
            scope,
            fill,
        }
    }

    pub fn rank(source: &str, output: &str, scope: Scope) -> Self {
        MetricSpec::Rank {
            source: source.to_string(),
            output: output.to_string(),
            scope,
        }
    }

    pub fn source(&self) -> &str {
        match self {
            MetricSpec::Cumulative { source, .. } | MetricSpec::Rank { source, .. } => source,
        }
    }

    pub fn output(&self) -> &str {
        match self {
            MetricSpec::Cumulative { output, .. } | MetricSpec::Rank { output, .. } => output,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            MetricSpec::Cumulative { scope, .. } | MetricSpec::Rank { scope, .. } => *scope,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MetricSpec::Cumulative { .. } => "cumulative",
            MetricSpec::Rank { .. } => "rank",
        }
    }
}

/// A metric entry as written in config.toml
///
/// `kind` and `scopes` stay as strings here so that bad values surface as
/// configuration errors from [`MetricPlan::from_entries`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricEntry {
    /// Source column to aggregate
    pub metric: String,
    /// `cumulative` or `rank`
    pub kind: String,
    /// Base of the output name, defaults to the metric
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Value for the first play of a partition (cumulative only)
    #[serde(default)]
    pub fill: f64,
    /// Defaults to both scopes for cumulative, game only for rank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scopes: Option<Vec<String>>,
}

impl MetricEntry {
    pub fn cumulative(metric: &str) -> Self {
        MetricEntry {
            metric: metric.to_string(),
            kind: "cumulative".to_string(),
            name: None,
            fill: 0.0,
            scopes: None,
        }
    }

    pub fn rank(metric: &str, name: &str) -> Self {
        MetricEntry {
            metric: metric.to_string(),
            kind: "rank".to_string(),
            name: Some(name.to_string()),
            fill: 0.0,
            scopes: None,
        }
    }

    pub fn with_scopes(mut self, scopes: &[&str]) -> Self {
        self.scopes = Some(scopes.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Expand into one spec per requested scope
    pub fn expand(&self) -> Result<Vec<MetricSpec>> {
        if self.metric.trim().is_empty() {
            return Err(GridironError::Config(
                "Metric entry has an empty metric name".to_string(),
            ));
        }

        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(GridironError::Config(format!(
                "Metric {} has an empty output name",
                self.metric
            )));
        }

        let is_rank = match self.kind.trim().to_lowercase().as_str() {
            "cumulative" => false,
            "rank" => true,
            other => return Err(GridironError::UnsupportedAggregation(other.to_string())),
        };

        let scopes = match &self.scopes {
            Some(names) if names.is_empty() => {
                return Err(GridironError::Config(format!(
                    "Metric {} has an empty scope list",
                    self.metric
                )))
            }
            Some(names) => names
                .iter()
                .map(|s| Scope::parse(s))
                .collect::<Result<Vec<_>>>()?,
            None if is_rank => vec![Scope::Game],
            None => vec![Scope::Drive, Scope::Game],
        };

        let base = self.name.as_deref().unwrap_or(&self.metric);
        Ok(scopes
            .into_iter()
            .map(|scope| {
                let output = format!("{}_{}", scope.prefix(), base);
                if is_rank {
                    MetricSpec::rank(&self.metric, &output, scope)
                } else {
                    MetricSpec::cumulative(&self.metric, &output, scope, self.fill)
                }
            })
            .collect())
    }
}

/// Validated, read-only list of aggregations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricPlan {
    specs: Vec<MetricSpec>,
}

impl MetricPlan {
    /// Validate a list of specs: output names must be unique and must not
    /// collide with the pipeline's own columns
    pub fn new(specs: Vec<MetricSpec>) -> Result<Self> {
        let reserved = [
            DRIVE_KEY_COLUMN,
            FULL_PLAY_TYPE_COLUMN,
            PREVIOUS_PLAY_COLUMN,
            RUSHING_YARDS_COLUMN,
            PASSING_YARDS_COLUMN,
        ];
        let mut seen = HashSet::new();

        for spec in &specs {
            if reserved.contains(&spec.output()) || BASE_COLUMNS.contains(&spec.output()) {
                return Err(GridironError::Config(format!(
                    "Output name {} is reserved",
                    spec.output()
                )));
            }
            if !seen.insert(spec.output()) {
                return Err(GridironError::Config(format!(
                    "Duplicate output name {}",
                    spec.output()
                )));
            }
        }

        Ok(MetricPlan { specs })
    }

    pub fn from_entries(entries: &[MetricEntry]) -> Result<Self> {
        let mut specs = Vec::new();
        for entry in entries {
            specs.extend(entry.expand()?);
        }
        Self::new(specs)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MetricSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Distinct source metrics, in first-use order
    pub fn source_metrics(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.specs
            .iter()
            .map(|s| s.source())
            .filter(|s| seen.insert(*s))
            .map(str::to_string)
            .collect()
    }
}

/// Cumulative outcome counters tracked over each drive and game
pub const DEFAULT_CUMULATIVE_METRICS: [&str; 19] = [
    "yards_gained",
    "rushing_yards_gained",
    "passing_yards_gained",
    "sack",
    "incomplete_pass",
    "no_huddle",
    "interception",
    "first_down_rush",
    "first_down_pass",
    "first_down_penalty",
    "third_down_converted",
    "third_down_failed",
    "fumble",
    "qb_hit",
    "rush_attempt",
    "pass_attempt",
    "touchdown",
    "pass_touchdown",
    "rush_touchdown",
];

/// Default metric list: every counter at both scopes plus the game play count
pub fn default_metric_entries() -> Vec<MetricEntry> {
    let mut entries: Vec<MetricEntry> = DEFAULT_CUMULATIVE_METRICS
        .iter()
        .map(|m| MetricEntry::cumulative(m))
        .collect();
    entries.push(MetricEntry::rank("play_id", "play_count"));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_expands_to_both_scopes() {
        let specs = MetricEntry::cumulative("sack").expand().unwrap();

        assert_eq!(
            specs,
            vec![
                MetricSpec::cumulative("sack", "drive_sack", Scope::Drive, 0.0),
                MetricSpec::cumulative("sack", "game_sack", Scope::Game, 0.0),
            ]
        );
    }

    #[test]
    fn test_rank_defaults_to_game_scope() {
        let specs = MetricEntry::rank("play_id", "play_count").expand().unwrap();

        assert_eq!(specs, vec![MetricSpec::rank("play_id", "game_play_count", Scope::Game)]);
    }

    #[test]
    fn test_explicit_drive_rank() {
        let specs = MetricEntry::rank("play_id", "play_count")
            .with_scopes(&["drive"])
            .expand()
            .unwrap();

        assert_eq!(specs[0].output(), "drive_play_count");
        assert_eq!(specs[0].scope(), Scope::Drive);
    }

    #[test]
    fn test_fill_value_carried() {
        let mut entry = MetricEntry::cumulative("yards_gained");
        entry.fill = -1.0;
        let specs = entry.expand().unwrap();

        assert!(specs
            .iter()
            .all(|s| matches!(s, MetricSpec::Cumulative { fill, .. } if *fill == -1.0)));
    }

    #[test]
    fn test_unsupported_kind() {
        let mut entry = MetricEntry::cumulative("sack");
        entry.kind = "median".to_string();

        let err = MetricPlan::from_entries(&[entry]).unwrap_err();
        assert!(matches!(err, GridironError::UnsupportedAggregation(k) if k == "median"));
    }

    #[test]
    fn test_unknown_scope() {
        let entry = MetricEntry::cumulative("sack").with_scopes(&["season"]);

        let err = entry.expand().unwrap_err();
        assert!(matches!(err, GridironError::UnknownScope(_)));
    }

    #[test]
    fn test_empty_scopes_rejected() {
        let entry = MetricEntry::cumulative("sack").with_scopes(&[]);
        assert!(matches!(entry.expand(), Err(GridironError::Config(_))));
    }

    #[test]
    fn test_duplicate_output_rejected() {
        let entries = vec![MetricEntry::cumulative("sack"), MetricEntry::cumulative("sack")];

        let err = MetricPlan::from_entries(&entries).unwrap_err();
        assert!(matches!(err, GridironError::Config(msg) if msg.contains("drive_sack")));
    }

    #[test]
    fn test_reserved_output_rejected() {
        let specs = vec![MetricSpec::cumulative("x", "drive_key", Scope::Drive, 0.0)];
        assert!(MetricPlan::new(specs).is_err());
    }

    #[test]
    fn test_output_colliding_with_base_column_rejected() {
        let err = MetricPlan::from_entries(&[MetricEntry::rank("play_id", "id")]).unwrap_err();
        assert!(matches!(err, GridironError::Config(msg) if msg.contains("game_id")));
    }

    #[test]
    fn test_output_colliding_with_yardage_split_rejected() {
        let specs = vec![MetricSpec::rank("play_id", RUSHING_YARDS_COLUMN, Scope::Game)];
        assert!(matches!(MetricPlan::new(specs), Err(GridironError::Config(_))));
    }

    #[test]
    fn test_empty_name_rejected() {
        let entry = MetricEntry::rank("play_id", "");

        let err = MetricPlan::from_entries(&[entry]).unwrap_err();
        assert!(matches!(err, GridironError::Config(msg) if msg.contains("empty output name")));
    }

    #[test]
    fn test_default_plan() {
        let plan = MetricPlan::from_entries(&default_metric_entries()).unwrap();

        // 19 counters at two scopes plus one rank
        assert_eq!(plan.len(), 39);

        let sources = plan.source_metrics();
        assert_eq!(sources.len(), 20);
        assert_eq!(sources[0], "yards_gained");
        assert_eq!(sources.last().map(String::as_str), Some("play_id"));
    }
}
