//! In-memory play table
//!
//! A [`PlayDataset`] holds the loaded plays in chronological order plus the
//! derived columns appended by each pipeline stage. Stages take the dataset by
//! value and hand back the extended one; rows are never reordered.

use std::collections::BTreeSet;
use std::io::Write;
use std::path::Path;

use crate::{GameId, GridironError, PlayRecord, Result};

/// Base columns written ahead of the metric and derived columns
pub const BASE_COLUMNS: [&str; 6] = [
    "game_id",
    "drive",
    "play_type",
    "run_location",
    "pass_location",
    "pass_length",
];

/// Values of one derived column, one per row
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Numeric(Vec<f64>),
    Label(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Numeric(v) => v.len(),
            Column::Label(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell rendered for export
    pub fn cell(&self, row: usize) -> String {
        match self {
            Column::Numeric(v) => v[row].to_string(),
            Column::Label(v) => v[row].clone(),
        }
    }

    fn retain(self, keep: &[bool]) -> Self {
        match self {
            Column::Numeric(v) => Column::Numeric(filter_by_mask(v, keep)),
            Column::Label(v) => Column::Label(filter_by_mask(v, keep)),
        }
    }
}

fn filter_by_mask<T>(values: Vec<T>, keep: &[bool]) -> Vec<T> {
    values
        .into_iter()
        .zip(keep)
        .filter_map(|(v, k)| if *k { Some(v) } else { None })
        .collect()
}

/// Chronologically ordered plays for one team-season plus derived columns
#[derive(Debug, Clone, Default)]
pub struct PlayDataset {
    plays: Vec<PlayRecord>,
    columns: Vec<(String, Column)>,
}

impl PlayDataset {
    pub fn new(plays: Vec<PlayRecord>) -> Self {
        PlayDataset {
            plays,
            columns: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.plays.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plays.is_empty()
    }

    pub fn plays(&self) -> &[PlayRecord] {
        &self.plays
    }

    /// Derived column names in append order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, column)| column)
    }

    pub fn labels(&self, name: &str) -> Result<&[String]> {
        match self.column(name) {
            Some(Column::Label(values)) => Ok(values),
            _ => Err(GridironError::MissingColumn(name.to_string())),
        }
    }

    pub fn numeric(&self, name: &str) -> Result<&[f64]> {
        match self.column(name) {
            Some(Column::Numeric(values)) => Ok(values),
            _ => Err(GridironError::MissingColumn(name.to_string())),
        }
    }

    /// Values of a metric for every row
    ///
    /// A derived numeric column shadows a loaded metric of the same name.
    pub fn metric_values(&self, metric: &str) -> Result<Vec<f64>> {
        if let Some(Column::Numeric(values)) = self.column(metric) {
            return Ok(values.clone());
        }

        self.plays
            .iter()
            .enumerate()
            .map(|(row, play)| {
                play.metric(metric).ok_or_else(|| GridironError::MissingMetric {
                    row,
                    metric: metric.to_string(),
                })
            })
            .collect()
    }

    /// Game id of every row, failing on the first play without one
    pub fn game_ids(&self) -> Result<Vec<&GameId>> {
        self.plays
            .iter()
            .enumerate()
            .map(|(row, play)| {
                play.game_id.as_ref().ok_or(GridironError::MalformedPlay {
                    row,
                    field: "game_id",
                })
            })
            .collect()
    }

    /// Append a derived column
    pub fn with_column(mut self, name: &str, column: Column) -> Result<Self> {
        if column.len() != self.plays.len() {
            return Err(GridironError::ColumnLength {
                name: name.to_string(),
                expected: self.plays.len(),
                found: column.len(),
            });
        }
        if BASE_COLUMNS.contains(&name) || self.column(name).is_some() {
            return Err(GridironError::DuplicateColumn(name.to_string()));
        }

        self.columns.push((name.to_string(), column));
        Ok(self)
    }

    /// Keep only rows whose mask entry is true, preserving order
    pub fn retain(self, keep: &[bool]) -> Self {
        PlayDataset {
            plays: filter_by_mask(self.plays, keep),
            columns: self
                .columns
                .into_iter()
                .map(|(name, column)| (name, column.retain(keep)))
                .collect(),
        }
    }

    /// Derived columns in append order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(name, column)| (name.as_str(), column))
    }

    /// Loaded metric names not shadowed by a derived column, sorted
    pub fn loaded_metric_names(&self) -> Vec<String> {
        let names: BTreeSet<&String> = self.plays.iter().flat_map(|p| p.metrics.keys()).collect();
        names
            .into_iter()
            .filter(|m| self.column(m).is_none())
            .cloned()
            .collect()
    }

    /// Header row: base columns, loaded metrics, then derived columns
    pub fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = BASE_COLUMNS.iter().map(|s| s.to_string()).collect();
        header.extend(self.loaded_metric_names());
        header.extend(self.column_names().map(str::to_string));
        header
    }

    /// Base cells of a row, in [`BASE_COLUMNS`] order
    pub fn base_cells(&self, row: usize) -> [String; 6] {
        let play = &self.plays[row];
        let optional = |v: &Option<String>| v.clone().unwrap_or_default();

        [
            play.game_id.as_ref().map(|g| g.0.clone()).unwrap_or_default(),
            play.drive.map(|d| d.to_string()).unwrap_or_default(),
            play.play_type.to_string(),
            optional(&play.run_location),
            optional(&play.pass_location),
            optional(&play.pass_length),
        ]
    }

    fn row_cells(&self, row: usize, metrics: &[String]) -> Vec<String> {
        let play = &self.plays[row];
        let mut cells = Vec::from(self.base_cells(row));
        cells.extend(
            metrics
                .iter()
                .map(|m| play.metric(m).map(|v| v.to_string()).unwrap_or_default()),
        );
        cells.extend(self.columns.iter().map(|(_, column)| column.cell(row)));
        cells
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(self.header())?;
        let metrics = self.loaded_metric_names();
        for row in 0..self.len() {
            csv_writer.write_record(self.row_cells(row, &metrics))?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlayType;

    fn make_dataset() -> PlayDataset {
        PlayDataset::new(vec![
            PlayRecord::new("g1", 1, PlayType::Run)
                .with_run_location("left")
                .with_metric("yards_gained", 5.0),
            PlayRecord::new("g1", 1, PlayType::Pass)
                .with_pass("middle", "short")
                .with_metric("yards_gained", -2.0),
            PlayRecord::new("g1", 2, PlayType::Run)
                .with_run_location("right")
                .with_metric("yards_gained", 8.0),
        ])
    }

    #[test]
    fn test_with_column() {
        let dataset = make_dataset()
            .with_column("flag", Column::Numeric(vec![1.0, 0.0, 1.0]))
            .unwrap();

        assert_eq!(dataset.numeric("flag").unwrap(), &[1.0, 0.0, 1.0]);
        assert!(dataset.labels("flag").is_err());
        assert_eq!(dataset.column_names().collect::<Vec<_>>(), vec!["flag"]);
    }

    #[test]
    fn test_duplicate_column() {
        let dataset = make_dataset()
            .with_column("flag", Column::Numeric(vec![1.0, 0.0, 1.0]))
            .unwrap();

        let err = dataset
            .with_column("flag", Column::Numeric(vec![0.0; 3]))
            .unwrap_err();
        assert!(matches!(err, GridironError::DuplicateColumn(name) if name == "flag"));

        let err = make_dataset()
            .with_column("game_id", Column::Numeric(vec![0.0; 3]))
            .unwrap_err();
        assert!(matches!(err, GridironError::DuplicateColumn(_)));
    }

    #[test]
    fn test_column_length_mismatch() {
        let err = make_dataset()
            .with_column("flag", Column::Numeric(vec![1.0]))
            .unwrap_err();

        assert!(matches!(
            err,
            GridironError::ColumnLength {
                expected: 3,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_retain_keeps_order_and_columns() {
        let dataset = make_dataset()
            .with_column("label", Column::Label(vec!["a".into(), "b".into(), "c".into()]))
            .unwrap()
            .retain(&[true, false, true]);

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.labels("label").unwrap(), &["a".to_string(), "c".to_string()]);
        assert_eq!(dataset.metric_values("yards_gained").unwrap(), vec![5.0, 8.0]);
    }

    #[test]
    fn test_metric_values_prefers_derived_column() {
        let dataset = make_dataset()
            .with_column("yards_gained", Column::Numeric(vec![1.0, 2.0, 3.0]))
            .unwrap();

        assert_eq!(dataset.metric_values("yards_gained").unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_metric() {
        let err = make_dataset().metric_values("sack").unwrap_err();
        assert!(matches!(err, GridironError::MissingMetric { row: 0, .. }));
    }

    #[test]
    fn test_game_ids_malformed() {
        let mut plays = make_dataset().plays().to_vec();
        plays[1].game_id = None;

        let err = PlayDataset::new(plays).game_ids().unwrap_err();
        assert!(matches!(err, GridironError::MalformedPlay { row: 1, field: "game_id" }));
    }

    #[test]
    fn test_write_csv() {
        let dataset = make_dataset()
            .with_column(
                "drive_key",
                Column::Label(vec!["g1_1".into(), "g1_1".into(), "g1_2".into()]),
            )
            .unwrap();

        let mut out = Vec::new();
        dataset.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "game_id,drive,play_type,run_location,pass_location,pass_length,yards_gained,drive_key"
        );
        assert_eq!(lines[1], "g1,1,run,left,,,5,g1_1");
        assert_eq!(lines[2], "g1,1,pass,,middle,short,-2,g1_1");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_empty_dataset_csv_has_header_only() {
        let mut out = Vec::new();
        PlayDataset::default().write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert_eq!(text.lines().count(), 1);
    }
}
