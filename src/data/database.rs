//! SQLite storage for feature tables

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::Path;

use crate::data::dataset::{Column, PlayDataset, BASE_COLUMNS};
use crate::features::DRIVE_KEY_COLUMN;
use crate::Result;

/// Database connection holding exported feature tables
pub struct FeatureStore {
    conn: Connection,
}

impl FeatureStore {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(FeatureStore { conn })
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(FeatureStore { conn })
    }

    fn quote(identifier: &str) -> String {
        format!("\"{}\"", identifier.replace('"', "\"\""))
    }

    /// Replace `table` with the contents of the dataset, one row per play in
    /// dataset order. Returns the number of rows written.
    pub fn write_dataset(&mut self, table: &str, dataset: &PlayDataset) -> Result<usize> {
        let metrics = dataset.loaded_metric_names();

        let mut definitions = vec!["row_index INTEGER PRIMARY KEY".to_string()];
        for name in BASE_COLUMNS {
            let sql_type = if name == "drive" { "INTEGER" } else { "TEXT" };
            definitions.push(format!("{} {}", Self::quote(name), sql_type));
        }
        for name in &metrics {
            definitions.push(format!("{} REAL", Self::quote(name)));
        }
        for (name, column) in dataset.columns() {
            let sql_type = match column {
                Column::Numeric(_) => "REAL",
                Column::Label(_) => "TEXT",
            };
            definitions.push(format!("{} {}", Self::quote(name), sql_type));
        }

        let quoted_table = Self::quote(table);
        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            "DROP TABLE IF EXISTS {table}; CREATE TABLE {table} ({columns});",
            table = quoted_table,
            columns = definitions.join(", ")
        ))?;

        {
            let placeholders = vec!["?"; definitions.len()].join(", ");
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {} VALUES ({})",
                quoted_table, placeholders
            ))?;

            for (row, play) in dataset.plays().iter().enumerate() {
                let text = |v: &Option<String>| v.clone().map(Value::Text).unwrap_or(Value::Null);

                let mut values = vec![
                    Value::Integer(row as i64),
                    play.game_id
                        .as_ref()
                        .map(|g| Value::Text(g.0.clone()))
                        .unwrap_or(Value::Null),
                    play.drive
                        .map(|d| Value::Integer(d as i64))
                        .unwrap_or(Value::Null),
                    Value::Text(play.play_type.to_string()),
                    text(&play.run_location),
                    text(&play.pass_location),
                    text(&play.pass_length),
                ];
                values.extend(
                    metrics
                        .iter()
                        .map(|m| play.metric(m).map(Value::Real).unwrap_or(Value::Null)),
                );
                values.extend(dataset.columns().map(|(_, column)| match column {
                    Column::Numeric(v) => Value::Real(v[row]),
                    Column::Label(v) => Value::Text(v[row].clone()),
                }));

                stmt.execute(params_from_iter(values))?;
            }
        }

        tx.commit()?;
        log::info!("Wrote {} plays to table {}", dataset.len(), table);
        Ok(dataset.len())
    }

    /// Number of rows in a table, `None` when it does not exist
    pub fn row_count(&self, table: &str) -> Result<Option<usize>> {
        let exists: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", Self::quote(table)),
            [],
            |row| row.get(0),
        )?;
        Ok(Some(count as usize))
    }

    /// Numeric column in row order
    pub fn numeric_column(&self, table: &str, column: &str) -> Result<Vec<f64>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY row_index",
            Self::quote(column),
            Self::quote(table)
        ))?;
        let values = stmt
            .query_map([], |row| row.get::<_, f64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(values)
    }

    /// Summary of a written feature table
    pub fn get_stats(&self, table: &str) -> Result<StoreStats> {
        let quoted = Self::quote(table);
        let play_count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quoted), [], |row| row.get(0))?;
        let game_count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(DISTINCT game_id) FROM {}", quoted),
            [],
            |row| row.get(0),
        )?;
        let drive_count: i64 = self.conn.query_row(
            &format!(
                "SELECT COUNT(DISTINCT {}) FROM {}",
                Self::quote(DRIVE_KEY_COLUMN),
                quoted
            ),
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            play_count: play_count as usize,
            game_count: game_count as usize,
            drive_count: drive_count as usize,
        })
    }
}

/// Feature table statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub play_count: usize,
    pub game_count: usize,
    pub drive_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::drive_key::assign_drive_keys;
    use crate::{PlayRecord, PlayType};

    fn make_dataset() -> PlayDataset {
        let dataset = PlayDataset::new(vec![
            PlayRecord::new("g1", 1, PlayType::Run)
                .with_run_location("left")
                .with_metric("yards_gained", 3.0),
            PlayRecord::new("g1", 1, PlayType::Pass)
                .with_pass("left", "deep")
                .with_metric("yards_gained", 21.0),
            PlayRecord::new("g2", 1, PlayType::Run).with_metric("yards_gained", -1.0),
        ]);
        assign_drive_keys(dataset)
            .unwrap()
            .with_column("drive_yards_gained", Column::Numeric(vec![0.0, 3.0, 0.0]))
            .unwrap()
    }

    #[test]
    fn test_missing_table() {
        let store = FeatureStore::in_memory().unwrap();
        assert_eq!(store.row_count("play_features").unwrap(), None);
    }

    #[test]
    fn test_write_dataset() {
        let mut store = FeatureStore::in_memory().unwrap();
        let written = store.write_dataset("play_features", &make_dataset()).unwrap();

        assert_eq!(written, 3);
        assert_eq!(store.row_count("play_features").unwrap(), Some(3));
        assert_eq!(
            store.numeric_column("play_features", "drive_yards_gained").unwrap(),
            vec![0.0, 3.0, 0.0]
        );
        assert_eq!(
            store.numeric_column("play_features", "yards_gained").unwrap(),
            vec![3.0, 21.0, -1.0]
        );
        assert_eq!(
            store.get_stats("play_features").unwrap(),
            StoreStats {
                play_count: 3,
                game_count: 2,
                drive_count: 2,
            }
        );
    }

    #[test]
    fn test_rewrite_replaces_table() {
        let mut store = FeatureStore::in_memory().unwrap();
        store.write_dataset("features", &make_dataset()).unwrap();

        let smaller = make_dataset().retain(&[true, false, false]);
        store.write_dataset("features", &smaller).unwrap();

        assert_eq!(store.row_count("features").unwrap(), Some(1));
    }

    #[test]
    fn test_quoted_table_name() {
        let mut store = FeatureStore::in_memory().unwrap();
        store.write_dataset("sf \"2018\"", &make_dataset()).unwrap();

        assert_eq!(store.row_count("sf \"2018\"").unwrap(), Some(3));
    }

    #[test]
    fn test_open_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("features.db");

        let mut store = FeatureStore::open(&path).unwrap();
        store.write_dataset("play_features", &make_dataset()).unwrap();
        drop(store);

        let store = FeatureStore::open(&path).unwrap();
        assert_eq!(store.row_count("play_features").unwrap(), Some(3));
    }
}
