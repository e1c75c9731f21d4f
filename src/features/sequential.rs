//! Sequential drive and game aggregations
//!
//! Every feature describes the state *before* a play begins: cumulative
//! values are shifted by one row inside their partition so a play's own
//! outcome never reaches its own row. Partitions keep input order and rows
//! are never reordered.

use std::collections::HashMap;
use std::hash::Hash;

use crate::data::dataset::{Column, PlayDataset};
use crate::features::metric_spec::{MetricPlan, MetricSpec, Scope};
use crate::features::{
    DRIVE_KEY_COLUMN, FIRST_PLAY_SENTINEL, FULL_PLAY_TYPE_COLUMN, PREVIOUS_PLAY_COLUMN,
};
use crate::{GameId, Result};

/// Row indices of each partition, partitions in order of first appearance
pub fn partition_indices<K: Eq + Hash>(keys: &[K]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<&K, usize> = HashMap::new();
    let mut partitions: Vec<Vec<usize>> = Vec::new();

    for (row, key) in keys.iter().enumerate() {
        let slot = *slots.entry(key).or_insert_with(|| {
            partitions.push(Vec::new());
            partitions.len() - 1
        });
        partitions[slot].push(row);
    }

    partitions
}

/// Running sum of everything before each row in its partition
///
/// The first row of a partition gets `fill`. The sum itself always starts
/// from zero, so `fill` stands in for the undefined value rather than
/// offsetting later rows.
pub fn cumulative_before<K: Eq + Hash>(values: &[f64], keys: &[K], fill: f64) -> Vec<f64> {
    let mut before = vec![fill; values.len()];

    for rows in partition_indices(keys) {
        let mut running: Option<f64> = None;
        for row in rows {
            before[row] = running.unwrap_or(fill);
            running = Some(running.unwrap_or(0.0) + values[row]);
        }
    }

    before
}

/// Ordinal rank (1-based) of each value within its partition
///
/// Ascending by value; ties go to the earlier row.
pub fn ordinal_rank<K: Eq + Hash>(values: &[f64], keys: &[K]) -> Vec<usize> {
    let mut ranks = vec![0; values.len()];

    for mut rows in partition_indices(keys) {
        // stable sort keeps input order among equal values
        rows.sort_by(|a, b| values[*a].total_cmp(&values[*b]));
        for (position, row) in rows.into_iter().enumerate() {
            ranks[row] = position + 1;
        }
    }

    ranks
}

/// Each row's predecessor label within its partition, `sentinel` for the first
pub fn previous_in_partition<K: Eq + Hash>(
    labels: &[String],
    keys: &[K],
    sentinel: &str,
) -> Vec<String> {
    let mut previous = vec![sentinel.to_string(); labels.len()];

    for rows in partition_indices(keys) {
        for pair in rows.windows(2) {
            previous[pair[1]] = labels[pair[0]].clone();
        }
    }

    previous
}

fn aggregate<K: Eq + Hash>(spec: &MetricSpec, values: &[f64], keys: &[K]) -> Column {
    match spec {
        MetricSpec::Cumulative { fill, .. } => {
            Column::Numeric(cumulative_before(values, keys, *fill))
        }
        MetricSpec::Rank { .. } => Column::Numeric(
            ordinal_rank(values, keys)
                .into_iter()
                .map(|r| r as f64)
                .collect(),
        ),
    }
}

/// Interprets a [`MetricPlan`] against a classified, drive-keyed dataset
#[derive(Debug, Clone)]
pub struct SequentialEngine {
    plan: MetricPlan,
}

impl SequentialEngine {
    pub fn new(plan: MetricPlan) -> Self {
        SequentialEngine { plan }
    }

    pub fn plan(&self) -> &MetricPlan {
        &self.plan
    }

    /// Append one column per spec, then `previous_play_in_drive`
    ///
    /// Expects the `drive_key` and `full_play_type` columns to be present.
    pub fn apply(&self, dataset: PlayDataset) -> Result<PlayDataset> {
        let drive_keys: Vec<String> = dataset.labels(DRIVE_KEY_COLUMN)?.to_vec();
        let game_keys: Vec<GameId> = dataset.game_ids()?.into_iter().cloned().collect();
        let play_types: Vec<String> = dataset.labels(FULL_PLAY_TYPE_COLUMN)?.to_vec();

        let mut dataset = dataset;
        for spec in self.plan.iter() {
            let values = dataset.metric_values(spec.source())?;
            let column = match spec.scope() {
                Scope::Drive => aggregate(spec, &values, &drive_keys),
                Scope::Game => aggregate(spec, &values, &game_keys),
            };
            log::debug!(
                "{} {} of {} -> {}",
                spec.scope(),
                spec.kind(),
                spec.source(),
                spec.output()
            );
            dataset = dataset.with_column(spec.output(), column)?;
        }

        let previous = previous_in_partition(&play_types, &drive_keys, FIRST_PLAY_SENTINEL);
        let dataset = dataset.with_column(PREVIOUS_PLAY_COLUMN, Column::Label(previous))?;

        log::info!(
            "Aggregated {} features over {} plays",
            self.plan.len() + 1,
            dataset.len()
        );
        Ok(dataset)
    }
}
