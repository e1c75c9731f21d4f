//! Feature pipeline
//!
//! classify -> yardage split -> drive keys -> sequential aggregation. Each
//! stage takes the dataset by value and returns the extended one.

use std::io::Read;
use std::path::Path;

use crate::data::dataset::PlayDataset;
use crate::data::loader::{LoadStats, PlayFilter, PlayLoader};
use crate::features::classifier::{split_yardage, PlayClassifier};
use crate::features::drive_key::assign_drive_keys;
use crate::features::metric_spec::MetricPlan;
use crate::features::sequential::SequentialEngine;
use crate::features::{PASSING_YARDS_COLUMN, RUSHING_YARDS_COLUMN};
use crate::{Config, Result};

/// Validated classifier and metric plan, shared across teams and seasons
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    classifier: PlayClassifier,
    engine: SequentialEngine,
}

impl FeaturePipeline {
    pub fn new(classifier: PlayClassifier, plan: MetricPlan) -> Self {
        FeaturePipeline {
            classifier,
            engine: SequentialEngine::new(plan),
        }
    }

    /// Validates the classifier and metric sections before anything runs
    pub fn from_config(config: &Config) -> Result<Self> {
        let classifier = PlayClassifier::from_config(&config.classifier)?;
        let plan = MetricPlan::from_entries(&config.metrics)?;
        log::debug!("Metric plan has {} aggregations", plan.len());
        Ok(Self::new(classifier, plan))
    }

    pub fn plan(&self) -> &MetricPlan {
        self.engine.plan()
    }

    fn needs_yardage_split(&self) -> bool {
        self.plan()
            .source_metrics()
            .iter()
            .any(|m| m == RUSHING_YARDS_COLUMN || m == PASSING_YARDS_COLUMN)
    }

    /// Columns the loader has to read for this plan
    pub fn required_metrics(&self) -> Vec<String> {
        let mut metrics: Vec<String> = self
            .plan()
            .source_metrics()
            .into_iter()
            .filter(|m| m != RUSHING_YARDS_COLUMN && m != PASSING_YARDS_COLUMN)
            .collect();
        if self.needs_yardage_split() && !metrics.iter().any(|m| m == "yards_gained") {
            metrics.push("yards_gained".to_string());
        }
        metrics
    }

    /// Run every stage over an already filtered, chronological dataset
    pub fn run(&self, dataset: PlayDataset) -> Result<PlayDataset> {
        let loaded = dataset.len();
        let dataset = self.classifier.classify(dataset)?;
        log::info!("Classified {} of {} plays", dataset.len(), loaded);

        let dataset = if self.needs_yardage_split() {
            split_yardage(dataset)?
        } else {
            dataset
        };

        let dataset = assign_drive_keys(dataset)?;
        self.engine.apply(dataset)
    }

    /// Load one team-season from CSV and run the pipeline on it
    pub fn run_reader<R: Read>(
        &self,
        filter: PlayFilter,
        reader: R,
    ) -> Result<(PlayDataset, LoadStats)> {
        let (dataset, stats) = self.loader(filter).load_reader(reader)?;
        Ok((self.run(dataset)?, stats))
    }

    pub fn run_path<P: AsRef<Path>>(
        &self,
        filter: PlayFilter,
        path: P,
    ) -> Result<(PlayDataset, LoadStats)> {
        let (dataset, stats) = self.loader(filter).load_path(path)?;
        Ok((self.run(dataset)?, stats))
    }

    fn loader(&self, filter: PlayFilter) -> PlayLoader {
        PlayLoader::new(filter).with_metrics(self.required_metrics())
    }
}
