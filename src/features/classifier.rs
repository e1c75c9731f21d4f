//! Full play type classification
//!
//! Combines play type, direction and (optionally) pass depth into a single
//! label and drops plays whose label falls outside the allow-list.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::data::dataset::{Column, PlayDataset};
use crate::features::{FULL_PLAY_TYPE_COLUMN, PASSING_YARDS_COLUMN, RUSHING_YARDS_COLUMN};
use crate::{ClassifierConfig, GridironError, PlayRecord, PlayType, Result};

const DIRECTIONS: [&str; 3] = ["left", "middle", "right"];
const PASS_DEPTHS: [&str; 2] = ["short", "deep"];

/// How finely pass plays are labelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// `pass_left_short`, `pass_middle_deep`, `run_right`, ...
    DirectionAndDepth,
    /// `pass_left`, `run_right`, ...
    DirectionOnly,
}

impl Granularity {
    /// Canonical labels for this granularity (nine or six)
    pub fn default_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        for direction in DIRECTIONS {
            match self {
                Granularity::DirectionAndDepth => {
                    for depth in PASS_DEPTHS {
                        labels.push(format!("pass_{}_{}", direction, depth));
                    }
                }
                Granularity::DirectionOnly => labels.push(format!("pass_{}", direction)),
            }
        }
        for direction in DIRECTIONS {
            labels.push(format!("run_{}", direction));
        }
        labels
    }
}

/// Labels plays and filters them to a known label set
#[derive(Debug, Clone)]
pub struct PlayClassifier {
    granularity: Granularity,
    placeholder: String,
    allowed: HashSet<String>,
}

impl PlayClassifier {
    pub fn new(granularity: Granularity, placeholder: &str) -> Self {
        PlayClassifier {
            granularity,
            placeholder: placeholder.to_string(),
            allowed: granularity.default_labels().into_iter().collect(),
        }
    }

    /// Replace the allow-list
    pub fn with_allowed<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn from_config(config: &ClassifierConfig) -> Result<Self> {
        if config.placeholder.trim().is_empty() {
            return Err(GridironError::Config(
                "Classifier placeholder must not be empty".to_string(),
            ));
        }

        let classifier = Self::new(config.granularity, &config.placeholder);
        match &config.allowed {
            Some(labels) if labels.is_empty() => Err(GridironError::Config(
                "Classifier allow-list is empty".to_string(),
            )),
            Some(labels) => Ok(classifier.with_allowed(labels.iter().cloned())),
            None => Ok(classifier),
        }
    }

    pub fn is_allowed(&self, label: &str) -> bool {
        self.allowed.contains(label)
    }

    fn normalize<'a>(&'a self, field: &'a Option<String>) -> &'a str {
        match field.as_deref().map(str::trim) {
            Some(v) if !v.is_empty() && !v.eq_ignore_ascii_case("na") => v,
            _ => &self.placeholder,
        }
    }

    /// Full play type label; missing sub-fields become the placeholder
    pub fn label(&self, play: &PlayRecord) -> String {
        match play.play_type {
            PlayType::Run => format!("run_{}", self.normalize(&play.run_location)),
            PlayType::Pass => match self.granularity {
                Granularity::DirectionAndDepth => format!(
                    "pass_{}_{}",
                    self.normalize(&play.pass_location),
                    self.normalize(&play.pass_length)
                ),
                Granularity::DirectionOnly => {
                    format!("pass_{}", self.normalize(&play.pass_location))
                }
            },
        }
    }

    /// Label every play, drop unknown labels and append the label column
    pub fn classify(&self, dataset: PlayDataset) -> Result<PlayDataset> {
        let labels: Vec<String> = dataset.plays().iter().map(|p| self.label(p)).collect();
        let keep: Vec<bool> = labels.iter().map(|l| self.is_allowed(l)).collect();

        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped > 0 {
            log::debug!(
                "Classifier dropped {} of {} plays with unknown labels",
                dropped,
                labels.len()
            );
        }

        let kept_labels = labels
            .into_iter()
            .zip(&keep)
            .filter_map(|(label, k)| if *k { Some(label) } else { None })
            .collect();

        dataset
            .retain(&keep)
            .with_column(FULL_PLAY_TYPE_COLUMN, Column::Label(kept_labels))
    }
}

/// Append rushing and passing yardage columns split from `yards_gained`
pub fn split_yardage(dataset: PlayDataset) -> Result<PlayDataset> {
    let yards = dataset.metric_values("yards_gained")?;

    let (rushing, passing): (Vec<f64>, Vec<f64>) = dataset
        .plays()
        .iter()
        .zip(yards)
        .map(|(play, y)| match play.play_type {
            PlayType::Run => (y, 0.0),
            PlayType::Pass => (0.0, y),
        })
        .unzip();

    dataset
        .with_column(RUSHING_YARDS_COLUMN, Column::Numeric(rushing))?
        .with_column(PASSING_YARDS_COLUMN, Column::Numeric(passing))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_run(location: Option<&str>) -> PlayRecord {
        let mut play = PlayRecord::new("g1", 1, PlayType::Run);
        play.run_location = location.map(str::to_string);
        play
    }

    fn make_pass(location: Option<&str>, length: Option<&str>) -> PlayRecord {
        let mut play = PlayRecord::new("g1", 1, PlayType::Pass);
        play.pass_location = location.map(str::to_string);
        play.pass_length = length.map(str::to_string);
        play
    }

    #[test]
    fn test_default_labels() {
        let nine = Granularity::DirectionAndDepth.default_labels();
        assert_eq!(nine.len(), 9);
        assert!(nine.contains(&"pass_middle_deep".to_string()));
        assert!(nine.contains(&"run_left".to_string()));

        let six = Granularity::DirectionOnly.default_labels();
        assert_eq!(six.len(), 6);
        assert!(six.contains(&"pass_right".to_string()));
    }

    #[test]
    fn test_labels() {
        let classifier = PlayClassifier::new(Granularity::DirectionAndDepth, "unknown");

        assert_eq!(classifier.label(&make_run(Some("left"))), "run_left");
        assert_eq!(
            classifier.label(&make_pass(Some("middle"), Some("short"))),
            "pass_middle_short"
        );
    }

    #[test]
    fn test_missing_fields_use_placeholder() {
        let classifier = PlayClassifier::new(Granularity::DirectionAndDepth, "unknown");

        assert_eq!(classifier.label(&make_run(None)), "run_unknown");
        assert_eq!(classifier.label(&make_pass(Some("left"), None)), "pass_left_unknown");
        assert_eq!(classifier.label(&make_pass(Some(" "), Some("NA"))), "pass_unknown_unknown");
    }

    #[test]
    fn test_direction_only_ignores_length() {
        let classifier = PlayClassifier::new(Granularity::DirectionOnly, "unknown");

        assert_eq!(classifier.label(&make_pass(Some("left"), Some("deep"))), "pass_left");
        assert_eq!(classifier.label(&make_pass(Some("left"), None)), "pass_left");
    }

    #[test]
    fn test_classify_filters_and_preserves_order() {
        let classifier = PlayClassifier::new(Granularity::DirectionAndDepth, "unknown");
        let dataset = PlayDataset::new(vec![
            make_run(Some("left")),
            make_pass(None, Some("short")),
            make_pass(Some("right"), Some("deep")),
            make_run(Some("middle")),
        ]);

        let classified = classifier.classify(dataset).unwrap();

        assert_eq!(classified.len(), 3);
        assert_eq!(
            classified.labels(FULL_PLAY_TYPE_COLUMN).unwrap(),
            &["run_left".to_string(), "pass_right_deep".to_string(), "run_middle".to_string()]
        );
    }

    #[test]
    fn test_custom_allow_list() {
        let classifier = PlayClassifier::new(Granularity::DirectionAndDepth, "unknown")
            .with_allowed(["pass_left_long", "run_left"]);

        let dataset = PlayDataset::new(vec![
            make_pass(Some("left"), Some("long")),
            make_pass(Some("left"), Some("short")),
            make_run(Some("left")),
        ]);
        let classified = classifier.classify(dataset).unwrap();

        assert_eq!(classified.len(), 2);
        assert!(!classifier.is_allowed("pass_left_short"));
    }

    #[test]
    fn test_from_config_rejects_empty_allow_list() {
        let config = ClassifierConfig {
            granularity: Granularity::DirectionOnly,
            placeholder: "unknown".to_string(),
            allowed: Some(vec![]),
        };
        assert!(PlayClassifier::from_config(&config).is_err());
    }

    #[test]
    fn test_classify_empty() {
        let classifier = PlayClassifier::new(Granularity::DirectionAndDepth, "unknown");
        let classified = classifier.classify(PlayDataset::default()).unwrap();

        assert!(classified.is_empty());
        assert!(classified.labels(FULL_PLAY_TYPE_COLUMN).unwrap().is_empty());
    }

    #[test]
    fn test_split_yardage() {
        let dataset = PlayDataset::new(vec![
            make_run(Some("left")).with_metric("yards_gained", 4.0),
            make_pass(Some("left"), Some("short")).with_metric("yards_gained", 12.0),
            make_pass(Some("left"), Some("short")).with_metric("yards_gained", -7.0),
        ]);

        let split = split_yardage(dataset).unwrap();

        assert_eq!(split.numeric(RUSHING_YARDS_COLUMN).unwrap(), &[4.0, 0.0, 0.0]);
        assert_eq!(split.numeric(PASSING_YARDS_COLUMN).unwrap(), &[0.0, 12.0, -7.0]);
    }

    #[test]
    fn test_split_yardage_requires_yards() {
        let dataset = PlayDataset::new(vec![make_run(Some("left"))]);
        assert!(matches!(
            split_yardage(dataset),
            Err(GridironError::MissingMetric { .. })
        ));
    }
}
