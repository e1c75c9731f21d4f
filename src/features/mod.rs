//! Feature derivation
//!
//! Play labelling, drive keys and the sequential drive/game aggregations.

pub mod classifier;
pub mod drive_key;
pub mod metric_spec;
pub mod sequential;

pub use classifier::{Granularity, PlayClassifier};
pub use drive_key::{assign_drive_keys, DriveKey};
pub use metric_spec::{MetricEntry, MetricPlan, MetricSpec, Scope};
pub use sequential::SequentialEngine;

/// Derived play label, e.g. `pass_left_short`
pub const FULL_PLAY_TYPE_COLUMN: &str = "full_play_type";
/// `game_id` and drive number joined by an underscore
pub const DRIVE_KEY_COLUMN: &str = "drive_key";
/// Label of the preceding play in the same drive
pub const PREVIOUS_PLAY_COLUMN: &str = "previous_play_in_drive";
/// Previous-play label given to the opening play of a drive
pub const FIRST_PLAY_SENTINEL: &str = "first_play";

pub const RUSHING_YARDS_COLUMN: &str = "rushing_yards_gained";
pub const PASSING_YARDS_COLUMN: &str = "passing_yards_gained";
