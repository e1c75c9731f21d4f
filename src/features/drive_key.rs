//! Drive keys
//!
//! Drive numbers restart in every game, so a drive is identified by its game
//! id and drive number together.

use std::fmt;

use crate::data::dataset::{Column, PlayDataset};
use crate::features::DRIVE_KEY_COLUMN;
use crate::{GameId, GridironError, PlayRecord, Result};

/// Globally unique drive identifier, `{game_id}_{drive}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DriveKey(String);

impl DriveKey {
    pub fn new(game_id: &GameId, drive: u32) -> Self {
        DriveKey(format!("{}_{}", game_id, drive))
    }

    /// Key for a play; `row` is only used for error reporting
    pub fn for_play(row: usize, play: &PlayRecord) -> Result<Self> {
        let game_id = play.game_id.as_ref().ok_or(GridironError::MalformedPlay {
            row,
            field: "game_id",
        })?;
        let drive = play.drive.ok_or(GridironError::MalformedPlay {
            row,
            field: "drive",
        })?;
        Ok(Self::new(game_id, drive))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DriveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append the drive key column; any play without a game id or drive fails
/// the whole stage
pub fn assign_drive_keys(dataset: PlayDataset) -> Result<PlayDataset> {
    let keys = dataset
        .plays()
        .iter()
        .enumerate()
        .map(|(row, play)| DriveKey::for_play(row, play).map(DriveKey::into_string))
        .collect::<Result<Vec<_>>>()?;

    dataset.with_column(DRIVE_KEY_COLUMN, Column::Label(keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PlayType;

    #[test]
    fn test_drive_key_format() {
        let key = DriveKey::new(&GameId::from("2018090900"), 7);
        assert_eq!(key.as_str(), "2018090900_7");
    }

    #[test]
    fn test_same_drive_number_in_different_games() {
        let a = DriveKey::new(&GameId::from("g1"), 3);
        let b = DriveKey::new(&GameId::from("g2"), 3);
        let c = DriveKey::new(&GameId::from("g1"), 3);

        assert_ne!(a, b);
        assert_eq!(a, c);
    }

    #[test]
    fn test_assign_drive_keys() {
        let dataset = PlayDataset::new(vec![
            PlayRecord::new("g1", 1, PlayType::Run),
            PlayRecord::new("g1", 2, PlayType::Pass),
            PlayRecord::new("g2", 1, PlayType::Run),
        ]);

        let keyed = assign_drive_keys(dataset).unwrap();

        assert_eq!(
            keyed.labels(DRIVE_KEY_COLUMN).unwrap(),
            &["g1_1".to_string(), "g1_2".to_string(), "g2_1".to_string()]
        );
    }

    #[test]
    fn test_missing_drive_fails_fast() {
        let mut broken = PlayRecord::new("g1", 2, PlayType::Pass);
        broken.drive = None;
        let dataset = PlayDataset::new(vec![PlayRecord::new("g1", 1, PlayType::Run), broken]);

        let err = assign_drive_keys(dataset).unwrap_err();
        assert!(matches!(err, GridironError::MalformedPlay { row: 1, field: "drive" }));
    }

    #[test]
    fn test_missing_game_id_fails_fast() {
        let mut broken = PlayRecord::new("g1", 1, PlayType::Run);
        broken.game_id = None;

        let err = assign_drive_keys(PlayDataset::new(vec![broken])).unwrap_err();
        assert!(matches!(err, GridironError::MalformedPlay { row: 0, field: "game_id" }));
    }

    #[test]
    fn test_empty_dataset() {
        let keyed = assign_drive_keys(PlayDataset::default()).unwrap();
        assert!(keyed.labels(DRIVE_KEY_COLUMN).unwrap().is_empty());
    }
}
