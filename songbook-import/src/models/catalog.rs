//! Catalog records exchanged with the songbook API

use serde::{Deserialize, Serialize};

/// One source record from pasted or uploaded import text
///
/// Only built by the import parser, which guarantees singer and song names
/// are non-empty. The pitch may be blank; blank pitches are dropped during
/// preview generation rather than at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawImportRow {
    pub singer_name: String,
    pub song_name: String,
    pub pitch: String,
}

impl RawImportRow {
    pub fn new(
        singer_name: impl Into<String>,
        song_name: impl Into<String>,
        pitch: impl Into<String>,
    ) -> Self {
        Self {
            singer_name: singer_name.into(),
            song_name: song_name.into(),
            pitch: pitch.into(),
        }
    }
}

/// Song from the catalog (metadata beyond the title is not needed here)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub name: String,
}

impl Song {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Singer from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Singer {
    pub id: String,
    pub name: String,
}

impl Singer {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Response to a singer create request
///
/// The API returns the existing record for a duplicate name, in which case
/// `created_new` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSinger {
    #[serde(flatten)]
    pub singer: Singer,
    #[serde(default)]
    pub created_new: bool,
}

/// Response to a create-or-update pitch request
///
/// Both flags false means the pitch already existed with the same value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchUpsertOutcome {
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub updated: bool,
}

impl PitchUpsertOutcome {
    pub fn is_noop(&self) -> bool {
        !self.created && !self.updated
    }
}

/// A remembered song-name correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongMapping {
    pub song_id: String,
    pub song_name: String,
}

impl From<&Song> for SongMapping {
    fn from(song: &Song) -> Self {
        Self {
            song_id: song.id.clone(),
            song_name: song.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_created_singer_deserializes_flat_response() {
        let json = r#"{"id":"s-1","name":"Ameya","createdNew":true}"#;
        let created: CreatedSinger = serde_json::from_str(json).unwrap();
        assert_eq!(created.singer, Singer::new("s-1", "Ameya"));
        assert!(created.created_new);
    }

    #[test]
    fn test_created_singer_defaults_to_existing() {
        let json = r#"{"id":"s-1","name":"Ameya"}"#;
        let created: CreatedSinger = serde_json::from_str(json).unwrap();
        assert!(!created.created_new);
    }

    #[test]
    fn test_pitch_outcome_noop() {
        assert!(PitchUpsertOutcome::default().is_noop());
        assert!(!PitchUpsertOutcome { created: true, updated: false }.is_noop());
    }
}
