//! In-process collaborator
//!
//! Holds songs, singers, pitches and mappings in memory. Used by the
//! integration tests and by the CLI `--offline` mode. Failures can be
//! injected per singer name, per song id, for mapping lookups, for mapping
//! writes, or for catalog reads.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::{song_mapping_key, CatalogStore, Lookup, MappingStore, StoreError};
use crate::models::{CreatedSinger, PitchUpsertOutcome, Singer, Song, SongMapping};

#[derive(Debug, Default)]
struct MemoryState {
    songs: Vec<Song>,
    singers: Vec<Singer>,
    /// (song_id, singer_id) → canonical pitch
    pitches: HashMap<(String, String), String>,
    song_mappings: HashMap<String, SongMapping>,
    pitch_mappings: HashMap<String, String>,
    failing_singers: HashSet<String>,
    failing_songs: HashSet<String>,
    fail_mapping_lookups: bool,
    fail_mapping_writes: bool,
    fail_catalog: bool,
    next_singer_id: usize,
}

/// Catalog seed file format for offline runs
#[derive(Debug, Default, Deserialize)]
struct CatalogSeed {
    #[serde(default)]
    songs: Vec<Song>,
    #[serde(default)]
    singers: Vec<Singer>,
}

/// In-memory implementation of both collaborator traits
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a TOML document with `[[songs]]` and `[[singers]]` tables
    pub fn from_toml_str(content: &str) -> Result<Self, StoreError> {
        let seed: CatalogSeed =
            toml::from_str(content).map_err(|e| StoreError::Parse(e.to_string()))?;
        Ok(Self::new().with_songs(seed.songs).with_singers(seed.singers))
    }

    pub fn with_songs(mut self, songs: Vec<Song>) -> Self {
        self.state.get_mut().songs = songs;
        self
    }

    pub fn with_singers(mut self, singers: Vec<Singer>) -> Self {
        self.state.get_mut().singers = singers;
        self
    }

    pub fn with_song_mapping(mut self, raw_song_name: &str, song: &Song) -> Self {
        self.state
            .get_mut()
            .song_mappings
            .insert(song_mapping_key(raw_song_name), SongMapping::from(song));
        self
    }

    pub fn with_pitch_mapping(mut self, cleaned_token: &str, canonical: &str) -> Self {
        self.state
            .get_mut()
            .pitch_mappings
            .insert(cleaned_token.to_string(), canonical.to_string());
        self
    }

    /// Make singer creation fail for this name (case-insensitive)
    pub fn failing_singer(mut self, name: &str) -> Self {
        self.state
            .get_mut()
            .failing_singers
            .insert(name.trim().to_lowercase());
        self
    }

    /// Make pitch upserts fail for this song id
    pub fn failing_song(mut self, song_id: &str) -> Self {
        self.state.get_mut().failing_songs.insert(song_id.to_string());
        self
    }

    /// Make every mapping lookup fail with a network error
    pub fn failing_mapping_lookups(mut self) -> Self {
        self.state.get_mut().fail_mapping_lookups = true;
        self
    }

    /// Make every mapping save/delete fail
    pub fn failing_mapping_writes(mut self) -> Self {
        self.state.get_mut().fail_mapping_writes = true;
        self
    }

    /// Make catalog reads fail
    pub fn failing_catalog(mut self) -> Self {
        self.state.get_mut().fail_catalog = true;
        self
    }

    /// Stored pitch for (song, singer)
    pub async fn pitch(&self, song_id: &str, singer_id: &str) -> Option<String> {
        self.state
            .read()
            .await
            .pitches
            .get(&(song_id.to_string(), singer_id.to_string()))
            .cloned()
    }

    pub async fn pitch_count(&self) -> usize {
        self.state.read().await.pitches.len()
    }

    pub async fn singers(&self) -> Vec<Singer> {
        self.state.read().await.singers.clone()
    }

    /// Stored song mapping for a raw (unnormalized) song name
    pub async fn song_mapping(&self, raw_song_name: &str) -> Option<SongMapping> {
        self.state
            .read()
            .await
            .song_mappings
            .get(&song_mapping_key(raw_song_name))
            .cloned()
    }

    pub async fn pitch_mapping(&self, cleaned_token: &str) -> Option<String> {
        self.state
            .read()
            .await
            .pitch_mappings
            .get(cleaned_token)
            .cloned()
    }

    fn check_mapping_lookup(state: &MemoryState) -> Result<(), StoreError> {
        if state.fail_mapping_lookups {
            return Err(StoreError::Network("mapping lookup timed out".to_string()));
        }
        Ok(())
    }

    fn check_mapping_write(state: &MemoryState) -> Result<(), StoreError> {
        if state.fail_mapping_writes {
            return Err(StoreError::Rejected("mapping storage unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_songs(&self) -> Result<Vec<Song>, StoreError> {
        let state = self.state.read().await;
        if state.fail_catalog {
            return Err(StoreError::Network("catalog unavailable".to_string()));
        }
        Ok(state.songs.clone())
    }

    async fn list_singers(&self) -> Result<Vec<Singer>, StoreError> {
        let state = self.state.read().await;
        if state.fail_catalog {
            return Err(StoreError::Network("catalog unavailable".to_string()));
        }
        Ok(state.singers.clone())
    }

    async fn create_singer(&self, name: &str) -> Result<CreatedSinger, StoreError> {
        let mut state = self.state.write().await;
        let wanted = name.trim().to_lowercase();

        if state.failing_singers.contains(&wanted) {
            return Err(StoreError::Rejected(format!("cannot create singer {name}")));
        }

        if let Some(existing) = state
            .singers
            .iter()
            .find(|s| s.name.trim().to_lowercase() == wanted)
        {
            return Ok(CreatedSinger {
                singer: existing.clone(),
                created_new: false,
            });
        }

        state.next_singer_id += 1;
        let singer = Singer::new(format!("singer-{}", state.next_singer_id), name.trim());
        state.singers.push(singer.clone());

        Ok(CreatedSinger {
            singer,
            created_new: true,
        })
    }

    async fn upsert_pitch(
        &self,
        song_id: &str,
        singer_id: &str,
        pitch: &str,
    ) -> Result<PitchUpsertOutcome, StoreError> {
        let mut state = self.state.write().await;

        if state.failing_songs.contains(song_id) {
            return Err(StoreError::Api(500, format!("pitch write failed for song {song_id}")));
        }

        let key = (song_id.to_string(), singer_id.to_string());
        let outcome = match state.pitches.get(&key) {
            None => PitchUpsertOutcome {
                created: true,
                updated: false,
            },
            Some(existing) if existing == pitch => PitchUpsertOutcome::default(),
            Some(_) => PitchUpsertOutcome {
                created: false,
                updated: true,
            },
        };

        state.pitches.insert(key, pitch.to_string());
        Ok(outcome)
    }
}

#[async_trait]
impl MappingStore for MemoryStore {
    async fn lookup_song_mapping(&self, key: &str) -> Result<Lookup<SongMapping>, StoreError> {
        let state = self.state.read().await;
        Self::check_mapping_lookup(&state)?;
        Ok(state.song_mappings.get(key).cloned().into())
    }

    async fn save_song_mapping(
        &self,
        raw_song_name: &str,
        song_id: &str,
        song_name: &str,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        Self::check_mapping_write(&state)?;
        state.song_mappings.insert(
            song_mapping_key(raw_song_name),
            SongMapping {
                song_id: song_id.to_string(),
                song_name: song_name.to_string(),
            },
        );
        Ok(())
    }

    async fn delete_song_mapping(&self, raw_song_name: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        Self::check_mapping_write(&state)?;
        state.song_mappings.remove(&song_mapping_key(raw_song_name));
        Ok(())
    }

    async fn lookup_pitch_mapping(&self, cleaned_token: &str) -> Result<Lookup<String>, StoreError> {
        let state = self.state.read().await;
        Self::check_mapping_lookup(&state)?;
        Ok(state.pitch_mappings.get(cleaned_token).cloned().into())
    }

    async fn save_pitch_mapping(&self, cleaned_token: &str, canonical: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        Self::check_mapping_write(&state)?;
        state
            .pitch_mappings
            .insert(cleaned_token.to_string(), canonical.to_string());
        Ok(())
    }

    async fn delete_pitch_mapping(&self, cleaned_token: &str) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        Self::check_mapping_write(&state)?;
        state.pitch_mappings.remove(cleaned_token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_singer_dedups_case_insensitively() {
        let store = MemoryStore::new().with_singers(vec![Singer::new("s1", "Ameya")]);

        let existing = store.create_singer("  AMEYA ").await.unwrap();
        assert!(!existing.created_new);
        assert_eq!(existing.singer.id, "s1");

        let created = store.create_singer("Ravi").await.unwrap();
        assert!(created.created_new);
        assert_eq!(store.singers().await.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_outcomes() {
        let store = MemoryStore::new();

        let first = store.upsert_pitch("song", "singer", "G").await.unwrap();
        assert!(first.created);

        let same = store.upsert_pitch("song", "singer", "G").await.unwrap();
        assert!(same.is_noop());

        let changed = store.upsert_pitch("song", "singer", "A").await.unwrap();
        assert!(changed.updated);
        assert_eq!(store.pitch("song", "singer").await.as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn test_song_mapping_round_trip_uses_normalized_key() {
        let store = MemoryStore::new();
        store.save_song_mapping("Shree Ram.", "7", "Sri Ram").await.unwrap();

        let found = store
            .lookup_song_mapping(&song_mapping_key("shri ram"))
            .await
            .unwrap();
        assert_eq!(found.into_option().unwrap().song_id, "7");

        store.delete_song_mapping("SHREE RAM").await.unwrap();
        assert!(store.song_mapping("Shree Ram.").await.is_none());
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let store = MemoryStore::new()
            .failing_mapping_writes()
            .failing_catalog()
            .failing_singer("Ravi");

        assert!(store.save_pitch_mapping("5Kali", "G#").await.is_err());
        assert!(store.list_songs().await.is_err());
        assert!(store.create_singer("ravi").await.is_err());
    }

    #[test]
    fn test_seed_from_toml() {
        let store = MemoryStore::from_toml_str(
            r#"
[[songs]]
id = "1"
name = "Om Namah Shivaya"

[[singers]]
id = "s1"
name = "Ameya"
"#,
        )
        .unwrap();

        let state = store.state.try_read().unwrap();
        assert_eq!(state.songs.len(), 1);
        assert_eq!(state.singers[0].name, "Ameya");
    }

    #[tokio::test]
    async fn test_failing_mapping_lookups_leave_writes_working() {
        let store = MemoryStore::new().failing_mapping_lookups();
        store.save_pitch_mapping("5Kali", "G#").await.unwrap();

        let lookup = store.lookup_pitch_mapping("5Kali").await;
        assert!(matches!(lookup, Err(StoreError::Network(_))));
        assert!(store.lookup_song_mapping("om sai ram").await.is_err());
        assert_eq!(store.pitch_mapping("5Kali").await.as_deref(), Some("G#"));
    }
}
