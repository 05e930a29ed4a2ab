//! Collaborator interfaces for the songbook API
//!
//! The reconciliation engine talks to two collaborators:
//! - [`CatalogStore`]: songs, singers and pitch records
//! - [`MappingStore`]: remembered manual corrections
//!
//! [`RestClient`] implements both over HTTP; [`MemoryStore`] implements both
//! in-process for tests and offline runs.

pub mod memory;
pub mod rest;

pub use memory::MemoryStore;
pub use rest::RestClient;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CreatedSinger, PitchUpsertOutcome, Singer, Song, SongMapping};
use crate::services::song_matcher::normalize_song_name;

/// Collaborator errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Request understood but refused by the collaborator
    #[error("Rejected: {0}")]
    Rejected(String),
}

/// Result of a lookup that may legitimately find nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
}

impl<T> Lookup<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Lookup::Found(value) => Some(value),
            Lookup::NotFound => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

impl<T> From<Option<T>> for Lookup<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Lookup::Found(v),
            None => Lookup::NotFound,
        }
    }
}

/// Storage key for a song mapping
///
/// Same lenient normalization the matcher uses, so "Shree Ram." and
/// "shri ram" share one stored correction.
pub fn song_mapping_key(raw_song_name: &str) -> String {
    normalize_song_name(raw_song_name)
}

/// Songs, singers and pitch records
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Full song catalog
    async fn list_songs(&self) -> Result<Vec<Song>, StoreError>;

    /// Full singer list
    async fn list_singers(&self) -> Result<Vec<Singer>, StoreError>;

    /// Create a singer; an existing name returns the existing record with
    /// `created_new = false`
    async fn create_singer(&self, name: &str) -> Result<CreatedSinger, StoreError>;

    /// Create or update the pitch for (song, singer)
    async fn upsert_pitch(
        &self,
        song_id: &str,
        singer_id: &str,
        pitch: &str,
    ) -> Result<PitchUpsertOutcome, StoreError>;
}

/// Remembered manual corrections
///
/// Song mappings are keyed by [`song_mapping_key`]; pitch mappings by the
/// cleaned raw token.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn lookup_song_mapping(&self, key: &str) -> Result<Lookup<SongMapping>, StoreError>;

    /// Save a mapping under the normalized key of `raw_song_name`
    async fn save_song_mapping(
        &self,
        raw_song_name: &str,
        song_id: &str,
        song_name: &str,
    ) -> Result<(), StoreError>;

    async fn delete_song_mapping(&self, raw_song_name: &str) -> Result<(), StoreError>;

    async fn lookup_pitch_mapping(&self, cleaned_token: &str) -> Result<Lookup<String>, StoreError>;

    async fn save_pitch_mapping(&self, cleaned_token: &str, canonical: &str) -> Result<(), StoreError>;

    async fn delete_pitch_mapping(&self, cleaned_token: &str) -> Result<(), StoreError>;
}

/// Both collaborator roles, as held by a reconciliation session
pub trait SongbookStore: CatalogStore + MappingStore {}

impl<T: CatalogStore + MappingStore> SongbookStore for T {}
