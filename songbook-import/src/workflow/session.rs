//! Reconciliation session
//!
//! Owns the preview items for one import and applies user corrections to
//! them. Every correction that can change a status re-sorts the items.
//!
//! # Song correction fan-out
//! 1. Persist the mapping and update the session cache
//! 2. Apply the song to every row whose original song name is identical
//! 3. Offer other unmatched spellings scoring at least
//!    [`SIMILAR_SONG_THRESHOLD`] against the confirmed title; each one
//!    confirmed is persisted under its own spelling
//!
//! # Pitch correction fan-out
//! 1. Rows with a byte-identical raw token are updated unconditionally
//! 2. Tokens equal after lowercasing and removing whitespace are offered and
//!    applied only after confirmation, each persisted under its own token
//!
//! Persistence failures never undo the in-memory change; they are logged and
//! reported in the outcome.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use crate::client::{song_mapping_key, Lookup, SongbookStore};
use crate::error::{ReconcileError, ReconcileResult};
use crate::models::{
    ImportStatus, ImportSummary, PreviewItem, RawImportRow, Singer, Song, SongMapping,
    SongMatchKind, StatusCounts,
};
use crate::services::pitch_normalizer::{
    clean_pitch_token, is_blank_pitch, is_canonical_pitch, PitchTable,
};
use crate::services::song_matcher::{similarity, top_matches};
use crate::services::unmatched_export::export_unmatched_csv;
use crate::workflow::commit::execute_import;
use crate::workflow::preview::{create_preview, sort_items, SongMappingCache};

/// Minimum similarity accepted by [`ReconciliationSession::auto_match_all`]
pub const AUTO_MATCH_THRESHOLD: u8 = 80;

/// Minimum similarity for a spelling to be offered after a song correction
pub const SIMILAR_SONG_THRESHOLD: u8 = 80;

/// Other unmatched spelling offered after a song correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarSong {
    /// Original spelling from the source rows
    pub song_name: String,
    /// Similarity against the confirmed catalog title
    pub similarity: u8,
    /// Number of unmatched rows with this spelling
    pub row_count: usize,
}

/// Other unrecognized token offered after a pitch correction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimilarPitch {
    pub token: String,
    pub row_count: usize,
}

/// Result of a manual song selection
#[derive(Debug, Clone, Serialize)]
pub struct SongCorrection {
    pub song: Song,
    /// Rows updated, including the selected one
    pub updated_items: usize,
    /// Set when the mapping could not be saved
    pub persist_error: Option<String>,
    /// Spellings awaiting confirmation, highest similarity first
    pub similar: Vec<SimilarSong>,
}

/// Result of a manual pitch mapping
#[derive(Debug, Clone, Serialize)]
pub struct PitchCorrection {
    pub canonical: String,
    pub updated_items: usize,
    pub persist_error: Option<String>,
    /// Tokens awaiting confirmation, in preview order
    pub similar: Vec<SimilarPitch>,
}

/// Result of applying a correction to confirmed near-duplicates
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfirmedCorrection {
    pub updated_items: usize,
    /// One message per mapping that could not be saved
    pub persist_errors: Vec<String>,
}

/// Result of undoing one row's correction
#[derive(Debug, Clone, Serialize)]
pub struct UndoOutcome {
    pub status: ImportStatus,
    pub persist_error: Option<String>,
}

/// Result of [`ReconciliationSession::auto_match_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AutoMatchOutcome {
    /// `needs_song` rows examined
    pub examined: usize,
    /// Rows that received a song
    pub matched: usize,
}

/// Whitespace- and case-insensitive pitch key for near-duplicate detection
fn loose_pitch_key(raw: &str) -> String {
    clean_pitch_token(raw).to_lowercase()
}

/// One import's reconciliation state
pub struct ReconciliationSession {
    session_id: Uuid,
    store: Arc<dyn SongbookStore>,
    songs: Vec<Song>,
    singers: Vec<Singer>,
    items: Vec<PreviewItem>,
    pitch_table: PitchTable,
    song_cache: SongMappingCache,
}

impl ReconciliationSession {
    /// Load the catalog and persisted mappings, then build the preview
    ///
    /// Fails with [`ReconcileError::Setup`] if songs or singers cannot be
    /// fetched. Mapping lookup failures are logged and treated as not found.
    pub async fn start(
        store: Arc<dyn SongbookStore>,
        rows: Vec<RawImportRow>,
    ) -> ReconcileResult<Self> {
        let session_id = Uuid::new_v4();
        tracing::info!(session_id = %session_id, rows = rows.len(), "Starting import session");

        let songs = store
            .list_songs()
            .await
            .map_err(|e| ReconcileError::Setup(format!("Failed to load songs: {e}")))?;
        let singers = store
            .list_singers()
            .await
            .map_err(|e| ReconcileError::Setup(format!("Failed to load singers: {e}")))?;

        tracing::debug!(songs = songs.len(), singers = singers.len(), "Catalog loaded");

        let mut song_cache = SongMappingCache::new();
        let mut pitch_table = PitchTable::new();
        let mut seen_songs = HashSet::new();
        let mut seen_tokens = HashSet::new();

        for row in rows.iter().filter(|row| !is_blank_pitch(&row.pitch)) {
            let key = song_mapping_key(&row.song_name);
            if !key.is_empty() && seen_songs.insert(key.clone()) {
                match store.lookup_song_mapping(&key).await {
                    Ok(Lookup::Found(mapping)) => {
                        tracing::debug!(song = %row.song_name, song_id = %mapping.song_id, "Loaded song mapping");
                        song_cache.insert(key, mapping);
                    }
                    Ok(Lookup::NotFound) => {}
                    Err(e) => {
                        tracing::warn!(song = %row.song_name, error = %e, "Song mapping lookup failed, treating as not found");
                    }
                }
            }

            // Recognized tokens are looked up too: a stored override wins
            let token = clean_pitch_token(&row.pitch);
            if !token.is_empty() && seen_tokens.insert(token.clone()) {
                match store.lookup_pitch_mapping(&token).await {
                    Ok(Lookup::Found(canonical)) => {
                        pitch_table.add_mapping(&token, &canonical);
                    }
                    Ok(Lookup::NotFound) => {}
                    Err(e) => {
                        tracing::warn!(token = %token, error = %e, "Pitch mapping lookup failed, treating as not found");
                    }
                }
            }
        }

        let items = create_preview(&rows, &singers, &songs, &song_cache, &pitch_table);
        let session = Self {
            session_id,
            store,
            songs,
            singers,
            items,
            pitch_table,
            song_cache,
        };

        let counts = session.status_counts();
        tracing::info!(
            session_id = %session.session_id,
            ready = counts.ready,
            needs_song = counts.needs_song,
            needs_pitch = counts.needs_pitch,
            dropped = counts.dropped,
            "Preview ready"
        );

        Ok(session)
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Items in display order
    pub fn items(&self) -> &[PreviewItem] {
        &self.items
    }

    pub fn item(&self, item_id: usize) -> Option<&PreviewItem> {
        self.items.iter().find(|item| item.id == item_id)
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn singers(&self) -> &[Singer] {
        &self.singers
    }

    pub fn pitch_table(&self) -> &PitchTable {
        &self.pitch_table
    }

    pub fn status_counts(&self) -> StatusCounts {
        StatusCounts::tally(&self.items)
    }

    fn position(&self, item_id: usize) -> ReconcileResult<usize> {
        self.items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or(ReconcileError::ItemNotFound(item_id))
    }

    /// Index of a correctable (non-dropped) item
    fn correctable(&self, item_id: usize) -> ReconcileResult<usize> {
        let index = self.position(item_id)?;
        if self.items[index].is_dropped() {
            return Err(ReconcileError::InvalidInput(format!(
                "Item {item_id} was dropped and cannot be corrected"
            )));
        }
        Ok(index)
    }

    fn catalog_song(&self, song_id: &str) -> ReconcileResult<Song> {
        self.songs
            .iter()
            .find(|song| song.id == song_id)
            .cloned()
            .ok_or_else(|| ReconcileError::InvalidInput(format!("Unknown song id: {song_id}")))
    }

    fn check_canonical(canonical: &str) -> ReconcileResult<()> {
        if !is_canonical_pitch(canonical) {
            return Err(ReconcileError::InvalidInput(format!(
                "\"{canonical}\" is not a canonical pitch"
            )));
        }
        Ok(())
    }

    /// Persist a song mapping under `raw_song_name` and cache it
    async fn remember_song(&mut self, raw_song_name: &str, song: &Song) -> Option<String> {
        self.song_cache
            .insert(song_mapping_key(raw_song_name), SongMapping::from(song));

        match self
            .store
            .save_song_mapping(raw_song_name, &song.id, &song.name)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(song = %raw_song_name, song_id = %song.id, error = %e, "Failed to save song mapping");
                Some(e.to_string())
            }
        }
    }

    /// Persist a pitch mapping under the cleaned `raw_token` and add it to the table
    async fn remember_pitch(&mut self, raw_token: &str, canonical: &str) -> Option<String> {
        let token = clean_pitch_token(raw_token);
        self.pitch_table.add_mapping(&token, canonical);

        match self.store.save_pitch_mapping(&token, canonical).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(token = %token, canonical = %canonical, error = %e, "Failed to save pitch mapping");
                Some(e.to_string())
            }
        }
    }

    /// Set `song` on every non-dropped item whose original name is `raw_song_name`
    fn apply_song_to_name(&mut self, raw_song_name: &str, song: &Song) -> usize {
        let score = similarity(raw_song_name, &song.name);
        let mut updated = 0;
        for item in self
            .items
            .iter_mut()
            .filter(|item| !item.is_dropped() && item.row.song_name == raw_song_name)
        {
            item.set_song(song, SongMatchKind::Manual, Some(score));
            item.recompute_status();
            updated += 1;
        }
        updated
    }

    /// Set `canonical` on every non-dropped item whose raw pitch is `raw_token`
    fn apply_pitch_to_token(&mut self, raw_token: &str, canonical: &str) -> usize {
        let mut updated = 0;
        for item in self
            .items
            .iter_mut()
            .filter(|item| !item.is_dropped() && item.row.pitch == raw_token)
        {
            item.set_pitch(canonical);
            item.recompute_status();
            updated += 1;
        }
        updated
    }

    fn similar_songs(&self, confirmed_name: &str, song: &Song) -> Vec<SimilarSong> {
        let mut similar: Vec<SimilarSong> = Vec::new();
        for item in self
            .items
            .iter()
            .filter(|item| !item.is_dropped() && !item.has_song())
            .filter(|item| item.row.song_name != confirmed_name)
        {
            if let Some(existing) = similar
                .iter_mut()
                .find(|s| s.song_name == item.row.song_name)
            {
                existing.row_count += 1;
                continue;
            }

            let score = similarity(&item.row.song_name, &song.name);
            if score >= SIMILAR_SONG_THRESHOLD {
                similar.push(SimilarSong {
                    song_name: item.row.song_name.clone(),
                    similarity: score,
                    row_count: 1,
                });
            }
        }
        similar.sort_by(|a, b| b.similarity.cmp(&a.similarity));
        similar
    }

    fn similar_pitches(&self, raw_token: &str) -> Vec<SimilarPitch> {
        let key = loose_pitch_key(raw_token);
        let mut similar: Vec<SimilarPitch> = Vec::new();
        for item in self.items.iter().filter(|item| {
            !item.is_dropped()
                && !item.pitch_recognized
                && item.row.pitch != raw_token
                && loose_pitch_key(&item.row.pitch) == key
        }) {
            match similar.iter_mut().find(|s| s.token == item.row.pitch) {
                Some(existing) => existing.row_count += 1,
                None => similar.push(SimilarPitch {
                    token: item.row.pitch.clone(),
                    row_count: 1,
                }),
            }
        }
        similar
    }

    /// Manually select the song for one row and fan out to identical names
    pub async fn apply_song_match(
        &mut self,
        item_id: usize,
        song_id: &str,
    ) -> ReconcileResult<SongCorrection> {
        let index = self.correctable(item_id)?;
        let song = self.catalog_song(song_id)?;
        let raw_song_name = self.items[index].row.song_name.clone();

        let persist_error = self.remember_song(&raw_song_name, &song).await;
        let updated_items = self.apply_song_to_name(&raw_song_name, &song);
        let similar = self.similar_songs(&raw_song_name, &song);
        sort_items(&mut self.items);

        tracing::info!(
            item_id,
            song = %raw_song_name,
            song_id = %song.id,
            updated = updated_items,
            similar = similar.len(),
            "Applied manual song match"
        );

        Ok(SongCorrection {
            song,
            updated_items,
            persist_error,
            similar,
        })
    }

    /// Apply a confirmed song to other spellings, persisting each one
    pub async fn apply_song_to_similar(
        &mut self,
        song_names: &[String],
        song_id: &str,
    ) -> ReconcileResult<ConfirmedCorrection> {
        let song = self.catalog_song(song_id)?;
        let mut outcome = ConfirmedCorrection::default();

        for raw_song_name in song_names {
            if let Some(error) = self.remember_song(raw_song_name, &song).await {
                outcome.persist_errors.push(format!("{raw_song_name}: {error}"));
            }
            outcome.updated_items += self.apply_song_to_name(raw_song_name, &song);
        }
        sort_items(&mut self.items);

        tracing::info!(song_id = %song.id, names = song_names.len(), updated = outcome.updated_items, "Applied song to similar names");
        Ok(outcome)
    }

    /// Manually map one row's pitch token and fan out to identical tokens
    ///
    /// `canonical` must already be in the canonical vocabulary.
    pub async fn apply_pitch_mapping(
        &mut self,
        item_id: usize,
        canonical: &str,
    ) -> ReconcileResult<PitchCorrection> {
        Self::check_canonical(canonical)?;
        let index = self.correctable(item_id)?;
        let raw_token = self.items[index].row.pitch.clone();

        let persist_error = self.remember_pitch(&raw_token, canonical).await;
        let updated_items = self.apply_pitch_to_token(&raw_token, canonical);
        let similar = self.similar_pitches(&raw_token);
        sort_items(&mut self.items);

        tracing::info!(
            item_id,
            token = %raw_token,
            canonical = %canonical,
            updated = updated_items,
            similar = similar.len(),
            "Applied manual pitch mapping"
        );

        Ok(PitchCorrection {
            canonical: canonical.to_string(),
            updated_items,
            persist_error,
            similar,
        })
    }

    /// Apply a confirmed pitch to near-duplicate tokens, persisting each one
    pub async fn apply_pitch_to_similar(
        &mut self,
        tokens: &[String],
        canonical: &str,
    ) -> ReconcileResult<ConfirmedCorrection> {
        Self::check_canonical(canonical)?;
        let mut outcome = ConfirmedCorrection::default();

        for token in tokens {
            if let Some(error) = self.remember_pitch(token, canonical).await {
                outcome.persist_errors.push(format!("{token}: {error}"));
            }
            outcome.updated_items += self.apply_pitch_to_token(token, canonical);
        }
        sort_items(&mut self.items);

        tracing::info!(canonical = %canonical, tokens = tokens.len(), updated = outcome.updated_items, "Applied pitch to similar tokens");
        Ok(outcome)
    }

    /// Undo the song resolution of exactly one row
    ///
    /// Deletes the stored mapping for the row's original name and drops the
    /// cache entry. Other rows that received the same song keep it.
    pub async fn undo_song_match(&mut self, item_id: usize) -> ReconcileResult<UndoOutcome> {
        let index = self.correctable(item_id)?;
        if !self.items[index].has_song() {
            return Err(ReconcileError::InvalidInput(format!(
                "Item {item_id} has no song to undo"
            )));
        }

        let raw_song_name = self.items[index].row.song_name.clone();
        self.song_cache.remove(&song_mapping_key(&raw_song_name));
        let persist_error = match self.store.delete_song_mapping(&raw_song_name).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(song = %raw_song_name, error = %e, "Failed to delete song mapping");
                Some(e.to_string())
            }
        };

        let item = &mut self.items[index];
        item.clear_song();
        item.recompute_status();
        if let Some(message) = item.error_message.take() {
            item.error_message = Some(format!("Song match was undone. {message}"));
        }
        let status = item.status;
        sort_items(&mut self.items);

        tracing::info!(item_id, song = %raw_song_name, "Undid song match");
        Ok(UndoOutcome {
            status,
            persist_error,
        })
    }

    /// Undo the pitch resolution of exactly one row
    pub async fn undo_pitch_mapping(&mut self, item_id: usize) -> ReconcileResult<UndoOutcome> {
        let index = self.correctable(item_id)?;
        if !self.items[index].pitch_recognized {
            return Err(ReconcileError::InvalidInput(format!(
                "Item {item_id} has no pitch to undo"
            )));
        }

        let token = clean_pitch_token(&self.items[index].row.pitch);
        self.pitch_table.remove_mapping(&token);
        let persist_error = match self.store.delete_pitch_mapping(&token).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!(token = %token, error = %e, "Failed to delete pitch mapping");
                Some(e.to_string())
            }
        };

        let item = &mut self.items[index];
        item.clear_pitch();
        item.recompute_status();
        if let Some(message) = item.error_message.take() {
            item.error_message = Some(format!("Pitch mapping was undone. {message}"));
        }
        let status = item.status;
        sort_items(&mut self.items);

        tracing::info!(item_id, token = %token, "Undid pitch mapping");
        Ok(UndoOutcome {
            status,
            persist_error,
        })
    }

    /// Match every `needs_song` row to its best catalog song at
    /// [`AUTO_MATCH_THRESHOLD`]
    ///
    /// Matches are marked fuzzy and are not persisted.
    pub fn auto_match_all(&mut self) -> AutoMatchOutcome {
        let mut outcome = AutoMatchOutcome::default();

        for item in self
            .items
            .iter_mut()
            .filter(|item| item.status == ImportStatus::NeedsSong)
        {
            outcome.examined += 1;
            let Some(best) = top_matches(&item.row.song_name, &self.songs, 1)
                .into_iter()
                .next()
            else {
                continue;
            };

            if best.similarity >= AUTO_MATCH_THRESHOLD {
                tracing::debug!(
                    item_id = item.id,
                    song = %item.row.song_name,
                    matched = %best.song.name,
                    similarity = best.similarity,
                    "Auto-matched"
                );
                item.set_song(best.song, SongMatchKind::Fuzzy, Some(best.similarity));
                item.recompute_status();
                outcome.matched += 1;
            }
        }
        sort_items(&mut self.items);

        tracing::info!(examined = outcome.examined, matched = outcome.matched, "Auto-match complete");
        outcome
    }

    /// Remove one row from the session
    pub fn skip_item(&mut self, item_id: usize) -> ReconcileResult<PreviewItem> {
        let index = self.position(item_id)?;
        let item = self.items.remove(index);
        tracing::debug!(item_id, song = %item.row.song_name, "Skipped item");
        Ok(item)
    }

    /// Unresolved rows as CSV
    pub fn export_unmatched(&self) -> ReconcileResult<String> {
        export_unmatched_csv(&self.items)
    }

    /// Remove all unresolved rows; returns how many were removed
    pub fn discard_unmatched(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|item| !item.status.is_unresolved());
        let removed = before - self.items.len();
        tracing::info!(removed, "Discarded unmatched rows");
        removed
    }

    /// Commit every ready row
    pub async fn commit(&self) -> ImportSummary {
        execute_import(&*self.store, &self.items, &self.singers).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_pitch_key() {
        assert_eq!(loose_pitch_key("5 M"), loose_pitch_key("5m"));
        assert_ne!(loose_pitch_key("5 M"), loose_pitch_key("5 Pancham"));
    }

    #[test]
    fn test_thresholds_are_distinct_from_preview() {
        assert!(AUTO_MATCH_THRESHOLD < crate::workflow::preview::PREVIEW_MATCH_THRESHOLD);
        assert_eq!(SIMILAR_SONG_THRESHOLD, 80);
    }
}
