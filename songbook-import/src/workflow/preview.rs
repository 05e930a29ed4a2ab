//! Preview generation
//!
//! Classifies each raw row into a [`PreviewItem`].
//!
//! # Song resolution order
//! 1. Song-mapping cache (previously confirmed corrections), exact
//! 2. [`best_match`] against the catalog at [`PREVIEW_MATCH_THRESHOLD`]
//! 3. Unique normalized-prefix fallback: auto-selected only if exactly one
//!    catalog title starts with the query
//!
//! Exact resolutions carry no similarity; fuzzy ones carry their score.
//!
//! # Sort policy
//! `needs_song < needs_pitch < ready < pending < error < dropped`, so rows
//! needing attention float to the top. Within a status, items keep input
//! order (item ids are input positions), no matter how often they re-sort.

use std::collections::HashMap;

use crate::client::song_mapping_key;
use crate::models::{PreviewItem, RawImportRow, Singer, Song, SongMapping, SongMatchKind};
use crate::services::pitch_normalizer::{is_blank_pitch, PitchTable};
use crate::services::song_matcher::{best_match, similarity, unique_prefix_match};

/// Minimum similarity for automatic matching while building the preview
pub const PREVIEW_MATCH_THRESHOLD: u8 = 90;

/// Normalized song-name key → confirmed song
pub type SongMappingCache = HashMap<String, SongMapping>;

/// A song resolved for a row, with how it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSong {
    pub song: Song,
    pub kind: SongMatchKind,
    pub similarity: Option<u8>,
}

/// Find a singer by case-insensitive, trimmed name
pub fn find_singer<'a>(singers: &'a [Singer], name: &str) -> Option<&'a Singer> {
    let wanted = name.trim().to_lowercase();
    singers
        .iter()
        .find(|singer| singer.name.trim().to_lowercase() == wanted)
}

/// Resolve a source song name against the cache and the catalog
pub fn resolve_song(
    song_name: &str,
    songs: &[Song],
    cache: &SongMappingCache,
) -> Option<ResolvedSong> {
    if let Some(mapping) = cache.get(&song_mapping_key(song_name)) {
        tracing::debug!(song = %song_name, song_id = %mapping.song_id, "Resolved from stored mapping");
        return Some(ResolvedSong {
            song: Song::new(mapping.song_id.clone(), mapping.song_name.clone()),
            kind: SongMatchKind::Exact,
            similarity: None,
        });
    }

    if let Some(hit) = best_match(song_name, songs, PREVIEW_MATCH_THRESHOLD) {
        let (kind, similarity) = if hit.similarity == 100 {
            (SongMatchKind::Exact, None)
        } else {
            (SongMatchKind::Fuzzy, Some(hit.similarity))
        };
        tracing::debug!(song = %song_name, matched = %hit.song.name, similarity = hit.similarity, "Resolved from catalog");
        return Some(ResolvedSong {
            song: hit.song.clone(),
            kind,
            similarity,
        });
    }

    let song = unique_prefix_match(song_name, songs)?;
    let score = similarity(song_name, &song.name);
    tracing::debug!(song = %song_name, matched = %song.name, similarity = score, "Resolved by unique prefix");
    Some(ResolvedSong {
        song: song.clone(),
        kind: SongMatchKind::Fuzzy,
        similarity: Some(score),
    })
}

/// Build one preview item
pub fn classify_row(
    id: usize,
    row: RawImportRow,
    singers: &[Singer],
    songs: &[Song],
    cache: &SongMappingCache,
    pitch_table: &PitchTable,
) -> PreviewItem {
    if is_blank_pitch(&row.pitch) {
        tracing::debug!(item_id = id, song = %row.song_name, "Blank pitch, dropping row");
        return PreviewItem::dropped(id, row);
    }

    let mut item = PreviewItem::pending(id, row);

    if let Some(canonical) = pitch_table.normalize(&item.row.pitch) {
        item.set_pitch(canonical);
    }

    if let Some(singer) = find_singer(singers, &item.row.singer_name) {
        item.singer_id = Some(singer.id.clone());
        item.singer_exists = true;
    }

    if let Some(resolved) = resolve_song(&item.row.song_name, songs, cache) {
        item.set_song(&resolved.song, resolved.kind, resolved.similarity);
    }

    item.recompute_status();
    item
}

/// Build the sorted preview for a batch of rows
pub fn create_preview(
    rows: &[RawImportRow],
    singers: &[Singer],
    songs: &[Song],
    cache: &SongMappingCache,
    pitch_table: &PitchTable,
) -> Vec<PreviewItem> {
    let mut items: Vec<PreviewItem> = rows
        .iter()
        .cloned()
        .enumerate()
        .map(|(id, row)| classify_row(id, row, singers, songs, cache, pitch_table))
        .collect();

    sort_items(&mut items);
    items
}

/// Reorder items by status priority, keeping input order within a status
pub fn sort_items(items: &mut [PreviewItem]) {
    items.sort_by_key(|item| (item.status.sort_priority(), item.id));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImportStatus;

    fn songs() -> Vec<Song> {
        vec![
            Song::new("1", "Om Namah Shivaya"),
            Song::new("2", "Raghu Pathey Raaghava Raja Rama"),
        ]
    }

    fn item_with_status(id: usize, status: ImportStatus) -> PreviewItem {
        let mut item = PreviewItem::pending(id, RawImportRow::new("S", "T", "C"));
        item.status = status;
        item
    }

    #[test]
    fn test_sort_is_stable_by_priority() {
        let mut items = vec![
            item_with_status(0, ImportStatus::Ready),
            item_with_status(1, ImportStatus::NeedsSong),
            item_with_status(2, ImportStatus::Dropped),
            item_with_status(3, ImportStatus::NeedsPitch),
            item_with_status(4, ImportStatus::NeedsSong),
        ];

        sort_items(&mut items);

        let order: Vec<(usize, ImportStatus)> = items.iter().map(|i| (i.id, i.status)).collect();
        assert_eq!(
            order,
            vec![
                (1, ImportStatus::NeedsSong),
                (4, ImportStatus::NeedsSong),
                (3, ImportStatus::NeedsPitch),
                (0, ImportStatus::Ready),
                (2, ImportStatus::Dropped),
            ]
        );
    }

    #[test]
    fn test_cache_hit_skips_fuzzy_matching() {
        let mut cache = SongMappingCache::new();
        cache.insert(
            song_mapping_key("Shiva Bhajan"),
            SongMapping {
                song_id: "1".to_string(),
                song_name: "Om Namah Shivaya".to_string(),
            },
        );

        let resolved = resolve_song("shiva bhajan!", &songs(), &cache).unwrap();
        assert_eq!(resolved.song.id, "1");
        assert_eq!(resolved.kind, SongMatchKind::Exact);
        assert_eq!(resolved.similarity, None);
    }

    #[test]
    fn test_exact_catalog_match_has_no_similarity() {
        let resolved = resolve_song("om namah shivaya.", &songs(), &SongMappingCache::new()).unwrap();
        assert_eq!(resolved.song.id, "1");
        assert_eq!(resolved.kind, SongMatchKind::Exact);
        assert_eq!(resolved.similarity, None);
    }

    #[test]
    fn test_prefix_fallback_records_similarity() {
        let resolved = resolve_song("Raghu Pathey", &songs(), &SongMappingCache::new()).unwrap();
        assert_eq!(resolved.song.id, "2");
        assert_eq!(resolved.kind, SongMatchKind::Fuzzy);
        assert_eq!(resolved.similarity, Some(82));
    }

    #[test]
    fn test_blank_pitch_dropped_even_when_resolvable() {
        for pitch in ["-", "", "N/A", "null", "NULL", "n/a"] {
            let item = classify_row(
                0,
                RawImportRow::new("Ameya", "Om Namah Shivaya", pitch),
                &[Singer::new("s1", "Ameya")],
                &songs(),
                &SongMappingCache::new(),
                &PitchTable::new(),
            );
            assert_eq!(item.status, ImportStatus::Dropped, "{pitch:?}");
            assert!(item.song_id.is_none());
        }
    }

    #[test]
    fn test_singer_lookup_case_insensitive() {
        let singers = vec![Singer::new("s1", "Ameya")];
        let item = classify_row(
            0,
            RawImportRow::new("  ameya ", "Om Namah Shivaya", "G"),
            &singers,
            &songs(),
            &SongMappingCache::new(),
            &PitchTable::new(),
        );
        assert!(item.singer_exists);
        assert_eq!(item.singer_id.as_deref(), Some("s1"));
        assert_eq!(item.status, ImportStatus::Ready);
    }

    #[test]
    fn test_unrecognized_pitch_needs_pitch() {
        let item = classify_row(
            0,
            RawImportRow::new("Ameya", "Om Namah Shivaya", "5 Kali"),
            &[],
            &songs(),
            &SongMappingCache::new(),
            &PitchTable::new(),
        );
        assert_eq!(item.status, ImportStatus::NeedsPitch);
        assert!(!item.singer_exists);
    }
}
