//! Bulk commit of ready items
//!
//! Runs sequentially in two phases:
//! 1. Create every singer referenced by a ready item that is not yet in the
//!    catalog (case-insensitive dedup; "already existed" is not an error)
//! 2. Upsert one pitch record per ready item
//!
//! A failing singer fails every item that needed it. A failing pitch upsert
//! fails only that item. Neither stops the batch.

use std::collections::HashMap;

use crate::client::CatalogStore;
use crate::models::{ImportStatus, ImportSummary, PreviewItem, Singer};
use crate::workflow::preview::find_singer;

fn singer_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Commit every `ready` item; other statuses are ignored
pub async fn execute_import<S>(
    store: &S,
    items: &[PreviewItem],
    existing_singers: &[Singer],
) -> ImportSummary
where
    S: CatalogStore + ?Sized,
{
    let mut summary = ImportSummary::new();
    let ready: Vec<&PreviewItem> = items
        .iter()
        .filter(|item| item.status == ImportStatus::Ready)
        .collect();

    tracing::info!(items = ready.len(), "Starting bulk import");

    // Phase 1: singers
    let mut singer_ids: HashMap<String, String> = HashMap::new();
    let mut singer_errors: HashMap<String, String> = HashMap::new();

    for item in &ready {
        let key = singer_key(&item.row.singer_name);
        if singer_ids.contains_key(&key) || singer_errors.contains_key(&key) {
            continue;
        }

        if let Some(id) = item.singer_id.as_ref().filter(|_| item.singer_exists) {
            singer_ids.insert(key, id.clone());
            continue;
        }

        if let Some(singer) = find_singer(existing_singers, &item.row.singer_name) {
            singer_ids.insert(key, singer.id.clone());
            continue;
        }

        match store.create_singer(item.row.singer_name.trim()).await {
            Ok(created) => {
                if created.created_new {
                    summary.singers_created += 1;
                    tracing::debug!(singer = %created.singer.name, singer_id = %created.singer.id, "Created singer");
                } else {
                    tracing::debug!(singer = %created.singer.name, "Singer already existed");
                }
                singer_ids.insert(key, created.singer.id);
            }
            Err(e) => {
                tracing::warn!(singer = %item.row.singer_name, error = %e, "Failed to create singer");
                singer_errors.insert(key, e.to_string());
            }
        }
    }

    // Phase 2: pitches
    for item in &ready {
        let key = singer_key(&item.row.singer_name);

        if let Some(error) = singer_errors.get(&key) {
            summary.record_failure(
                &item.row.singer_name,
                &item.row.song_name,
                format!("Singer could not be created: {error}"),
            );
            continue;
        }

        let (Some(singer_id), Some(song_id), Some(pitch)) = (
            singer_ids.get(&key),
            item.song_id.as_deref(),
            item.normalized_pitch.as_deref(),
        ) else {
            summary.record_failure(
                &item.row.singer_name,
                &item.row.song_name,
                "Item is missing a singer, song or pitch",
            );
            continue;
        };

        match store.upsert_pitch(song_id, singer_id, pitch).await {
            Ok(outcome) if outcome.created => summary.pitches_created += 1,
            Ok(outcome) if outcome.updated => summary.pitches_updated += 1,
            Ok(_) => summary.pitches_unchanged += 1,
            Err(e) => {
                tracing::warn!(
                    item_id = item.id,
                    song = %item.row.song_name,
                    singer = %item.row.singer_name,
                    error = %e,
                    "Pitch upsert failed"
                );
                summary.record_failure(&item.row.singer_name, &item.row.song_name, e.to_string());
            }
        }
    }

    summary.finish();

    tracing::info!(
        singers_created = summary.singers_created,
        created = summary.pitches_created,
        updated = summary.pitches_updated,
        unchanged = summary.pitches_unchanged,
        failed = summary.failed(),
        duration_ms = summary.duration_ms,
        "Bulk import complete"
    );

    summary
}
