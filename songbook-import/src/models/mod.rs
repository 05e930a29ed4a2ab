//! Data models for songbook-import
//!
//! - Catalog records shared with the REST collaborator
//! - Preview items and their status state machine
//! - Bulk commit results

pub mod catalog;
pub mod import_result;
pub mod preview_item;

pub use catalog::{CreatedSinger, PitchUpsertOutcome, RawImportRow, Singer, Song, SongMapping};
pub use import_result::{ImportFailure, ImportSummary};
pub use preview_item::{ImportStatus, PreviewItem, SongMatchKind, StatusCounts};
