//! Preview items and their status state machine
//!
//! Each imported row becomes a [`PreviewItem`] that moves through:
//!
//! ```text
//! pending → ready | needs_song | needs_pitch
//! needs_song / needs_pitch → ready        (song and pitch both resolved)
//! ready / needs_* → needs_song / needs_pitch (undo)
//! dropped                                  (terminal, entered at ingestion only)
//! ```

use serde::{Deserialize, Serialize};

use super::catalog::{RawImportRow, Song};
use crate::services::pitch_normalizer::format_for_display;

/// Status of a preview item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    /// Created but not yet classified
    Pending,
    /// Song resolved and pitch recognized; will be committed
    Ready,
    /// No song resolved
    NeedsSong,
    /// Song resolved but pitch not recognized
    NeedsPitch,
    /// Blank or placeholder pitch; never committed or corrected
    Dropped,
    /// Unexpected failure while classifying
    Error,
}

impl ImportStatus {
    /// Sort priority: rows needing attention first, dropped rows last
    pub fn sort_priority(self) -> u8 {
        match self {
            ImportStatus::NeedsSong => 1,
            ImportStatus::NeedsPitch => 2,
            ImportStatus::Ready => 3,
            ImportStatus::Pending => 4,
            ImportStatus::Error => 5,
            ImportStatus::Dropped => 99,
        }
    }

    /// Still awaiting user action (exported by "export unmatched")
    pub fn is_unresolved(self) -> bool {
        matches!(
            self,
            ImportStatus::NeedsSong | ImportStatus::NeedsPitch | ImportStatus::Error
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ImportStatus::Pending => "pending",
            ImportStatus::Ready => "ready",
            ImportStatus::NeedsSong => "needs_song",
            ImportStatus::NeedsPitch => "needs_pitch",
            ImportStatus::Dropped => "dropped",
            ImportStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the item's song was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongMatchKind {
    /// Normalized title equality or a previously confirmed mapping
    Exact,
    /// Similarity-based match
    Fuzzy,
    /// Chosen by the user
    Manual,
    /// Not resolved
    None,
}

/// Working unit of reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewItem {
    /// Position of the row in the original input; stable across re-sorts
    pub id: usize,
    pub row: RawImportRow,

    pub singer_id: Option<String>,
    pub singer_exists: bool,

    pub song_id: Option<String>,
    /// Catalog title of the resolved song
    pub song_name: Option<String>,
    pub song_match: SongMatchKind,
    /// 0-100, present for fuzzy and manual matches only
    pub song_similarity: Option<u8>,

    pub normalized_pitch: Option<String>,
    pub pitch_recognized: bool,

    pub status: ImportStatus,
    pub error_message: Option<String>,
}

impl PreviewItem {
    /// Create an unclassified item for a row
    pub fn pending(id: usize, row: RawImportRow) -> Self {
        Self {
            id,
            row,
            singer_id: None,
            singer_exists: false,
            song_id: None,
            song_name: None,
            song_match: SongMatchKind::None,
            song_similarity: None,
            normalized_pitch: None,
            pitch_recognized: false,
            status: ImportStatus::Pending,
            error_message: None,
        }
    }

    /// Create a dropped item for a row with a blank or placeholder pitch
    pub fn dropped(id: usize, row: RawImportRow) -> Self {
        let message = if row.pitch.trim().is_empty() {
            "Blank pitch value; row skipped".to_string()
        } else {
            format!("Blank pitch value (\"{}\"); row skipped", row.pitch.trim())
        };
        Self {
            status: ImportStatus::Dropped,
            error_message: Some(message),
            ..Self::pending(id, row)
        }
    }

    pub fn is_dropped(&self) -> bool {
        self.status == ImportStatus::Dropped
    }

    pub fn has_song(&self) -> bool {
        self.song_id.is_some()
    }

    /// Attach a resolved song
    pub fn set_song(&mut self, song: &Song, kind: SongMatchKind, similarity: Option<u8>) {
        self.song_id = Some(song.id.clone());
        self.song_name = Some(song.name.clone());
        self.song_match = kind;
        self.song_similarity = similarity;
    }

    /// Forget the resolved song
    pub fn clear_song(&mut self) {
        self.song_id = None;
        self.song_name = None;
        self.song_match = SongMatchKind::None;
        self.song_similarity = None;
    }

    /// Attach a recognized canonical pitch
    pub fn set_pitch(&mut self, canonical: impl Into<String>) {
        self.normalized_pitch = Some(canonical.into());
        self.pitch_recognized = true;
    }

    /// Pitch label for listings: the resolved pitch when there is one,
    /// otherwise the source token
    pub fn display_pitch(&self) -> String {
        match &self.normalized_pitch {
            Some(canonical) => format_for_display(canonical),
            None => self.row.pitch.clone(),
        }
    }

    /// Forget the recognized pitch
    pub fn clear_pitch(&mut self) {
        self.normalized_pitch = None;
        self.pitch_recognized = false;
    }

    /// Recompute status and message from the two readiness flags
    ///
    /// Dropped items are terminal and never change.
    pub fn recompute_status(&mut self) {
        if self.is_dropped() {
            return;
        }

        match (self.has_song(), self.pitch_recognized) {
            (true, true) => {
                self.status = ImportStatus::Ready;
                self.error_message = None;
            }
            (true, false) => {
                self.status = ImportStatus::NeedsPitch;
                self.error_message = Some(format!(
                    "Unrecognized pitch format \"{}\"",
                    self.row.pitch.trim()
                ));
            }
            (false, pitch_ok) => {
                self.status = ImportStatus::NeedsSong;
                let mut message =
                    format!("No matching song found for \"{}\"", self.row.song_name);
                if !pitch_ok {
                    message.push_str(&format!(
                        "; unrecognized pitch format \"{}\"",
                        self.row.pitch.trim()
                    ));
                }
                self.error_message = Some(message);
            }
        }
    }
}

/// Per-status item counts for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub ready: usize,
    pub needs_song: usize,
    pub needs_pitch: usize,
    pub dropped: usize,
    pub pending: usize,
    pub error: usize,
}

impl StatusCounts {
    pub fn tally<'a>(items: impl IntoIterator<Item = &'a PreviewItem>) -> Self {
        let mut counts = Self::default();
        for item in items {
            match item.status {
                ImportStatus::Ready => counts.ready += 1,
                ImportStatus::NeedsSong => counts.needs_song += 1,
                ImportStatus::NeedsPitch => counts.needs_pitch += 1,
                ImportStatus::Dropped => counts.dropped += 1,
                ImportStatus::Pending => counts.pending += 1,
                ImportStatus::Error => counts.error += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.ready + self.needs_song + self.needs_pitch + self.dropped + self.pending + self.error
    }
}
