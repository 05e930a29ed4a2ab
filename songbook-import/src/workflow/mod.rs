//! Import reconciliation workflow
//!
//! # Architecture
//!
//! 1. [`preview`]: pure classification of raw rows into sorted preview items
//! 2. [`session`]: owns the items and applies manual corrections, undo and
//!    auto-match against the collaborator
//! 3. [`commit`]: bulk commit of ready items

pub mod commit;
pub mod preview;
pub mod session;

pub use commit::execute_import;
pub use preview::{create_preview, sort_items, SongMappingCache, PREVIEW_MATCH_THRESHOLD};
pub use session::{
    AutoMatchOutcome, ConfirmedCorrection, PitchCorrection, ReconciliationSession, SimilarPitch,
    SimilarSong, SongCorrection, UndoOutcome, AUTO_MATCH_THRESHOLD, SIMILAR_SONG_THRESHOLD,
};
