//! Stateless import services
//!
//! - Pitch normalization against the canonical vocabulary
//! - Prefix-weighted song name matching
//! - Import text parsing and unmatched-row export

pub mod import_parser;
pub mod pitch_normalizer;
pub mod song_matcher;
pub mod unmatched_export;

pub use import_parser::{parse_import_text, ParsedImport};
pub use pitch_normalizer::{format_for_display, normalize_pitch, PitchTable};
pub use song_matcher::{best_match, similarity, top_matches, SongMatch};
pub use unmatched_export::{export_unmatched_csv, UNMATCHED_HEADER};
