//! Import text parser
//!
//! Turns pasted or uploaded delimiter-separated text into typed
//! [`RawImportRow`]s.
//!
//! - Delimiter: tab when the first non-empty line contains one, else comma
//! - Standard CSV quoting; `""` inside a quoted field is a literal quote
//! - Column order: song, singer, pitch
//! - A first line with a song column label (`Song`, `Song Title`, `Song Name`)
//!   and a `Singer` / `Singer Name` label is a header and skipped
//! - Lines with fewer than three fields, or a blank song or singer, are
//!   skipped silently (counted in [`ParsedImport::skipped_lines`])

use crate::error::ReconcileResult;
use crate::models::RawImportRow;

const SONG_LABELS: [&str; 3] = ["song", "song title", "song name"];
const SINGER_LABELS: [&str; 2] = ["singer", "singer name"];

/// Result of parsing import text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedImport {
    pub rows: Vec<RawImportRow>,
    /// Records discarded for missing fields
    pub skipped_lines: usize,
    pub header_skipped: bool,
}

fn detect_delimiter(text: &str) -> u8 {
    let first_line = text.lines().find(|line| !line.trim().is_empty()).unwrap_or("");
    if first_line.contains('\t') {
        b'\t'
    } else {
        b','
    }
}

fn is_header(record: &csv::StringRecord) -> bool {
    let labels: Vec<String> = record.iter().map(|cell| cell.trim().to_lowercase()).collect();
    let has = |wanted: &[&str]| labels.iter().any(|label| wanted.contains(&label.as_str()));
    has(&SONG_LABELS) && has(&SINGER_LABELS)
}

/// Parse import text into rows
pub fn parse_import_text(text: &str) -> ReconcileResult<ParsedImport> {
    let text = text.trim_start_matches('\u{FEFF}');
    let delimiter = detect_delimiter(text);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let mut parsed = ParsedImport::default();

    for (index, result) in reader.records().enumerate() {
        let record = result?;

        if index == 0 && is_header(&record) {
            parsed.header_skipped = true;
            continue;
        }

        if record.len() < 3 {
            parsed.skipped_lines += 1;
            continue;
        }

        let song_name = record.get(0).unwrap_or_default();
        let singer_name = record.get(1).unwrap_or_default();
        let pitch = record.get(2).unwrap_or_default();

        if song_name.is_empty() || singer_name.is_empty() {
            parsed.skipped_lines += 1;
            continue;
        }

        parsed
            .rows
            .push(RawImportRow::new(singer_name, song_name, pitch));
    }

    tracing::debug!(
        rows = parsed.rows.len(),
        skipped = parsed.skipped_lines,
        header = parsed.header_skipped,
        delimiter = %(delimiter as char).escape_default(),
        "Parsed import text"
    );

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_and_rows() {
        let text = "Song Title,Singer,Pitch\nOm Namah Shivaya,Shambhavi,G\nRaghu Pathey,Ameya,4m\n";
        let parsed = parse_import_text(text).unwrap();

        assert!(parsed.header_skipped);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0], RawImportRow::new("Shambhavi", "Om Namah Shivaya", "G"));
        assert_eq!(parsed.rows[1].pitch, "4m");
    }

    #[test]
    fn test_quoted_fields_with_delimiters_and_quotes() {
        let text = "\"Govinda, Gopala\",Ameya,5M\n\"The \"\"Divine\"\" Name\",Ravi,C\n";
        let parsed = parse_import_text(text).unwrap();

        assert!(!parsed.header_skipped);
        assert_eq!(parsed.rows[0].song_name, "Govinda, Gopala");
        assert_eq!(parsed.rows[1].song_name, "The \"Divine\" Name");
    }

    #[test]
    fn test_short_and_blank_rows_skipped() {
        let text = "Om Sai Ram,Ameya\n,Ravi,C\nOm Sai Ram,,C\n\nOm Sai Ram,Ravi,D\n";
        let parsed = parse_import_text(text).unwrap();

        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.skipped_lines, 3);
    }

    #[test]
    fn test_blank_pitch_kept_for_preview() {
        let parsed = parse_import_text("Test Song,NewSinger,-\nOther,Ravi,\n").unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].pitch, "-");
        assert_eq!(parsed.rows[1].pitch, "");
    }

    #[test]
    fn test_first_data_row_mentioning_song_and_singer_kept() {
        let parsed = parse_import_text("Test Song,NewSinger,-\nSinger Song,Ravi,C\n").unwrap();
        assert!(!parsed.header_skipped);
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0], RawImportRow::new("NewSinger", "Test Song", "-"));
    }

    #[test]
    fn test_header_labels_case_and_whitespace_insensitive() {
        let parsed = parse_import_text(" SONG NAME , singer name ,Pitch\nA,B,C\n").unwrap();
        assert!(parsed.header_skipped);
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn test_tab_delimited() {
        let text = "Song\tSinger\tPitch\nOm Sai Ram\tAmeya\t5 M\n";
        let parsed = parse_import_text(text).unwrap();
        assert!(parsed.header_skipped);
        assert_eq!(parsed.rows[0], RawImportRow::new("Ameya", "Om Sai Ram", "5 M"));
    }

    #[test]
    fn test_byte_order_mark_ignored() {
        let parsed = parse_import_text("\u{FEFF}Song,Singer,Pitch\nA,B,C\n").unwrap();
        assert!(parsed.header_skipped);
        assert_eq!(parsed.rows.len(), 1);
    }

    #[test]
    fn test_extra_columns_ignored() {
        let parsed = parse_import_text("A,B,C,notes here\n").unwrap();
        assert_eq!(parsed.rows[0], RawImportRow::new("B", "A", "C"));
    }
}
