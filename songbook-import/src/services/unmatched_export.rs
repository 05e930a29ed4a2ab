//! Export of unresolved preview items as CSV
//!
//! The header is fixed and unquoted. Every data field is quoted, so titles
//! with embedded delimiters survive a round trip through spreadsheets.

use csv::{QuoteStyle, WriterBuilder};

use crate::error::ReconcileResult;
use crate::models::PreviewItem;

/// Header row of the unmatched export
pub const UNMATCHED_HEADER: &str = "Song Title,Singer,Pitch,Issue";

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, csv::Error> {
    writer
        .into_inner()
        .map_err(|err| csv::Error::from(err.into_error()))
}

/// Render unresolved items (`needs_song`, `needs_pitch`, `error`) as CSV
pub fn export_unmatched_csv<'a>(
    items: impl IntoIterator<Item = &'a PreviewItem>,
) -> ReconcileResult<String> {
    let mut header = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());
    header.write_record(UNMATCHED_HEADER.split(','))?;

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(finish(header)?);

    let mut exported = 0usize;
    for item in items.into_iter().filter(|i| i.status.is_unresolved()) {
        let issue = item.error_message.as_deref().unwrap_or(item.status.as_str());
        writer.write_record([
            item.row.song_name.as_str(),
            item.row.singer_name.as_str(),
            item.row.pitch.as_str(),
            issue,
        ])?;
        exported += 1;
    }

    let bytes = finish(writer)?;
    tracing::debug!(exported, bytes = bytes.len(), "Rendered unmatched export");
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawImportRow, Song, SongMatchKind};

    #[test]
    fn test_only_unresolved_rows_exported() {
        let mut needs_song = PreviewItem::pending(0, RawImportRow::new("Ameya", "Unknown Song", "5M"));
        needs_song.set_pitch("G major");
        needs_song.recompute_status();

        let mut ready = PreviewItem::pending(1, RawImportRow::new("Ravi", "Om Sai Ram", "C"));
        ready.set_song(&Song::new("1", "Om Sai Ram"), SongMatchKind::Exact, None);
        ready.set_pitch("C");
        ready.recompute_status();

        let dropped = PreviewItem::dropped(2, RawImportRow::new("Ravi", "Other", "-"));

        let csv = export_unmatched_csv([&needs_song, &ready, &dropped]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], UNMATCHED_HEADER);
        assert!(lines[1].starts_with("\"Unknown Song\",\"Ameya\",\"5M\","));
        assert!(lines[1].contains("No matching song found"));
    }

    #[test]
    fn test_title_quotes_escaped() {
        let mut item = PreviewItem::pending(0, RawImportRow::new("Ameya, Jr", "Say \"Ram\"", "5M"));
        item.set_pitch("G major");
        item.recompute_status();

        let csv = export_unmatched_csv([&item]).unwrap();
        let line = csv.lines().nth(1).unwrap();
        assert!(line.starts_with("\"Say \"\"Ram\"\"\",\"Ameya, Jr\",\"5M\","));
    }

    #[test]
    fn test_export_reads_back_with_csv_reader() {
        let mut item = PreviewItem::pending(0, RawImportRow::new("Ravi", "Line\nBreak, \"Quoted\"", "5M"));
        item.set_pitch("G major");
        item.recompute_status();

        let csv = export_unmatched_csv([&item]).unwrap();
        let mut reader = csv::Reader::from_reader(csv.as_bytes());

        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), UNMATCHED_HEADER.split(',').collect::<Vec<_>>());

        let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 1);
        assert_eq!(&records[0][0], "Line\nBreak, \"Quoted\"");
        assert_eq!(&records[0][1], "Ravi");
        assert!(records[0][3].starts_with("No matching song found"));
    }

    #[test]
    fn test_header_only_when_nothing_unresolved() {
        let dropped = PreviewItem::dropped(0, RawImportRow::new("Ravi", "Other", "-"));
        let csv = export_unmatched_csv([&dropped]).unwrap();
        assert_eq!(csv, format!("{UNMATCHED_HEADER}\n"));
    }
}
