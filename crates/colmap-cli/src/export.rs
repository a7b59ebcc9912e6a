//! CSV export of mapping sessions.

use std::io::Write;

use colmap_model::MappingEntry;

/// Write entries as CSV with a header row named after the entry fields.
///
/// Absent `info_type`/`note` values become empty cells.
pub fn write_entries_csv<W: Write>(sink: W, entries: &[MappingEntry]) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(sink);
    for entry in entries {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}
