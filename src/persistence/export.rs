use super::{StoreError, StoredEntry};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct ExportRow<'a> {
    name: &'a str,
    phone: &'a str,
    score: u32,
    created_at: String,
}

/// Write saved entries as CSV with a header row.
pub fn export_csv<W: Write>(entries: &[StoredEntry], writer: W) -> Result<(), StoreError> {
    let mut out = csv::Writer::from_writer(writer);
    for entry in entries {
        out.serialize(ExportRow {
            name: &entry.name,
            phone: &entry.phone,
            score: entry.score,
            created_at: entry.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })?;
    }
    out.flush()?;
    Ok(())
}
