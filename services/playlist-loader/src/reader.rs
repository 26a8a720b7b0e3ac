//!
//! src/reader.rs
//!
//! Reads the playlist input csv into memory. The header row is dropped and
//! the remaining rows are mapped positionally; there is no column validation.
//!

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};

use crate::errors::LoaderError;
use crate::types::CsvRow;

impl CsvRow {
    fn from_record(record: &StringRecord) -> Self {
        let field = |i: usize| record.get(i).unwrap_or_default().to_string();
        Self {
            playlist_name: field(0),
            song_name: field(1),
            song_url: field(2)
        }
    }
}

pub async fn read_rows(path: &Path) -> Result<Vec<CsvRow>, LoaderError> {
    let content = tokio::fs::read(path).await?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_slice());

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(CsvRow::from_record(&record?));
    }
    Ok(rows)
}
