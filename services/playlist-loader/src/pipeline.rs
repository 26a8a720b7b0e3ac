//!
//! src/pipeline.rs
//!
//! Import: csv rows -> metadata lookup -> playlist store, skipping pairs
//! already stored. Export: playlist store -> csv.
//!
//! Both run strictly sequentially, one lookup and one query at a time.
//!

use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::errors::LoaderError;
use crate::fetch::MetadataSource;
use crate::persistent::Persistent;
use crate::reader;
use crate::sink::CsvSink;
use crate::types::{Metadata, PlaylistEntry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub read: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub unmatched: usize   // inserted with "Unknown" enrichment
}

/// Lookup failures never abort an import, they collapse to None here
async fn resolve_metadata<M>(source: &M, song_name: &str) -> Option<Metadata>
where
    M: MetadataSource + ?Sized
{
    match source.fetch(song_name, None).await {
        Ok(metadata) => Some(metadata),
        Err(LoaderError::NotFound(msg)) => {
            warn!(song = %song_name, %msg, "metadata.miss");
            None
        }
        Err(e) => {
            error!(song = %song_name, error = %e, "metadata.error");
            None
        }
    }
}

/// Store errors abort the remaining rows; rows already inserted stay.
pub async fn import_csv<M>(
    db: &Persistent,
    source: &M,
    csv_path: &Path
) -> Result<ImportSummary, LoaderError>
where
    M: MetadataSource + ?Sized
{
    info!(path = %csv_path.display(), "import.read");
    let rows = reader::read_rows(csv_path).await?;
    info!(count = rows.len(), "import.rows");

    let mut summary = ImportSummary { read: rows.len(), ..ImportSummary::default() };
    for row in rows {
        if db.exists(&row.playlist_name, &row.song_name).await? {
            info!(
                playlist = %row.playlist_name, song = %row.song_name,
                "import.skip"
            );
            summary.skipped += 1;
            continue;
        }

        // artist is never known from the csv
        let metadata = match resolve_metadata(source, &row.song_name).await {
            Some(metadata) => metadata,
            None => {
                summary.unmatched += 1;
                Metadata::unknown()
            }
        };

        let entry = PlaylistEntry::new(row, metadata);
        let id = db.insert(&entry).await?;
        info!(
            id, playlist = %entry.playlist_name, song = %entry.song_name,
            "import.insert"
        );
        summary.inserted += 1;
    }

    Ok(summary)
}

/// Returns None (and writes nothing) when the store is empty
/// Logs the stored row count; a failed count is reported, never fatal
pub async fn report_store_rows(db: &Persistent) -> Option<i64> {
    match db.count().await {
        Ok(total) => {
            info!(total, "store.rows");
            Some(total)
        }
        Err(e) => {
            warn!(error = %e, "store.count.failed");
            None
        }
    }
}

pub async fn export_csv(db: &Persistent, output_path: &Path) ->
    Result<Option<usize>, LoaderError> {
    let entries = db.read_all().await?;
    debug!(count = entries.len(), "export.fetched");

    if entries.is_empty() {
        info!("export.empty");
        return Ok(None);
    }

    let sink = CsvSink::new(output_path);
    sink.write_entries(&entries)?;
    info!(path = %sink.path().display(), count = entries.len(), "export.written");

    Ok(Some(entries.len()))
}
