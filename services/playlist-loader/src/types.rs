//!
//! src/types.rs
//!
//! Row and metadata types shared by the reader, store and sink, plus
//! the mapping from a musicbrainz recording to enrichment fields
//!

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const UNKNOWN: &str = "Unknown";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_RELEASE_DATE: &str = "Unknown Release Date";
pub const UNKNOWN_DURATION: &str = "Unknown Duration";

/// One input line: playlist name, song name, song url (in that order)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvRow {
    pub playlist_name: String,
    pub song_name: String,
    pub song_url: String
}

/// Enrichment fields resolved for a single song
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    pub album: String,
    pub artist: String,
    pub release_date: String,
    pub duration: String
}

impl Metadata {
    /// Fallback used when a lookup produced nothing at all
    pub fn unknown() -> Self {
        Self {
            album: UNKNOWN.to_string(),
            artist: UNKNOWN.to_string(),
            release_date: UNKNOWN.to_string(),
            duration: UNKNOWN.to_string()
        }
    }

    /// Maps a musicbrainz recording object. Blank strings and a missing
    /// or zero length fall back to the per-field defaults.
    pub fn from_recording(recording: &Value) -> Self {
        let text = |pointer: &str, default: &str| -> String {
            recording.pointer(pointer)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(default)
                .to_string()
        };

        let duration = recording.get("length")
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
            .filter(|ms| *ms > 0)
            .map(format_duration)
            .unwrap_or_else(|| UNKNOWN_DURATION.to_string());

        Self {
            album: text("/releases/0/title", UNKNOWN_ALBUM),
            artist: text("/artist-credit/0/name", UNKNOWN_ARTIST),
            release_date: text("/releases/0/date", UNKNOWN_RELEASE_DATE),
            duration
        }
    }
}

/// Milliseconds to M:SS, minutes are not wrapped into hours
pub fn format_duration(ms: u64) -> String {
    let minutes = ms / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{minutes}:{seconds:02}")
}

/// A persisted row. Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    pub playlist_name: String,
    pub song_name: String,
    pub song_url: String,
    pub album: String,
    pub artist: String,
    pub release_date: String,
    pub duration: String
}

impl PlaylistEntry {
    pub fn new(row: CsvRow, metadata: Metadata) -> Self {
        Self {
            playlist_name: row.playlist_name,
            song_name: row.song_name,
            song_url: row.song_url,
            album: metadata.album,
            artist: metadata.artist,
            release_date: metadata.release_date,
            duration: metadata.duration
        }
    }
}
