//!
//! src/sink.rs
//!
//! Defines the csv sink the export pipeline writes through
//!

use std::{fs, path::{Path, PathBuf}};

use crate::errors::LoaderError;
use crate::types::PlaylistEntry;

/// Writes playlist entries as csv. Output goes to a temp file next to the
/// destination which then replaces it, so readers never see a partial file.
pub struct CsvSink {
    path: PathBuf
}

impl CsvSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_entries(&self, entries: &[PlaylistEntry]) -> Result<(), LoaderError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        fs::create_dir_all(&parent).map_err(|e|
            LoaderError::Csv(
                format!("create dir {}: {e}", parent.display())
        ))?;

        let temp = tempfile::NamedTempFile::new_in(&parent)
            .map_err(|e| LoaderError::Csv(
                format!("tempfile in {}: {e}", parent.display())
            ))?;

        {
            // header row comes from the PlaylistEntry field names
            let mut writer = csv::Writer::from_writer(temp.as_file());
            for entry in entries {
                writer.serialize(entry)?;
            }
            writer.flush()?;
        }

        // tempfiles are created 0600, keep whatever mode the output had
        if let Some(perms) = self.output_permissions()? {
            temp.as_file().set_permissions(perms)?;
        }

        temp.persist(&self.path).map_err(|e|
            LoaderError::Csv(format!("persist {}: {e}", self.path.display())))?;

        Ok(())
    }

    fn output_permissions(&self) -> Result<Option<fs::Permissions>, LoaderError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.permissions())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(new_file_permissions()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(unix)]
fn new_file_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn new_file_permissions() -> Option<fs::Permissions> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(playlist: &str, song: &str, duration: &str) -> PlaylistEntry {
        PlaylistEntry {
            playlist_name: playlist.into(),
            song_name: song.into(),
            song_url: "http://example.com/song1".into(),
            album: "A Night at the Opera".into(),
            artist: "Queen".into(),
            release_date: "1975-11-21".into(),
            duration: duration.into()
        }
    }

    #[test]
    fn writes_header_then_rows_in_field_order() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("output.csv"));
        sink.write_entries(&[entry("Road Trip", "Bohemian Rhapsody", "5:54")]).unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        let mut lines = content.lines();
        assert_eq!(lines.next(),
            Some("playlist_name,song_name,song_url,album,artist,release_date,duration"));
        assert_eq!(lines.next(),
            Some("Road Trip,Bohemian Rhapsody,http://example.com/song1,A Night at the Opera,Queen,1975-11-21,5:54"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn existing_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.csv");
        fs::write(&path, "stale contents that are longer than the new file\n".repeat(50)).unwrap();

        CsvSink::new(&path).write_entries(&[entry("Chill", "Yesterday", "2:05")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("stale"));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("nested/dir/output.csv"));
        sink.write_entries(&[entry("Road Trip, Vol. 2", "Bohemian Rhapsody", "5:54")]).unwrap();

        let content = fs::read_to_string(sink.path()).unwrap();
        assert!(content.contains("\"Road Trip, Vol. 2\""));
    }

    #[cfg(unix)]
    fn mode(path: &Path) -> u32 {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[cfg(unix)]
    #[test]
    fn new_output_is_world_readable() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("output.csv"));
        sink.write_entries(&[entry("Road Trip", "Bohemian Rhapsody", "5:54")]).unwrap();

        assert_eq!(mode(sink.path()), 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn existing_output_keeps_its_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.csv");
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o640)).unwrap();

        CsvSink::new(&path).write_entries(&[entry("Chill", "Yesterday", "2:05")]).unwrap();

        assert_eq!(mode(&path), 0o640);
        assert!(!fs::read_to_string(&path).unwrap().contains("old"));
    }
}
