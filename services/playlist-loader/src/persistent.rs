//!
//! src/persistent.rs
//!
//! Defines the playlist store. One sqlite table holds a row per
//! (playlist, song) pair plus its enrichment fields. Duplicates are
//! prevented by callers checking `exists` first, not by the schema.
//!

use std::{str::FromStr, time::Duration};
use sqlx::{sqlite::SqlitePoolOptions, sqlite::SqliteConnectOptions, sqlite::SqliteRow, Pool, Row, Sqlite};

use crate::config::PersistenceConfig;
use crate::errors::LoaderError;
use crate::types::PlaylistEntry;

pub struct Persistent {
    pool: Pool<Sqlite>
}

impl Persistent {

    /// Builds the pool without opening a connection; connection failures
    /// surface from the first query instead.
    pub fn connect(cfg: &PersistenceConfig) -> Result<Self, LoaderError> {
        let is_memory = cfg.db_url.starts_with("sqlite::memory:");

        let mut opts = SqliteConnectOptions::from_str(&cfg.db_url)?
            .create_if_missing(true);

        // WAL is file-only
        if !is_memory {
            opts = opts.journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
                       .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        }

        // an in-memory database lives and dies with its one connection
        let pool_opts = if is_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new()
                .max_connections(cfg.max_connections)
        };

        let pool = pool_opts
            .acquire_timeout(cfg.connect_timeout)
            .connect_lazy_with(opts);

        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<(), LoaderError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS playlists (
              id             INTEGER PRIMARY KEY AUTOINCREMENT,
              playlist_name  TEXT NOT NULL,
              song_name      TEXT NOT NULL,
              song_url       TEXT NOT NULL,
              album          TEXT,
              artist         TEXT,
              release_date   TEXT,
              duration       TEXT
            );
            "
        ).execute(&self.pool).await?;

        Ok(())
    }

    pub async fn exists(&self, playlist_name: &str, song_name: &str) ->
        Result<bool, LoaderError> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT id FROM playlists WHERE playlist_name = ?1 AND song_name = ?2 LIMIT 1;"
        )
        .bind(playlist_name)
        .bind(song_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    /// Appends one row and returns its id
    pub async fn insert(&self, entry: &PlaylistEntry) -> Result<i64, LoaderError> {
        let id = sqlx::query(
            r"
            INSERT INTO playlists (
                playlist_name, song_name, song_url, album, artist,
                release_date, duration
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);
            "
        )
        .bind(&entry.playlist_name)
        .bind(&entry.song_name)
        .bind(&entry.song_url)
        .bind(&entry.album)
        .bind(&entry.artist)
        .bind(&entry.release_date)
        .bind(&entry.duration)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(id)
    }

    pub async fn read_all(&self) -> Result<Vec<PlaylistEntry>, LoaderError> {
        let rows = sqlx::query(
            r"
            SELECT playlist_name, song_name, song_url, album, artist,
                release_date, duration
              FROM playlists;
            "
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::entry_from_row).collect()
    }

    pub async fn count(&self) -> Result<i64, LoaderError> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM playlists;")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn entry_from_row(r: &SqliteRow) -> Result<PlaylistEntry, LoaderError> {
        // enrichment columns are nullable in the schema
        let text = |column: &str| -> Result<String, LoaderError> {
            Ok(r.try_get::<Option<String>, _>(column)?.unwrap_or_default())
        };

        Ok(PlaylistEntry {
            playlist_name: r.try_get("playlist_name")?,
            song_name: r.try_get("song_name")?,
            song_url: r.try_get("song_url")?,
            album: text("album")?,
            artist: text("artist")?,
            release_date: text("release_date")?,
            duration: text("duration")?
        })
    }
}
