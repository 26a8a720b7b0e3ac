//!
//! src/config.rs
//!
//! Builds the loader configuration from defaults, optionally
//! overridden by environment variables (or a .env file)
//!

use std::{path::PathBuf, str::FromStr, time};
use url::Url;
use crate::LoaderError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// Constants for the playlist store
pub const DB_URL: &str = "sqlite:./playlists.db";
pub const DB_MAX_CONNECTIONS: u32 = 10;
pub const DB_CONNECT_TIMEOUT: u64 = 30000;

pub const INPUT_CSV: &str = "playlistholder.csv";
pub const OUTPUT_CSV: &str = "output.csv";

pub const MB_BASE_URL: &str = "https://musicbrainz.org/ws/2/";

/// Wrapper over env::var that treats blank values as unset
fn env_opt(s: &str) -> Option<String> {
    match std::env::var(s) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Parses an env var into T, falling back to default when unset or invalid
fn env_parse<T: FromStr>(s: &str, default: T) -> T {
    env_opt(s)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Counts and limits where 0 would be meaningless (limit=0, empty pool)
fn env_positive(s: &str, default: u32) -> u32 {
    env_parse(s, default).max(1)
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

/// Endpoints are joined below the base, so it must end in a slash
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    url
}

/// User agent expected by musicbrainz
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub user_agent: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_agent: format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            )
        }
    }
}

fn build_identity() -> IdentityConfig {
    match env_opt("MB_USER_AGENT") {
        Some(user_agent) => IdentityConfig { user_agent },
        None => IdentityConfig::default(),
    }
}

///
/// Configuration for musicbrainz api
///
#[derive(Debug, Clone)]
pub struct MusicBrainzConfig {
    pub base_url: Url,      // https://musicbrainz.org/ws/2/
    pub search_limit: u32,  // only the first candidate is used
}

fn build_musicbrainz() -> Result<MusicBrainzConfig, LoaderError> {
    let base_url = env_opt("MB_BASE_URL")
        .unwrap_or_else(|| MB_BASE_URL.to_string());

    let base_url = Url::parse(&base_url)
        .map_err(|e| LoaderError::Config(
            format!("MB_BASE_URL invalid {e}")
        ))?;

    ensure_https(&base_url)
        .map_err(LoaderError::Config)?;

    Ok( MusicBrainzConfig {
        base_url: with_trailing_slash(base_url),
        search_limit: env_positive("MB_SEARCH_LIMIT", 1),
    })
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for the sqlite playlist store
///
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub db_url: String,
    pub max_connections: u32,
    pub connect_timeout: time::Duration,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            db_url: DB_URL.to_string(),
            max_connections: DB_MAX_CONNECTIONS,
            connect_timeout: time::Duration::from_millis(DB_CONNECT_TIMEOUT),
        }
    }
}

fn build_persistence() -> PersistenceConfig {
    let defaults = PersistenceConfig::default();
    PersistenceConfig {
        db_url: env_opt("DATABASE_URL").unwrap_or(defaults.db_url),
        max_connections: env_positive("DB_MAX_CONNECTIONS", defaults.max_connections),
        connect_timeout: defaults.connect_timeout,
    }
}

/// Input and output csv files, relative to the working directory
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub input_csv: PathBuf,
    pub output_csv: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            input_csv: PathBuf::from(INPUT_CSV),
            output_csv: PathBuf::from(OUTPUT_CSV),
        }
    }
}

fn build_paths() -> PathsConfig {
    let defaults = PathsConfig::default();
    PathsConfig {
        input_csv: env_opt("PLAYLIST_INPUT_CSV")
            .map(PathBuf::from)
            .unwrap_or(defaults.input_csv),
        output_csv: env_opt("PLAYLIST_OUTPUT_CSV")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_csv),
    }
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json"   => Some(LogFormat::Json),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,playlist_loader=debug,reqwest=warn,sqlx=warn"
                .to_string(),
            format: LogFormat::Json,
            with_ansi: false,
            include_file_line: true,
            include_target: true,
        }
    }
}

fn build_logging() -> LoggingConfig {
    let mut logging = LoggingConfig::default();
    if let Some(format) = env_opt("LOG_FORMAT").as_deref().and_then(LogFormat::parse) {
        logging.format = format;
        logging.with_ansi = format == LogFormat::Pretty;
    }
    logging
}

///
/// AppConfig which holds everything the pipeline stages need
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub identity: IdentityConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub http: HttpConfig,
    pub persistence: PersistenceConfig,
    pub paths: PathsConfig,
    pub logging: LoggingConfig
}

///
/// Return the full configuration to caller at program start.
///
pub fn load_config() -> Result<AppConfig, LoaderError> {
    dotenvy::dotenv().ok();

    let identity    = build_identity();
    let musicbrainz = build_musicbrainz()?;
    let http        = HttpConfig::default();
    let persistence = build_persistence();
    let paths       = build_paths();
    let logging     = build_logging();

    Ok( AppConfig {
        identity, musicbrainz, http, persistence, paths, logging
    } )
}
