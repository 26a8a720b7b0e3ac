//!
//! src/errors.rs
//!
//! Defines enums and methods of error conversion
//! for errors the loader uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("db error: {0}")]
    Db(String),
    #[error("csv error: {0}")]
    Csv(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<reqwest::Error> for LoaderError {
    fn from(e: reqwest::Error) -> Self { LoaderError::Http(e.to_string()) }
}

impl From<serde_json::Error> for LoaderError {
    fn from(e: serde_json::Error) -> Self { LoaderError::Parse(e.to_string()) }
}

impl From<sqlx::Error> for LoaderError {
    fn from(e: sqlx::Error) -> Self { LoaderError::Db(e.to_string()) }
}

impl From<csv::Error> for LoaderError {
    fn from(e: csv::Error) -> Self { LoaderError::Csv(e.to_string()) }
}
