// src/ingest/error.rs
use thiserror::Error;

/// A single fetch attempt failed at the network level. Recovered by retry,
/// then by the fallback cache; never surfaces past a fetcher on its own.
#[derive(Debug, Error)]
pub enum TransientFetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection error: {0}")]
    Connect(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("request error: {0}")]
    Request(String),

    #[error("reading response body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransientFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransientFetchError::Timeout
        } else if err.is_connect() {
            TransientFetchError::Connect(err.to_string())
        } else if let Some(status) = err.status() {
            TransientFetchError::Status(status.as_u16())
        } else if err.is_body() || err.is_decode() {
            TransientFetchError::Body(err.to_string())
        } else {
            TransientFetchError::Request(err.to_string())
        }
    }
}

/// Extract stage failed with every recovery path exhausted.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{pipeline}: no data and no fallback")]
    NoFallback { pipeline: &'static str },

    #[error("{pipeline}: reading fallback cache: {source}")]
    Cache {
        pipeline: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// One feed line could not be turned into a record. The line is skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("line {line}: expected 5 or 6 tab-separated fields, got {count}")]
    FieldCount { line: usize, count: usize },

    #[error("line {line}: {field} value {value:?} does not fit in an integer")]
    NumericOverflow {
        line: usize,
        field: &'static str,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum StoreWriteError {
    #[error("opening document store at {uri}: {source}")]
    Open {
        uri: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("invalid {kind} name {name:?}")]
    InvalidName { kind: &'static str, name: String },

    #[error("store error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("preparing store directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Required configuration is missing or unusable. Fatal, raised before any I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{0} is set but empty")]
    Empty(&'static str),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("reading config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
