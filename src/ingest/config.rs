// src/ingest/config.rs
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::ingest::error::ConfigError;
use crate::ingest::providers::{dshield, newsapi};
use crate::ingest::retry::RetryPolicy;
use crate::ingest::types::PipelineKind;

pub const ENV_CONFIG_PATH: &str = "ETL_CONFIG_PATH";
pub const ENV_NEWSAPI_KEY: &str = "NEWSAPI_KEY";
pub const ENV_STORE_URI: &str = "DOCSTORE_URI";
pub const ENV_STORE_DB: &str = "DOCSTORE_DB";
pub const DEFAULT_CONFIG_PATH: &str = "config/etl.toml";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq)]
pub struct StoreSettings {
    pub uri: String,
    pub database: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsApiSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    pub country: String,
    pub collection: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DShieldSettings {
    pub feed_url: String,
    pub fallback_path: PathBuf,
    pub collection: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

/// Process-wide settings, built once at startup and passed by reference.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub store: StoreSettings,
    pub newsapi: NewsApiSettings,
    pub dshield: DShieldSettings,
}

/// Optional TOML overrides. Every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub store: FileStore,
    pub newsapi: FileNewsApi,
    pub dshield: FileDShield,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileStore {
    pub uri: Option<String>,
    pub database: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileNewsApi {
    pub base_url: Option<String>,
    pub country: Option<String>,
    pub collection: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileDShield {
    pub feed_url: Option<String>,
    pub fallback_path: Option<PathBuf>,
    pub collection: Option<String>,
    pub timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
    pub backoff_base_secs: Option<u64>,
}

pub fn load_file_from(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Override file lookup:
/// 1) explicit path (CLI)
/// 2) $ETL_CONFIG_PATH
/// 3) config/etl.toml when present
pub fn load_file_default(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    if let Some(p) = explicit {
        return load_file_from(p);
    }
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        return load_file_from(Path::new(&p));
    }
    let default = Path::new(DEFAULT_CONFIG_PATH);
    if default.exists() {
        return load_file_from(default);
    }
    Ok(FileConfig::default())
}

/// Env value wins over the file value. A variable that is set but blank is
/// an error rather than a silent fallback.
fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    file_value: Option<String>,
) -> Result<String, ConfigError> {
    match lookup(var) {
        Some(v) if v.trim().is_empty() => Err(ConfigError::Empty(var)),
        Some(v) => Ok(v.trim().to_string()),
        None => match file_value {
            Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
            _ => Err(ConfigError::Missing(var)),
        },
    }
}

fn secs(value: Option<u64>, default: Duration, key: &str) -> Result<Duration, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::Invalid(format!("{key} must be greater than zero"))),
        Some(s) => Ok(Duration::from_secs(s)),
        None => Ok(default),
    }
}

impl AppConfig {
    /// Build from the process environment plus the default override file.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = load_file_default(explicit_file)?;
        Self::from_sources(|k| std::env::var(k).ok(), file)
    }

    pub fn from_sources(
        lookup: impl Fn(&str) -> Option<String>,
        file: FileConfig,
    ) -> Result<Self, ConfigError> {
        let store = StoreSettings {
            uri: required(&lookup, ENV_STORE_URI, file.store.uri)?,
            database: required(&lookup, ENV_STORE_DB, file.store.database)?,
        };

        let api_key = lookup(ENV_NEWSAPI_KEY)
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let newsapi = NewsApiSettings {
            base_url: file
                .newsapi
                .base_url
                .unwrap_or_else(|| newsapi::DEFAULT_BASE_URL.to_string()),
            api_key,
            country: file
                .newsapi
                .country
                .unwrap_or_else(|| newsapi::DEFAULT_COUNTRY.to_string()),
            collection: file
                .newsapi
                .collection
                .unwrap_or_else(|| PipelineKind::NewsApi.default_collection().to_string()),
            timeout: secs(file.newsapi.timeout_secs, DEFAULT_TIMEOUT, "newsapi.timeout_secs")?,
        };

        let defaults = RetryPolicy::default();
        let max_attempts = file.dshield.max_attempts.unwrap_or(defaults.max_attempts);
        if max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "dshield.max_attempts must be at least 1".into(),
            ));
        }
        let dshield = DShieldSettings {
            feed_url: file
                .dshield
                .feed_url
                .unwrap_or_else(|| dshield::DEFAULT_FEED_URL.to_string()),
            fallback_path: file
                .dshield
                .fallback_path
                .unwrap_or_else(|| PathBuf::from(dshield::DEFAULT_FALLBACK_PATH)),
            collection: file
                .dshield
                .collection
                .unwrap_or_else(|| PipelineKind::DShield.default_collection().to_string()),
            timeout: secs(file.dshield.timeout_secs, DEFAULT_TIMEOUT, "dshield.timeout_secs")?,
            retry: RetryPolicy {
                max_attempts,
                backoff_base: secs(
                    file.dshield.backoff_base_secs,
                    defaults.backoff_base,
                    "dshield.backoff_base_secs",
                )?,
            },
        };

        Ok(Self {
            store,
            newsapi,
            dshield,
        })
    }

    /// The headlines pipeline cannot start without a key.
    pub fn newsapi_key(&self) -> Result<&str, ConfigError> {
        self.newsapi
            .api_key
            .as_deref()
            .ok_or(ConfigError::Missing(ENV_NEWSAPI_KEY))
    }

    /// Checks everything `kind` needs before any network or store I/O.
    pub fn validate_for(&self, kind: PipelineKind) -> Result<(), ConfigError> {
        match kind {
            PipelineKind::NewsApi => self.newsapi_key().map(|_| ()),
            PipelineKind::DShield => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_only_connection_is_set() {
        let cfg = AppConfig::from_sources(
            env(&[(ENV_STORE_URI, "data"), (ENV_STORE_DB, "news_db")]),
            FileConfig::default(),
        )
        .unwrap();
        assert_eq!(cfg.store.database, "news_db");
        assert_eq!(cfg.newsapi.country, "us");
        assert_eq!(cfg.newsapi.collection, "newsapi_raw");
        assert_eq!(cfg.dshield.collection, "dshield_raw");
        assert_eq!(cfg.dshield.retry, RetryPolicy::default());
        assert_eq!(cfg.dshield.timeout, Duration::from_secs(60));
        assert!(cfg.newsapi_key().is_err());
        assert!(cfg.validate_for(PipelineKind::DShield).is_ok());
    }

    #[test]
    fn blank_env_value_is_an_error() {
        let err = AppConfig::from_sources(
            env(&[(ENV_STORE_URI, "  "), (ENV_STORE_DB, "news_db")]),
            FileConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Empty(ENV_STORE_URI)));
    }

    #[test]
    fn file_overrides_but_env_wins_for_connection() {
        let file: FileConfig = toml::from_str(
            r#"
            [store]
            uri = "from-file"
            database = "file_db"

            [dshield]
            max_attempts = 5
            backoff_base_secs = 2
            fallback_path = "cache/dshield.txt"
            "#,
        )
        .unwrap();
        let cfg = AppConfig::from_sources(env(&[(ENV_STORE_URI, "from-env")]), file).unwrap();
        assert_eq!(cfg.store.uri, "from-env");
        assert_eq!(cfg.store.database, "file_db");
        assert_eq!(cfg.dshield.retry.max_attempts, 5);
        assert_eq!(cfg.dshield.retry.backoff_base, Duration::from_secs(2));
        assert_eq!(cfg.dshield.fallback_path, PathBuf::from("cache/dshield.txt"));
    }

    #[test]
    fn zero_attempts_rejected() {
        let file: FileConfig = toml::from_str("[dshield]\nmax_attempts = 0\n").unwrap();
        let err = AppConfig::from_sources(
            env(&[(ENV_STORE_URI, "d"), (ENV_STORE_DB, "db")]),
            file,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
