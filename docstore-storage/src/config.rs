//! Store configuration.

use crate::cache::CacheConfig;
use crate::error::{StorageError, StorageResult};
use docstore_events::EventsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Top-level configuration for a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Prepended to every entity type name to form its table name.
    pub table_prefix: String,
    pub cache: CacheConfig,
    pub events: EventsConfig,
}

impl StoreConfig {
    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> StorageResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| StorageError::Config(format!("invalid config JSON: {e}")))
    }

    /// Reads and parses a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    /// Builds the config from `DOCSTORE_*` environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from variables supplied by `lookup`.
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StorageResult<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("DOCSTORE_TABLE_PREFIX") {
            config.table_prefix = v;
        }
        if let Some(v) = lookup("DOCSTORE_SERVICE_NAME") {
            config.events.service_name = v;
        }
        if let Some(v) = lookup("DOCSTORE_STREAM_NAME") {
            config.events.stream_name = v;
        }
        if let Some(v) = lookup("DOCSTORE_STREAM_DIR") {
            config.events.stream_dir = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("DOCSTORE_INVOCATION_ENDPOINT") {
            config.events.invocation_endpoint = Some(v);
        }
        if let Some(v) = lookup("DOCSTORE_INVOCATION_TIMEOUT_MS") {
            config.events.invocation_timeout_ms = parse_number("DOCSTORE_INVOCATION_TIMEOUT_MS", &v)?;
        }
        if let Some(v) = lookup("DOCSTORE_CACHE_ENABLED") {
            config.cache.enabled = parse_bool("DOCSTORE_CACHE_ENABLED", &v)?;
        }
        if let Some(v) = lookup("DOCSTORE_CACHE_MAX_CAPACITY") {
            config.cache.max_capacity = parse_number("DOCSTORE_CACHE_MAX_CAPACITY", &v)?;
        }
        if let Some(v) = lookup("DOCSTORE_CACHE_TTL_SECS") {
            config.cache.ttl_secs = parse_number("DOCSTORE_CACHE_TTL_SECS", &v)?;
        }

        Ok(config)
    }
}

fn parse_number<N>(key: &str, value: &str) -> StorageResult<N>
where
    N: FromStr,
    N::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| StorageError::Config(format!("{key}={value:?}: {e}")))
}

fn parse_bool(key: &str, value: &str) -> StorageResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(StorageError::Config(format!(
            "{key}={value:?}: expected a boolean"
        ))),
    }
}
