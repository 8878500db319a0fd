//! Connectivity probe for a docstore deployment.
//!
//! Opens the configured backing store, runs the startup sequence, and reports
//! which tables exist and whether the health sentinel can be read.

use anyhow::{Context, Result};
use docstore_storage::{
    BackingStore, DocumentStore, EntityCatalog, MemoryBackend, SqliteBackend, StoreConfig,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::info;

/// Where the probe gets its settings.
#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    /// SQLite file to open; in-memory when `None`.
    pub db: Option<PathBuf>,
    /// JSON config file; environment variables when `None`.
    pub config: Option<PathBuf>,
}

/// Outcome of one probe run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub backend: String,
    pub tables: Vec<String>,
    pub healthy: bool,
}

/// Loads the store configuration from a file or the environment.
pub fn load_config(path: Option<&Path>) -> Result<StoreConfig> {
    match path {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => StoreConfig::from_env().context("failed to load config from environment"),
    }
}

/// Opens the backing store named by `db`.
pub fn open_backend(db: Option<&Path>) -> Result<Arc<dyn BackingStore>> {
    Ok(match db {
        Some(path) => Arc::new(
            SqliteBackend::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?,
        ),
        None => Arc::new(MemoryBackend::new()),
    })
}

/// Runs the probe. Blocking store calls run on the blocking pool.
pub async fn run(options: ProbeOptions) -> Result<ProbeReport> {
    let config = load_config(options.config.as_deref())?;
    let backend = open_backend(options.db.as_deref())?;
    let store = DocumentStore::with_config(backend, &config, Some(Handle::current()))
        .context("failed to build document store")?;

    tokio::task::spawn_blocking(move || probe(&store))
        .await
        .context("probe task failed")?
}

fn probe(store: &DocumentStore) -> Result<ProbeReport> {
    store
        .start(&EntityCatalog::new())
        .context("startup failed")?;
    let healthy = store.ping().context("ping failed")?;
    let tables = store.backend().list_tables().context("failed to list tables")?;

    info!(
        backend = store.backend().name(),
        tables = tables.len(),
        healthy,
        "probe finished"
    );
    Ok(ProbeReport {
        backend: store.backend().name().to_string(),
        tables,
        healthy,
    })
}
