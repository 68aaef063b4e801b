//! Shared test utilities for the storage engines and the console.
//!
//! Both backends are set up the same way every test needs them: already reloaded and
//! pointing at private state (a temporary directory or an in-memory database).

use crate::{
    config::DatabaseConfig,
    errors::Result,
    storage::{DbStorage, Engine, FileStorage, Storage},
};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Installs a subscriber that writes through the test harness. Safe to call from
/// every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

/// A file engine whose document lives in a fresh temporary directory.
/// Keep the returned directory alive for as long as the engine is used.
pub async fn file_engine() -> Result<(TempDir, Engine)> {
    init_test_tracing();
    let dir = tempfile::tempdir().map_err(|source| crate::errors::Error::Io {
        path: std::env::temp_dir(),
        source,
    })?;
    let mut engine = Engine::File(FileStorage::new(dir.path().join("file.json")));
    engine.reload().await?;
    Ok((dir, engine))
}

/// A relational engine on a private in-memory `SQLite` database with the schema created.
pub async fn memory_db_engine() -> Result<Engine> {
    init_test_tracing();
    let mut engine = Engine::Db(DbStorage::new(DatabaseConfig::in_memory()));
    engine.reload().await?;
    Ok(engine)
}
