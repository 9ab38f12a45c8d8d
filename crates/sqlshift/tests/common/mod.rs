#![allow(dead_code)]

use std::path::Path;

use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Row};

use sqlshift::prelude::*;

/// A single-connection in-memory SQLite database.
pub async fn memory_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory database")
}

pub fn store(pool: &AnyPool) -> MigrationRecordStore {
    MigrationRecordStore::new(pool.clone(), Box::new(SqliteDialect::new()), "migrations")
}

pub fn migrator(pool: &AnyPool, dir: &Path, dry_run: bool) -> Migrator {
    Migrator::new(
        store(pool),
        MigrationsDir::new(dir),
        ExecutionEngine::new(pool.clone()).dry_run(dry_run),
    )
}

pub fn write_migration(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(format!("{name}.yaml")), content)
        .unwrap_or_else(|e| panic!("Failed to write {name}: {e}"));
}

/// User tables, sorted by name.
pub async fn tables(pool: &AnyPool) -> Vec<String> {
    sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' \
         AND name NOT LIKE 'sqlite_%' AND name <> 'migrations' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .expect("Failed to list tables")
    .iter()
    .map(|row| row.get::<String, _>(0))
    .collect()
}

pub fn states(infos: &[MigrationInfo]) -> Vec<(String, MigrationState)> {
    infos.iter().map(|i| (i.name.clone(), i.state)).collect()
}
