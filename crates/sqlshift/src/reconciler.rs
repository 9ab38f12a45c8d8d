//! Migration state reconciliation.
//!
//! Compares the migrations directory against the record table to decide
//! which migrations are new, applied, or applied but gone from disk.

use std::collections::HashMap;
use std::fmt;

use crate::dir::{MigrationFile, MigrationsDir};
use crate::error::Result;
use crate::history::{MigrationRecord, MigrationRecordStore};

/// Lifecycle state of a migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationState {
    /// A file without a record.
    New,
    /// A file with a record.
    Applied,
    /// A record whose file no longer exists.
    Deleted,
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::New => "NEW",
            Self::Applied => "APPLIED",
            Self::Deleted => "DELETED",
        })
    }
}

/// A migration with its reconciled state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationInfo {
    pub name: String,
    pub state: MigrationState,
    /// Set for APPLIED and DELETED migrations.
    pub record: Option<MigrationRecord>,
    /// Set for NEW and APPLIED migrations.
    pub file: Option<MigrationFile>,
}

/// Computes migration states from files and records.
#[derive(Debug, Clone, Copy)]
pub struct MigrationReconciler<'a> {
    store: &'a MigrationRecordStore,
    dir: &'a MigrationsDir,
}

impl<'a> MigrationReconciler<'a> {
    pub const fn new(store: &'a MigrationRecordStore, dir: &'a MigrationsDir) -> Self {
        Self { store, dir }
    }

    /// Lists file-backed migrations in file order followed by DELETED ones.
    /// With `changes_only`, APPLIED migrations are left out.
    pub async fn find(&self, changes_only: bool) -> Result<Vec<MigrationInfo>> {
        let files = self.dir.scan()?;
        let records = if self.store.table_exists().await? {
            self.store.list_all().await?
        } else {
            Vec::new()
        };
        Ok(reconcile(files, records, changes_only))
    }
}

/// Pairs files with records by exact name.
#[must_use]
pub fn reconcile(
    files: Vec<MigrationFile>,
    records: Vec<MigrationRecord>,
    changes_only: bool,
) -> Vec<MigrationInfo> {
    let order: Vec<String> = records.iter().map(|r| r.name.clone()).collect();
    let mut by_name: HashMap<String, MigrationRecord> =
        records.into_iter().map(|r| (r.name.clone(), r)).collect();

    let mut infos: Vec<MigrationInfo> = files
        .into_iter()
        .map(|file| {
            let record = by_name.remove(&file.name);
            MigrationInfo {
                name: file.name.clone(),
                state: if record.is_some() {
                    MigrationState::Applied
                } else {
                    MigrationState::New
                },
                record,
                file: Some(file),
            }
        })
        .collect();

    // Records keep their listing order.
    infos.extend(order.into_iter().filter_map(|name| {
        by_name.remove(&name).map(|record| MigrationInfo {
            name,
            state: MigrationState::Deleted,
            record: Some(record),
            file: None,
        })
    }));

    if changes_only {
        infos.retain(|info| info.state != MigrationState::Applied);
    }
    infos
}
