//! Migrations directory.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{MigrateError, Result};

/// Extension of migration files.
pub const MIGRATION_EXTENSION: &str = "yaml";

/// A migration file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationFile {
    /// File name without extension.
    pub name: String,
    pub path: PathBuf,
}

/// The directory holding migration files.
#[derive(Debug, Clone)]
pub struct MigrationsDir {
    path: PathBuf,
}

impl MigrationsDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the file for migration `name`.
    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{name}.{MIGRATION_EXTENSION}"))
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.file_path(name).exists()
    }

    /// Lists migration files sorted by name. A missing directory has no migrations.
    pub fn scan(&self) -> Result<Vec<MigrationFile>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Migrations directory does not exist");
            return Ok(Vec::new());
        }
        if !self.path.is_dir() {
            return Err(MigrateError::MigrationsDirNotFound(self.path.clone()));
        }

        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.path)? {
            let path = entry?.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some(MIGRATION_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                files.push(MigrationFile {
                    name: name.to_string(),
                    path: path.clone(),
                });
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Writes a new migration file, creating the directory if needed.
    /// Never overwrites an existing file.
    pub fn create(&self, name: &str, contents: &str) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.path)?;
        let path = self.file_path(name);
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => MigrateError::MigrationExists(path.clone()),
                _ => MigrateError::Io(e),
            })?;
        file.write_all(contents.as_bytes())?;
        Ok(path)
    }
}
