//! Error types for the migration system.

use std::path::PathBuf;

/// Errors that can occur during migration operations.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// Database error outside of a migration statement (connection, record table).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A migration statement failed to prepare or execute.
    #[error("Statement failed{}: {source}\n  {sql}", .code.as_ref().map(|c| format!(" [{c}]")).unwrap_or_default())]
    Statement {
        /// The statement as written in the migration.
        sql: String,
        /// Driver error code, when the server reported one.
        code: Option<String>,
        /// Underlying driver error.
        #[source]
        source: sqlx::Error,
    },

    /// A named placeholder has no value in the statement binds.
    #[error("No value bound for placeholder ':{name}' in: {sql}")]
    MissingBind {
        /// The statement as written in the migration.
        sql: String,
        /// Placeholder name without the leading colon.
        name: String,
    },

    /// A bound value has no SQL literal form (NaN or an infinite float).
    #[error("Cannot render bound value {value} in: {sql}")]
    InvalidBind { sql: String, value: String },

    /// IO error (reading/writing migration files).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The migration template could not be read or rendered.
    #[error("Invalid migration template '{path}': {message}")]
    Template {
        /// Template path, or `<bundled>` for the built-in template.
        path: String,
        /// Error message.
        message: String,
    },

    /// A schema description could not be read.
    #[error("Failed to read schema '{path}': {message}")]
    Schema {
        /// Path to the schema file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// The connection URL names a database without a record dialect.
    #[error("Unsupported database URL: {0}")]
    UnsupportedDatabase(String),

    /// Migration file already exists.
    #[error("Migration file already exists: {0}")]
    MigrationExists(PathBuf),

    /// No migrations directory found.
    #[error("Migrations directory not found: {0}")]
    MigrationsDirNotFound(PathBuf),

    /// Failed to parse migration file.
    #[error("Failed to parse migration file '{path}': {message}")]
    InvalidScript {
        /// Path to the migration file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// A record row could not be decoded.
    #[error("Invalid migration record '{name}': {message}")]
    InvalidRecord {
        /// Migration name.
        name: String,
        /// Error message.
        message: String,
    },

    /// Migration not found.
    #[error("Migration {0} not found")]
    MigrationNotFound(String),

    /// The migration exists but has never been applied.
    #[error("Migration {0} is not applied")]
    NotApplied(String),

    /// The migration has no record to remove.
    #[error("Migration {0} is not recorded")]
    NotRecorded(String),

    /// A name pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MigrateError {
    /// Wraps a driver error raised by a migration statement.
    pub(crate) fn statement(sql: &str, source: sqlx::Error) -> Self {
        let code = source
            .as_database_error()
            .and_then(|e| e.code())
            .map(|c| c.into_owned());
        Self::Statement {
            sql: sql.to_string(),
            code,
            source,
        }
    }
}

/// Result type for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statement_error_display() {
        let err = MigrateError::statement("DROP TABLE `nope`;", sqlx::Error::RowNotFound);
        let message = err.to_string();
        assert!(message.starts_with("Statement failed: "));
        assert!(message.ends_with("DROP TABLE `nope`;"));
        assert!(matches!(err, MigrateError::Statement { code: None, .. }));
    }

    #[test]
    fn test_lifecycle_messages() {
        assert_eq!(
            MigrateError::MigrationNotFound("2024-001-00001".into()).to_string(),
            "Migration 2024-001-00001 not found"
        );
        assert_eq!(
            MigrateError::NotApplied("x".into()).to_string(),
            "Migration x is not applied"
        );
    }
}
