//! Database dialects for the migration record table.
//!
//! Migrations themselves are plain SQL written for the target server. The
//! record table is managed by sqlshift, so each supported database provides
//! the statements used to maintain it.

mod mysql;
mod sqlite;

pub use mysql::MySqlDialect;
pub use sqlite::SqliteDialect;

use crate::error::{MigrateError, Result};

/// Trait for database-specific record table SQL.
///
/// Statements take their values as `?` placeholders in the order documented
/// on each method.
pub trait RecordDialect: Send + Sync + std::fmt::Debug {
    /// Returns the dialect name.
    fn name(&self) -> &'static str;

    /// Quote an identifier (table name, column name, etc.).
    fn quote_identifier(&self, name: &str) -> String;

    /// Returns a row when the table exists. Binds: table name.
    fn table_exists_sql(&self) -> &'static str;

    /// Creates the record table if it is missing.
    fn create_table_sql(&self, table: &str) -> String;

    /// Inserts a record, or refreshes `updated_at` and `down_queries` of an
    /// existing one. Binds: name, down queries.
    fn upsert_sql(&self, table: &str) -> String;

    /// Removes a record. Binds: name.
    fn delete_sql(&self, table: &str) -> String {
        format!(
            "DELETE FROM {} WHERE {} = ?",
            self.quote_identifier(table),
            self.quote_identifier("name")
        )
    }

    /// Selects `name`, `created_at`, `updated_at` and `down_queries` as text,
    /// ordered by name.
    fn select_all_sql(&self, table: &str) -> String;
}

/// Picks the dialect matching a connection URL.
pub fn for_url(url: &str) -> Result<Box<dyn RecordDialect>> {
    let scheme = url.split(':').next().unwrap_or_default().to_ascii_lowercase();
    match scheme.as_str() {
        "mysql" => Ok(Box::new(MySqlDialect::new())),
        "mariadb" => Ok(Box::new(MySqlDialect::mariadb())),
        "sqlite" => Ok(Box::new(SqliteDialect::new())),
        _ => Err(MigrateError::UnsupportedDatabase(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_url() {
        assert_eq!(for_url("mysql://root@127.0.0.1:3306/app").unwrap().name(), "mysql");
        assert_eq!(for_url("mariadb://localhost/app").unwrap().name(), "mariadb");
        assert_eq!(for_url("sqlite::memory:").unwrap().name(), "sqlite");
        assert!(matches!(
            for_url("postgres://localhost/app"),
            Err(MigrateError::UnsupportedDatabase(_))
        ));
    }

    #[test]
    fn test_delete_sql() {
        assert_eq!(
            MySqlDialect::new().delete_sql("migrations"),
            "DELETE FROM `migrations` WHERE `name` = ?"
        );
        assert_eq!(
            SqliteDialect::new().delete_sql("migrations"),
            "DELETE FROM \"migrations\" WHERE \"name\" = ?"
        );
    }
}
