//! SQLite record table dialect.

use super::RecordDialect;

/// SQLite dialect.
#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    /// Creates a new SQLite dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl RecordDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?"
    }

    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  \
             name TEXT NOT NULL PRIMARY KEY DEFAULT '',\n  \
             created_at TEXT NOT NULL DEFAULT (datetime('now')),\n  \
             updated_at TEXT DEFAULT NULL,\n  \
             down_queries TEXT\n\
             )",
            self.quote_identifier(table)
        )
    }

    fn upsert_sql(&self, table: &str) -> String {
        format!(
            "INSERT INTO {} (name, down_queries) VALUES (?, ?) \
             ON CONFLICT(name) DO UPDATE SET updated_at = datetime('now'), \
             down_queries = excluded.down_queries",
            self.quote_identifier(table)
        )
    }

    fn select_all_sql(&self, table: &str) -> String {
        format!(
            "SELECT name, created_at, updated_at, down_queries FROM {} ORDER BY name",
            self.quote_identifier(table)
        )
    }
}
