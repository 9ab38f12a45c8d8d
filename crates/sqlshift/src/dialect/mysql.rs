//! MySQL record table dialect.

use super::RecordDialect;

/// MySQL and MariaDB dialect.
///
/// MySQL 8.0.20 deprecated `VALUES(col)` in `ON DUPLICATE KEY UPDATE` in
/// favour of a row alias, which MariaDB does not support.
#[derive(Debug, Clone)]
pub struct MySqlDialect {
    row_alias: bool,
}

impl MySqlDialect {
    /// Creates a MySQL dialect.
    #[must_use]
    pub const fn new() -> Self {
        Self { row_alias: true }
    }

    /// Creates a MariaDB dialect.
    #[must_use]
    pub const fn mariadb() -> Self {
        Self { row_alias: false }
    }
}

impl Default for MySqlDialect {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        if self.row_alias {
            "mysql"
        } else {
            "mariadb"
        }
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn table_exists_sql(&self) -> &'static str {
        "SELECT `table_name` FROM `information_schema`.`tables` \
         WHERE `table_schema` = DATABASE() AND `table_name` = ?"
    }

    fn create_table_sql(&self, table: &str) -> String {
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n  \
             `name` varchar(255) NOT NULL DEFAULT '',\n  \
             `created_at` datetime NOT NULL DEFAULT current_timestamp(),\n  \
             `updated_at` datetime DEFAULT NULL ON UPDATE current_timestamp(),\n  \
             `down_queries` text,\n  \
             PRIMARY KEY (`name`)\n\
             ) ENGINE=InnoDB",
            self.quote_identifier(table)
        )
    }

    fn upsert_sql(&self, table: &str) -> String {
        let table = self.quote_identifier(table);
        if self.row_alias {
            format!(
                "INSERT INTO {table} (`name`, `down_queries`) VALUES (?, ?) AS `new` \
                 ON DUPLICATE KEY UPDATE `updated_at` = NOW(), `down_queries` = `new`.`down_queries`"
            )
        } else {
            format!(
                "INSERT INTO {table} (`name`, `down_queries`) VALUES (?, ?) \
                 ON DUPLICATE KEY UPDATE `updated_at` = NOW(), `down_queries` = VALUES(`down_queries`)"
            )
        }
    }

    // The Any driver has no DATETIME mapping, so timestamps come back as text.
    fn select_all_sql(&self, table: &str) -> String {
        format!(
            "SELECT `name`, CAST(`created_at` AS CHAR), CAST(`updated_at` AS CHAR), `down_queries` \
             FROM {} ORDER BY `name`",
            self.quote_identifier(table)
        )
    }
}
