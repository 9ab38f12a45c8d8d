//! Column diff query builder.

use sqlshift_schema::diff::{ColumnDiff, Diff};
use sqlshift_schema::schema::{Column, DefaultValue};

use crate::query::MigrationQuery;

use super::{quote, quote_literal};

/// Builds `ALTER TABLE ... ADD|DROP|CHANGE COLUMN` statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnQueryBuilder;

impl ColumnQueryBuilder {
    /// Builds the UP and DOWN statements for a column diff on `table`.
    ///
    /// ```text
    /// UP:   ALTER TABLE `blog` ADD COLUMN `hits` BIGINT(20) NOT NULL DEFAULT '0';
    /// DOWN: ALTER TABLE `blog` DROP COLUMN `hits`;
    /// ```
    #[must_use]
    pub fn build_query(&self, diff: &ColumnDiff, table: &str, default_charset: &str) -> MigrationQuery {
        let table = quote(table);
        match diff {
            Diff::New(source) => MigrationQuery::pair(
                self.add(&table, source, default_charset),
                Self::drop(&table, source),
            ),
            Diff::Deleted(target) => MigrationQuery::pair(
                Self::drop(&table, target),
                self.add(&table, target, default_charset),
            ),
            Diff::Modified { source, target } => MigrationQuery::pair(
                self.change(&table, source, default_charset),
                self.change(&table, target, default_charset),
            ),
        }
    }

    fn add(&self, table: &str, column: &Column, default_charset: &str) -> String {
        format!(
            "ALTER TABLE {table} ADD COLUMN {};",
            self.build_signature(column, default_charset)
        )
    }

    fn drop(table: &str, column: &Column) -> String {
        format!("ALTER TABLE {table} DROP COLUMN {};", quote(&column.name))
    }

    fn change(&self, table: &str, column: &Column, default_charset: &str) -> String {
        format!(
            "ALTER TABLE {table} CHANGE COLUMN {} {};",
            quote(&column.name),
            self.build_signature(column, default_charset)
        )
    }

    /// Renders a column definition, e.g.
    /// `` `title` VARCHAR(100) CHARACTER SET utf8 DEFAULT NULL COMMENT 'Title' ``.
    ///
    /// `default_charset` is used when the column is binary but names no charset.
    #[must_use]
    pub fn build_signature(&self, column: &Column, default_charset: &str) -> String {
        let ty = &column.column_type;
        let mut sig = format!("{} {}", quote(&column.name), ty.to_sql());

        if ty.is_numeric() {
            if column.unsigned {
                sig.push_str(" UNSIGNED");
            }
            if column.zerofill {
                sig.push_str(" ZEROFILL");
            }
        }

        if ty.is_textual() {
            let charset = column.charset.as_deref().filter(|c| !c.is_empty());
            if let Some(charset) = charset {
                sig.push_str(&format!(" CHARACTER SET {charset}"));
            } else if column.binary {
                sig.push_str(&format!(" CHARACTER SET {default_charset}"));
            }

            if column.binary {
                sig.push_str(&format!(" COLLATE {}_bin", charset.unwrap_or(default_charset)));
            } else if let Some(collate) = column.collate.as_deref().filter(|c| !c.is_empty()) {
                sig.push_str(&format!(" COLLATE {collate}"));
            }
        }

        if !column.nullable {
            sig.push_str(" NOT NULL");
        } else if ty.is_timestamp() {
            sig.push_str(" NULL");
        }

        sig.push_str(&default_clause(column));

        if column.is_auto_primary_key() {
            sig.push_str(" AUTO_INCREMENT PRIMARY KEY");
        }

        if column.on_update_timestamp && ty.is_auto_timestamp() {
            sig.push_str(" ON UPDATE current_timestamp()");
        }

        if let Some(comment) = column.comment.as_deref().filter(|c| !c.is_empty()) {
            sig.push_str(&format!(" COMMENT {}", quote_literal(comment)));
        }

        sig
    }
}

fn default_clause(column: &Column) -> String {
    match &column.default {
        DefaultValue::CurrentTimestamp if column.column_type.is_auto_timestamp() => {
            " DEFAULT current_timestamp()".to_string()
        }
        DefaultValue::Null => " DEFAULT NULL".to_string(),
        DefaultValue::Literal(value) => format!(" DEFAULT {}", quote_literal(value)),
        DefaultValue::None | DefaultValue::CurrentTimestamp if column.nullable => {
            " DEFAULT NULL".to_string()
        }
        DefaultValue::None | DefaultValue::CurrentTimestamp => String::new(),
    }
}
