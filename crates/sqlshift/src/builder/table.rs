//! Table diff query builder.

use sqlshift_schema::diff::{TableChanges, TableDiff};
use sqlshift_schema::schema::{Defaults, Table};
use tracing::warn;

use crate::query::MigrationQuery;

use super::column::ColumnQueryBuilder;
use super::index::IndexQueryBuilder;
use super::quote;
use super::relation::RelationQueryBuilder;

/// Builds table level statements and delegates nested changes to the
/// column, index and relation builders.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableQueryBuilder {
    columns: ColumnQueryBuilder,
    indexes: IndexQueryBuilder,
    relations: RelationQueryBuilder,
}

impl TableQueryBuilder {
    /// A new or deleted table without columns cannot be created, so it yields
    /// no statements.
    #[must_use]
    pub fn build_query(&self, diff: &TableDiff, defaults: &Defaults) -> MigrationQuery {
        if let TableDiff::New(table) | TableDiff::Deleted(table) = diff {
            if table.columns.is_empty() {
                warn!(table = diff.name(), "Skipping table without columns");
                return MigrationQuery::default();
            }
        }

        match diff {
            TableDiff::New(source) => MigrationQuery::pair(
                self.build_create(source, defaults),
                Self::build_drop(source),
            ),
            TableDiff::Deleted(target) => MigrationQuery::pair(
                Self::build_drop(target),
                self.build_create(target, defaults),
            ),
            TableDiff::Modified(changes) => self.build_alter(changes, defaults),
        }
    }

    fn build_drop(table: &Table) -> String {
        format!("DROP TABLE {};", quote(&table.name))
    }

    /// Renders the full creation script for a table. Session checks are
    /// switched off around the statement so tables can be created in any
    /// order regardless of foreign keys.
    #[must_use]
    pub fn build_create(&self, table: &Table, defaults: &Defaults) -> String {
        let charset = table.charset.as_deref().unwrap_or(&defaults.charset);

        let mut parts: Vec<String> = table
            .columns
            .iter()
            .map(|c| self.columns.build_signature(c, charset))
            .collect();

        // An AUTO_INCREMENT column already declares the primary key inline.
        let inline_primary = table.columns.iter().any(|c| c.is_auto_primary_key());
        parts.extend(
            table
                .indexes
                .iter()
                .filter(|i| !(inline_primary && i.is_primary()))
                .map(|i| self.indexes.build_signature(i)),
        );
        parts.extend(table.relations.iter().map(|r| self.relations.build_signature(r)));

        let mut options = String::new();
        if let Some(engine) = &table.engine {
            options.push_str(&format!(" ENGINE={engine}"));
        }
        if let Some(charset) = &table.charset {
            options.push_str(&format!(" DEFAULT CHARSET={charset}"));
        }
        if let Some(collation) = &table.collation {
            options.push_str(&format!(" COLLATE={collation}"));
        }

        let name = quote(&table.name);
        format!(
            "SET AUTOCOMMIT = 0;\n\
             SET FOREIGN_KEY_CHECKS = 0;\n\
             SET UNIQUE_CHECKS = 0;\n\
             DROP TABLE IF EXISTS {name};\n\
             CREATE TABLE {name} (\n  {}\n){options};\n\
             SET AUTOCOMMIT = 1;\n\
             SET FOREIGN_KEY_CHECKS = 1;\n\
             SET UNIQUE_CHECKS = 1;\n",
            parts.join(",\n  ")
        )
    }

    fn build_alter(&self, changes: &TableChanges, defaults: &Defaults) -> MigrationQuery {
        let source = &changes.source;
        let target = &changes.target;
        let name = quote(&source.name);
        let mut query = MigrationQuery::default();

        if changes.engine_changed {
            let engine = |t: &Table| t.engine.clone().unwrap_or_else(|| defaults.engine.clone());
            query = query.merge(MigrationQuery::pair(
                format!("ALTER TABLE {name} ENGINE = {};", engine(source)),
                format!("ALTER TABLE {name} ENGINE = {};", engine(target)),
            ));
        }

        let charset = |t: &Table| t.charset.clone().unwrap_or_else(|| defaults.charset.clone());
        if changes.charset_changed {
            query = query.merge(MigrationQuery::pair(
                format!("ALTER TABLE {name} CONVERT TO CHARACTER SET {};", charset(source)),
                format!("ALTER TABLE {name} CONVERT TO CHARACTER SET {};", charset(target)),
            ));
        }

        if changes.collation_changed {
            let collation =
                |t: &Table| t.collation.clone().unwrap_or_else(|| defaults.collation.clone());
            query = query.merge(MigrationQuery::pair(
                format!(
                    "ALTER TABLE {name} CONVERT TO CHARACTER SET {} COLLATE {};",
                    charset(source),
                    collation(source)
                ),
                format!(
                    "ALTER TABLE {name} CONVERT TO CHARACTER SET {} COLLATE {};",
                    charset(target),
                    collation(target)
                ),
            ));
        }

        let column_charset = charset(source);
        let nested: MigrationQuery = changes
            .columns
            .iter()
            .map(|d| self.columns.build_query(d, &source.name, &column_charset))
            .chain(changes.indexes.iter().map(|d| self.indexes.build_query(d, &source.name)))
            .chain(
                changes
                    .relations
                    .iter()
                    .map(|d| self.relations.build_query(d, &source.name)),
            )
            .collect();

        query.merge(nested).drops_first()
    }
}
