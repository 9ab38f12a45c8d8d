//! MySQL DDL generation from schema diffs.
//!
//! Each builder turns one kind of diff into a [`MigrationQuery`] whose DOWN
//! statements undo its UP statements. [`DiffCompiler`] folds a whole
//! [`DatabaseDiff`] into a single query, table by table.

mod column;
mod index;
mod relation;
mod table;

pub use column::ColumnQueryBuilder;
pub use index::IndexQueryBuilder;
pub use relation::RelationQueryBuilder;
pub use table::TableQueryBuilder;

use sqlshift_schema::diff::DatabaseDiff;
use sqlshift_schema::schema::Defaults;

use crate::query::MigrationQuery;

/// Compiles a database diff into migration statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiffCompiler {
    tables: TableQueryBuilder,
}

impl DiffCompiler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `defaults` are the server defaults used for anything the diff leaves unset.
    #[must_use]
    pub fn compile(&self, diff: &DatabaseDiff, defaults: &Defaults) -> MigrationQuery {
        diff.tables
            .iter()
            .map(|table| self.tables.build_query(table, defaults))
            .collect()
    }
}

/// Quotes an identifier with backticks.
pub(crate) fn quote(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Quotes and comma-joins identifiers: `` `a`,`b` ``.
pub(crate) fn quote_list(names: &[String]) -> String {
    names.iter().map(|n| quote(n)).collect::<Vec<_>>().join(",")
}

/// Quotes a string literal. Backslashes are escaped as MySQL reads them
/// outside `NO_BACKSLASH_ESCAPES` mode.
pub(crate) fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlshift_schema::diff::{Diff, TableChanges, TableDiff};
    use sqlshift_schema::schema::{Column, ColumnType, Table};

    #[test]
    fn test_quote() {
        assert_eq!(quote("post"), "`post`");
        assert_eq!(quote("we`ird"), "`we``ird`");
        assert_eq!(quote_list(&["a".to_string(), "b".to_string()]), "`a`,`b`");
        assert_eq!(quote_literal("it's"), "'it''s'");
        assert_eq!(quote_literal("C:\\temp\\"), "'C:\\\\temp\\\\'");
    }

    #[test]
    fn test_compile_folds_tables_in_order() {
        let mut changes = TableChanges::new(Table::new("post"), Table::new("post"));
        changes.columns.push(Diff::Modified {
            source: Column::new("title", ColumnType::VarChar(250)).not_null(),
            target: Column::new("title", ColumnType::VarChar(200)).not_null(),
        });
        let diff = DatabaseDiff {
            tables: vec![
                TableDiff::Deleted(
                    Table::new("legacy").column(Column::new("id", ColumnType::Int(11)).not_null()),
                ),
                TableDiff::New(Table::new("empty")),
                TableDiff::Modified(Box::new(changes)),
            ],
        };

        let query = DiffCompiler::new().compile(&diff, &Defaults::default());

        assert_eq!(
            query.up(),
            [
                "DROP TABLE `legacy`;",
                "ALTER TABLE `post` CHANGE COLUMN `title` `title` VARCHAR(250) NOT NULL;",
            ]
        );
        assert_eq!(query.down().len(), 2);
        assert!(query.down()[0].contains("CREATE TABLE `legacy` (\n  `id` INT(11) NOT NULL\n);"));
        assert_eq!(
            query.down()[1],
            "ALTER TABLE `post` CHANGE COLUMN `title` `title` VARCHAR(200) NOT NULL;"
        );
    }

    #[test]
    fn test_compile_empty_diff() {
        let query = DiffCompiler::new().compile(&DatabaseDiff::default(), &Defaults::default());
        assert!(query.is_empty());
    }
}
