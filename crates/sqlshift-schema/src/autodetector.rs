//! Autodetector for schema changes.
//!
//! This module compares a declared schema with the schema observed on the
//! server and produces the tagged diffs consumed by the query builders.
//! Output follows declaration order: declared objects first (new or
//! modified), then observed objects that are no longer declared.

use std::collections::{HashMap, HashSet};

use crate::diff::{ColumnDiff, DatabaseDiff, Diff, IndexDiff, RelationDiff, TableChanges, TableDiff};
use crate::schema::{Column, DatabaseSchema, Defaults, ForeignKey, ForeignKeyAction, Index, Table};

/// Computes the differences between a declared and an observed schema.
pub trait SchemaDiffer: Send + Sync {
    /// Returns `None` when both schemas are equivalent.
    fn diff(&self, declared: &DatabaseSchema, observed: &DatabaseSchema) -> Option<DatabaseDiff>;
}

/// Options for the autodetector.
#[derive(Debug, Clone, Default)]
pub struct AutodetectorOptions {
    /// Tables left out of the comparison on both sides.
    pub ignore_tables: Vec<String>,
}

impl AutodetectorOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignores a table.
    #[must_use]
    pub fn ignore_table(mut self, name: impl Into<String>) -> Self {
        self.ignore_tables.push(name.into());
        self
    }
}

/// Default [`SchemaDiffer`].
#[derive(Debug, Default)]
pub struct Autodetector {
    options: AutodetectorOptions,
}

impl SchemaDiffer for Autodetector {
    fn diff(&self, declared: &DatabaseSchema, observed: &DatabaseSchema) -> Option<DatabaseDiff> {
        let diff = self.diff_schemas(declared, observed);
        if diff.is_empty() {
            None
        } else {
            Some(diff)
        }
    }
}

impl Autodetector {
    /// Creates a new autodetector with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new autodetector with custom options.
    #[must_use]
    pub const fn with_options(options: AutodetectorOptions) -> Self {
        Self { options }
    }

    fn is_ignored(&self, table: &str) -> bool {
        self.options.ignore_tables.iter().any(|t| t == table)
    }

    /// Compares two schemas. Server defaults are taken from `observed`.
    #[must_use]
    pub fn diff_schemas(&self, declared: &DatabaseSchema, observed: &DatabaseSchema) -> DatabaseDiff {
        let defaults = &observed.defaults;
        let observed_tables: HashMap<&str, &Table> = observed
            .tables
            .iter()
            .filter(|t| !self.is_ignored(&t.name))
            .map(|t| (t.name.as_str(), t))
            .collect();
        let declared_names: HashSet<&str> =
            declared.tables.iter().map(|t| t.name.as_str()).collect();

        let mut tables = Vec::new();

        for table in declared.tables.iter().filter(|t| !self.is_ignored(&t.name)) {
            match observed_tables.get(table.name.as_str()) {
                Some(current) => {
                    let changes = Self::diff_table(table, current, defaults);
                    if !changes.is_empty() {
                        tables.push(TableDiff::Modified(Box::new(changes)));
                    }
                }
                None => tables.push(TableDiff::New(table.clone())),
            }
        }

        for table in &observed.tables {
            if !self.is_ignored(&table.name) && !declared_names.contains(table.name.as_str()) {
                tables.push(TableDiff::Deleted(table.clone()));
            }
        }

        DatabaseDiff { tables }
    }

    fn diff_table(declared: &Table, observed: &Table, defaults: &Defaults) -> TableChanges {
        let mut changes = TableChanges::new(declared.clone(), observed.clone());

        let engine = |t: &Table| t.engine.clone().unwrap_or_else(|| defaults.engine.clone());
        let charset = |t: &Table| t.charset.clone().unwrap_or_else(|| defaults.charset.clone());
        let collation =
            |t: &Table| t.collation.clone().unwrap_or_else(|| defaults.collation.clone());

        changes.engine_changed = engine(declared) != engine(observed);
        changes.charset_changed = charset(declared) != charset(observed);
        changes.collation_changed = collation(declared) != collation(observed);

        let context = ColumnContext {
            charset: charset(observed),
            collation: collation(observed),
        };
        changes.columns = Self::diff_columns(&declared.columns, &observed.columns, &context);
        changes.indexes = Self::diff_indexes(&declared.indexes, &observed.indexes);
        changes.relations = Self::diff_relations(&declared.relations, &observed.relations);

        changes
    }

    fn diff_columns(declared: &[Column], observed: &[Column], context: &ColumnContext) -> Vec<ColumnDiff> {
        diff_by_key(
            declared,
            observed,
            |c| c.name.as_str(),
            |a, b| context.normalize(a) == context.normalize(b),
        )
    }

    fn diff_indexes(declared: &[Index], observed: &[Index]) -> Vec<IndexDiff> {
        diff_by_key(declared, observed, Index::key, |a, b| {
            a.kind == b.kind && a.columns == b.columns
        })
    }

    fn diff_relations(declared: &[ForeignKey], observed: &[ForeignKey]) -> Vec<RelationDiff> {
        diff_by_key(
            declared,
            observed,
            |fk| fk.name.as_str(),
            |a, b| {
                a.columns == b.columns
                    && a.references_table == b.references_table
                    && a.references_columns == b.references_columns
                    && ForeignKeyAction::normalized(a.on_delete)
                        == ForeignKeyAction::normalized(b.on_delete)
                    && ForeignKeyAction::normalized(a.on_update)
                        == ForeignKeyAction::normalized(b.on_update)
            },
        )
    }
}

/// Effective charset and collation of the observed table, used to compare
/// columns that leave them unset.
struct ColumnContext {
    charset: String,
    collation: String,
}

impl ColumnContext {
    fn normalize(&self, column: &Column) -> Column {
        let mut column = column.clone();
        if column.column_type.is_textual() {
            let charset = column.charset.take().unwrap_or_else(|| self.charset.clone());
            let collate = column.collate.take().unwrap_or_else(|| {
                if charset == self.charset {
                    self.collation.clone()
                } else {
                    String::new()
                }
            });
            column.charset = Some(charset);
            column.collate = Some(collate);
        } else {
            column.charset = None;
            column.collate = None;
            column.binary = false;
        }
        if column.comment.as_deref() == Some("") {
            column.comment = None;
        }
        column
    }
}

/// Matches objects by key, keeping declared order for new and modified
/// objects and observed order for deleted ones.
fn diff_by_key<T, K, E>(declared: &[T], observed: &[T], key: K, same: E) -> Vec<Diff<T>>
where
    T: Clone,
    K: Fn(&T) -> &str,
    E: Fn(&T, &T) -> bool,
{
    let observed_map: HashMap<&str, &T> = observed.iter().map(|o| (key(o), o)).collect();
    let declared_keys: HashSet<&str> = declared.iter().map(|d| key(d)).collect();

    let mut diffs = Vec::new();
    for object in declared {
        match observed_map.get(key(object)) {
            Some(current) if !same(object, current) => diffs.push(Diff::Modified {
                source: object.clone(),
                target: (*current).clone(),
            }),
            Some(_) => {}
            None => diffs.push(Diff::New(object.clone())),
        }
    }
    for object in observed {
        if !declared_keys.contains(key(object)) {
            diffs.push(Diff::Deleted(object.clone()));
        }
    }
    diffs
}
