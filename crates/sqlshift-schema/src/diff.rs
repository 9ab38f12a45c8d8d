//! Tagged differences between a declared and an observed schema.
//!
//! The source side of a diff is always the declared (desired) state and the
//! target side is the observed state on the server.

use crate::schema::{Column, ForeignKey, Index, Table};

/// One change to a schema object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diff<T> {
    /// Declared but not present on the server.
    New(T),
    /// Present on the server but no longer declared.
    Deleted(T),
    /// Present on both sides with different definitions.
    Modified {
        /// Declared definition.
        source: T,
        /// Observed definition.
        target: T,
    },
}

impl<T> Diff<T> {
    /// Swaps the declared and observed sides.
    #[must_use]
    pub fn invert(self) -> Self {
        match self {
            Self::New(object) => Self::Deleted(object),
            Self::Deleted(object) => Self::New(object),
            Self::Modified { source, target } => Self::Modified {
                source: target,
                target: source,
            },
        }
    }

    /// Returns the declared definition, if any.
    #[must_use]
    pub const fn source(&self) -> Option<&T> {
        match self {
            Self::New(object) | Self::Modified { source: object, .. } => Some(object),
            Self::Deleted(_) => None,
        }
    }

    /// Returns the observed definition, if any.
    #[must_use]
    pub const fn target(&self) -> Option<&T> {
        match self {
            Self::Deleted(object) | Self::Modified { target: object, .. } => Some(object),
            Self::New(_) => None,
        }
    }
}

pub type ColumnDiff = Diff<Column>;
pub type IndexDiff = Diff<Index>;
pub type RelationDiff = Diff<ForeignKey>;

/// Changes inside a table that exists on both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableChanges {
    pub source: Table,
    pub target: Table,
    pub engine_changed: bool,
    pub charset_changed: bool,
    pub collation_changed: bool,
    pub columns: Vec<ColumnDiff>,
    pub indexes: Vec<IndexDiff>,
    pub relations: Vec<RelationDiff>,
}

impl TableChanges {
    /// Creates an empty change set between two definitions of a table.
    #[must_use]
    pub const fn new(source: Table, target: Table) -> Self {
        Self {
            source,
            target,
            engine_changed: false,
            charset_changed: false,
            collation_changed: false,
            columns: Vec::new(),
            indexes: Vec::new(),
            relations: Vec::new(),
        }
    }

    /// Returns true if nothing differs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.engine_changed
            && !self.charset_changed
            && !self.collation_changed
            && self.columns.is_empty()
            && self.indexes.is_empty()
            && self.relations.is_empty()
    }

    /// Swaps the declared and observed sides, including nested diffs.
    #[must_use]
    pub fn invert(self) -> Self {
        Self {
            source: self.target,
            target: self.source,
            engine_changed: self.engine_changed,
            charset_changed: self.charset_changed,
            collation_changed: self.collation_changed,
            columns: self.columns.into_iter().map(Diff::invert).collect(),
            indexes: self.indexes.into_iter().map(Diff::invert).collect(),
            relations: self.relations.into_iter().map(Diff::invert).collect(),
        }
    }
}

/// A table-level difference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableDiff {
    New(Table),
    Deleted(Table),
    Modified(Box<TableChanges>),
}

impl TableDiff {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::New(table) | Self::Deleted(table) => &table.name,
            Self::Modified(changes) => &changes.source.name,
        }
    }

    #[must_use]
    pub fn invert(self) -> Self {
        match self {
            Self::New(table) => Self::Deleted(table),
            Self::Deleted(table) => Self::New(table),
            Self::Modified(changes) => Self::Modified(Box::new(changes.invert())),
        }
    }
}

/// Ordered table differences between two databases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseDiff {
    pub tables: Vec<TableDiff>,
}

impl DatabaseDiff {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    #[test]
    fn test_invert_modified() {
        let diff = Diff::Modified {
            source: Column::new("title", ColumnType::VarChar(250)),
            target: Column::new("title", ColumnType::VarChar(200)),
        };

        let inverted = diff.clone().invert();
        assert_eq!(inverted.source().unwrap().column_type, ColumnType::VarChar(200));
        assert_eq!(inverted.target().unwrap().column_type, ColumnType::VarChar(250));
        assert_eq!(inverted.invert(), diff);
    }

    #[test]
    fn test_invert_new_and_deleted() {
        let col = Column::new("id", ColumnType::Int(11));
        assert_eq!(Diff::New(col.clone()).invert(), Diff::Deleted(col.clone()));
        assert_eq!(Diff::Deleted(col.clone()).invert(), Diff::New(col));
    }

    #[test]
    fn test_table_changes_invert() {
        let mut changes = TableChanges::new(Table::new("post").engine("InnoDB"), Table::new("post"));
        assert!(changes.is_empty());

        changes.engine_changed = true;
        changes
            .columns
            .push(Diff::New(Column::new("id", ColumnType::Int(11))));

        let inverted = changes.invert();
        assert_eq!(inverted.source.engine, None);
        assert_eq!(inverted.target.engine.as_deref(), Some("InnoDB"));
        assert!(matches!(inverted.columns[0], Diff::Deleted(_)));
        assert!(!inverted.is_empty());
    }
}
