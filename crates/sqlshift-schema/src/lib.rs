//! Schema model and differ for `sqlshift`.
//!
//! - [`schema`] describes MySQL tables, columns, indexes and foreign keys.
//! - [`diff`] holds the tagged differences (`New`, `Deleted`, `Modified`)
//!   between a declared and an observed schema.
//! - [`autodetector`] computes those differences.
//!
//! # Example
//!
//! ```rust
//! use sqlshift_schema::prelude::*;
//!
//! let declared = DatabaseSchema::new().table(
//!     Table::new("post")
//!         .column(Column::new("id", ColumnType::Int(11)).not_null().auto_increment())
//!         .column(Column::new("title", ColumnType::VarChar(250)).not_null()),
//! );
//! let observed = DatabaseSchema::new();
//!
//! let diff = Autodetector::new().diff(&declared, &observed).unwrap();
//! assert!(matches!(diff.tables[0], TableDiff::New(_)));
//! ```

pub mod autodetector;
pub mod diff;
pub mod schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::autodetector::{Autodetector, AutodetectorOptions, SchemaDiffer};
    pub use crate::diff::{
        ColumnDiff, DatabaseDiff, Diff, IndexDiff, RelationDiff, TableChanges, TableDiff,
    };
    pub use crate::schema::{
        Column, ColumnType, DatabaseSchema, DefaultValue, Defaults, ForeignKey, ForeignKeyAction,
        Index, IndexKind, Table,
    };
}
