//! Reversible MySQL schema migrations.
//!
//! `sqlshift` compares a declared schema with the live one, writes the
//! difference as a migration file holding both the forward (`up`) and the
//! reverse (`down`) statements, and keeps a record table of what has been
//! applied.
//!
//! # Architecture
//!
//! - **Builders** - [`builder::DiffCompiler`] turns a schema diff into paired
//!   UP/DOWN DDL statements
//! - **Planner** - [`planner::MigrationPlanner`] diffs, compiles and writes
//!   migration files through the [`generator`] template
//! - **Record store** - [`history::MigrationRecordStore`] tracks applied
//!   migrations and their reverse statements
//! - **Reconciler** - [`reconciler::MigrationReconciler`] derives NEW,
//!   APPLIED and DELETED states from files and records
//! - **Runner** - [`runner::Migrator`] applies and reverts migrations with
//!   the [`executor::ExecutionEngine`]
//!
//! # Example
//!
//! ```rust
//! use sqlshift::prelude::*;
//!
//! let mut changes = TableChanges::new(
//!     Table::new("post").column(Column::new("title", ColumnType::VarChar(250)).not_null()),
//!     Table::new("post").column(Column::new("title", ColumnType::VarChar(200)).not_null()),
//! );
//! changes.columns.push(Diff::Modified {
//!     source: Column::new("title", ColumnType::VarChar(250)).not_null(),
//!     target: Column::new("title", ColumnType::VarChar(200)).not_null(),
//! });
//! let diff = DatabaseDiff {
//!     tables: vec![TableDiff::Modified(Box::new(changes))],
//! };
//!
//! let query = DiffCompiler::new().compile(&diff, &Defaults::default());
//! assert_eq!(
//!     query.up(),
//!     ["ALTER TABLE `post` CHANGE COLUMN `title` `title` VARCHAR(250) NOT NULL;"]
//! );
//! ```
//!
//! # CLI Usage
//!
//! ```bash
//! # Write a migration for the difference between two schema descriptions
//! sqlshift generate add_hits --schema schema.json --observed snapshot.json
//!
//! # Apply pending migrations
//! sqlshift migrate
//!
//! # Show migration states
//! sqlshift info
//!
//! # Revert the most recent migration
//! sqlshift downgrade -n 1
//! ```

pub mod builder;
pub mod dialect;
pub mod dir;
pub mod error;
pub mod executor;
pub mod generator;
pub mod history;
pub mod planner;
pub mod query;
pub mod reconciler;
pub mod runner;
pub mod script;

pub use sqlshift_schema;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::builder::DiffCompiler;
    pub use crate::dialect::{MySqlDialect, RecordDialect, SqliteDialect};
    pub use crate::dir::{MigrationFile, MigrationsDir};
    pub use crate::error::{MigrateError, Result};
    pub use crate::executor::ExecutionEngine;
    pub use crate::generator::MigrationGenerator;
    pub use crate::history::{MigrationRecord, MigrationRecordStore};
    pub use crate::planner::{MigrationPlanner, SchemaScanner, SnapshotScanner};
    pub use crate::query::MigrationQuery;
    pub use crate::reconciler::{MigrationInfo, MigrationReconciler, MigrationState};
    pub use crate::runner::{Migrator, StepReport};
    pub use crate::script::{BindValue, Binds, MigrationScript, Statement};
    pub use sqlshift_schema::prelude::*;
}
