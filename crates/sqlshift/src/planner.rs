//! Migration planning.
//!
//! The planner compares the declared schema against the observed one,
//! compiles the difference into UP and DOWN statements and writes them to a
//! new migration file.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use chrono::{DateTime, Timelike, Utc};
use regex::Regex;
use sqlshift_schema::autodetector::SchemaDiffer;
use sqlshift_schema::diff::DatabaseDiff;
use sqlshift_schema::schema::{DatabaseSchema, Defaults};
use tracing::{debug, info};

use crate::builder::DiffCompiler;
use crate::dir::MigrationsDir;
use crate::error::{MigrateError, Result};
use crate::generator::MigrationGenerator;
use crate::history::DEFAULT_TABLE;
use crate::query::MigrationQuery;

/// Source of the observed schema.
#[async_trait]
pub trait SchemaScanner: Send + Sync {
    async fn scan(&self) -> Result<DatabaseSchema>;
}

/// An in-memory schema scans as itself.
#[async_trait]
impl SchemaScanner for DatabaseSchema {
    async fn scan(&self) -> Result<DatabaseSchema> {
        Ok(self.clone())
    }
}

/// Reads the observed schema from a JSON snapshot.
#[derive(Debug, Clone)]
pub struct SnapshotScanner {
    path: PathBuf,
}

impl SnapshotScanner {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SchemaScanner for SnapshotScanner {
    async fn scan(&self) -> Result<DatabaseSchema> {
        load_schema(&self.path)
    }
}

/// Loads a schema description from a JSON file.
pub fn load_schema(path: &Path) -> Result<DatabaseSchema> {
    let schema_error = |message: String| MigrateError::Schema {
        path: path.to_path_buf(),
        message,
    };
    let content = std::fs::read_to_string(path).map_err(|e| schema_error(e.to_string()))?;
    serde_json::from_str(&content).map_err(|e| schema_error(e.to_string()))
}

/// Plans migrations from schema differences.
pub struct MigrationPlanner {
    scanner: Box<dyn SchemaScanner>,
    differ: Box<dyn SchemaDiffer>,
    compiler: DiffCompiler,
    generator: MigrationGenerator,
    dir: MigrationsDir,
    record_table: String,
}

impl MigrationPlanner {
    pub fn new(
        scanner: Box<dyn SchemaScanner>,
        differ: Box<dyn SchemaDiffer>,
        generator: MigrationGenerator,
        dir: MigrationsDir,
    ) -> Self {
        Self {
            scanner,
            differ,
            compiler: DiffCompiler::new(),
            generator,
            dir,
            record_table: DEFAULT_TABLE.to_string(),
        }
    }

    /// Sets the record table name, which is never part of a diff.
    #[must_use]
    pub fn record_table(mut self, table: impl Into<String>) -> Self {
        self.record_table = table.into();
        self
    }

    /// Diffs `declared` against the observed schema. `None` when they match.
    pub async fn compute_diff(&self, declared: &DatabaseSchema) -> Result<Option<DatabaseDiff>> {
        Ok(self.scan_diff(declared).await?.map(|(diff, _)| diff))
    }

    async fn scan_diff(&self, declared: &DatabaseSchema) -> Result<Option<(DatabaseDiff, Defaults)>> {
        let mut observed = self.scanner.scan().await?;
        observed.tables.retain(|t| t.name != self.record_table);
        debug!(
            declared = declared.tables.len(),
            observed = observed.tables.len(),
            "Comparing schemas"
        );

        let mut declared = declared.clone();
        declared.tables.retain(|t| t.name != self.record_table);

        Ok(self
            .differ
            .diff(&declared, &observed)
            .filter(|diff| !diff.is_empty())
            .map(|diff| (diff, observed.defaults)))
    }

    /// Compiles the difference without writing anything.
    pub async fn build_queries(&self, declared: &DatabaseSchema) -> Result<Option<MigrationQuery>> {
        Ok(self
            .scan_diff(declared)
            .await?
            .map(|(diff, defaults)| self.compiler.compile(&diff, &defaults))
            .filter(|query| !query.is_empty()))
    }

    /// Writes a migration for the difference. Returns `None` when there is
    /// nothing to migrate.
    pub async fn plan(&self, name: Option<&str>, declared: &DatabaseSchema) -> Result<Option<PathBuf>> {
        match self.build_queries(declared).await? {
            Some(query) => self.write(name, &query).map(Some),
            None => {
                info!("No schema changes detected");
                Ok(None)
            }
        }
    }

    /// Writes a migration with empty bodies.
    pub fn plan_empty(&self, name: Option<&str>) -> Result<PathBuf> {
        self.write(name, &MigrationQuery::default())
    }

    fn write(&self, name: Option<&str>, query: &MigrationQuery) -> Result<PathBuf> {
        let name = migration_name(Utc::now(), name, |n| self.dir.exists(n))?;
        let content = self.generator.generate(&name, query)?;
        let path = self.dir.create(&name, &content)?;
        info!(path = %path.display(), up = query.up().len(), down = query.down().len(), "Created migration");
        Ok(path)
    }
}

static INVALID_NAME_CHARS: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9-]"));

/// Builds a migration name: `YYYY-DDD-SSSSS` (UTC year, day of year and
/// second of day), then `_<name>` with characters outside `[A-Za-z0-9-]`
/// replaced by `_`. Taken names get `-2`, `-3`, ... appended.
pub fn migration_name(
    now: DateTime<Utc>,
    name: Option<&str>,
    exists: impl Fn(&str) -> bool,
) -> Result<String> {
    let mut base = format!(
        "{}-{:05}",
        now.format("%Y-%j"),
        now.num_seconds_from_midnight()
    );
    if let Some(name) = name.filter(|n| !n.is_empty()) {
        let invalid = INVALID_NAME_CHARS.as_ref().map_err(Clone::clone)?;
        base.push('_');
        base.push_str(&invalid.replace_all(name, "_"));
    }

    let mut candidate = base.clone();
    let mut suffix = 2;
    while exists(&candidate) {
        candidate = format!("{base}-{suffix}");
        suffix += 1;
    }
    Ok(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sqlshift_schema::autodetector::Autodetector;
    use sqlshift_schema::schema::{Column, ColumnType, Table};

    use crate::script::MigrationScript;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 14, h, m, s).unwrap()
    }

    #[test]
    fn test_migration_name() {
        assert_eq!(migration_name(at(0, 0, 7), None, |_| false).unwrap(), "2024-045-00007");
        assert_eq!(
            migration_name(at(1, 0, 0), Some("add post.hits!"), |_| false).unwrap(),
            "2024-045-03600_add_post_hits_"
        );
        assert_eq!(
            migration_name(at(1, 0, 0), Some("keep-dashes"), |_| false).unwrap(),
            "2024-045-03600_keep-dashes"
        );
        assert!(INVALID_NAME_CHARS.is_ok());
        assert_eq!(
            migration_name(at(1, 0, 0), Some("ünïcode name"), |_| false).unwrap(),
            "2024-045-03600__n_code_name"
        );
    }

    #[test]
    fn test_migration_name_collision() {
        let taken = ["2024-045-03600_x", "2024-045-03600_x-2"];
        let name = migration_name(at(1, 0, 0), Some("x"), |n| taken.contains(&n)).unwrap();
        assert_eq!(name, "2024-045-03600_x-3");
    }

    fn post(title_width: u32) -> Table {
        Table::new("post")
            .column(Column::new("id", ColumnType::Int(11)).not_null())
            .column(Column::new("title", ColumnType::VarChar(title_width)).not_null())
    }

    fn planner(observed: DatabaseSchema, dir: &Path) -> MigrationPlanner {
        MigrationPlanner::new(
            Box::new(observed),
            Box::new(Autodetector::new()),
            MigrationGenerator::bundled(),
            MigrationsDir::new(dir),
        )
    }

    #[tokio::test]
    async fn test_plan_writes_migration() {
        let tmp = tempfile::tempdir().unwrap();
        let observed = DatabaseSchema::new()
            .table(post(200))
            .table(Table::new("migrations").column(Column::new("name", ColumnType::VarChar(255))));
        let planner = planner(observed, tmp.path());

        let declared = DatabaseSchema::new().table(post(250));
        let path = planner.plan(Some("widen"), &declared).await.unwrap().unwrap();
        assert!(path.file_name().unwrap().to_str().unwrap().ends_with("_widen.yaml"));

        let script = MigrationScript::load(&path).unwrap();
        assert_eq!(script.up().len(), 1);
        assert!(script.up()[0].sql.contains("VARCHAR(250)"));
        assert!(script.down()[0].sql.contains("VARCHAR(200)"));
    }

    #[tokio::test]
    async fn test_plan_without_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let planner = planner(DatabaseSchema::new().table(post(200)), tmp.path());
        let declared = DatabaseSchema::new().table(post(200));

        assert!(planner.compute_diff(&declared).await.unwrap().is_none());
        assert!(planner.plan(None, &declared).await.unwrap().is_none());
        assert!(MigrationsDir::new(tmp.path()).scan().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_custom_record_table_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let observed = DatabaseSchema::new().table(Table::new("schema_log"));
        let planner = planner(observed, tmp.path()).record_table("schema_log");

        assert!(planner.build_queries(&DatabaseSchema::new()).await.unwrap().is_none());
    }

    #[test]
    fn test_plan_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let planner = planner(DatabaseSchema::new(), tmp.path());

        let first = planner.plan_empty(Some("seed")).unwrap();
        let second = planner.plan_empty(Some("seed")).unwrap();
        assert_ne!(first, second);

        let script = MigrationScript::load(&first).unwrap();
        assert!(script.up().is_empty() && script.down().is_empty());
    }

    #[test]
    fn test_load_schema_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("schema.json");
        std::fs::write(&path, "{\"tables\": 3}").unwrap();
        assert!(matches!(load_schema(&path), Err(MigrateError::Schema { .. })));
    }
}
