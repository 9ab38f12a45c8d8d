//! Migration record tracking.
//!
//! The record table holds one row per applied migration together with the
//! SQL that reverses it. It is the only place a migration whose file was
//! deleted can still be reverted from.

use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::any::AnyRow;
use sqlx::{AnyPool, Row};
use tracing::debug;

use crate::dialect::RecordDialect;
use crate::error::{MigrateError, Result};

/// Default name of the record table.
pub const DEFAULT_TABLE: &str = "migrations";

/// A row of the record table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRecord {
    /// Migration name.
    pub name: String,
    /// When the migration was first applied.
    pub created_at: DateTime<Utc>,
    /// When the migration was last re-applied.
    pub updated_at: Option<DateTime<Utc>>,
    /// Statements that revert the migration, separated by newlines.
    pub down_queries: String,
}

impl MigrationRecord {
    /// Time of the most recent execution.
    #[must_use]
    pub fn last_executed_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// Reads and writes the record table.
#[derive(Debug)]
pub struct MigrationRecordStore {
    pool: AnyPool,
    dialect: Box<dyn RecordDialect>,
    table: String,
}

impl MigrationRecordStore {
    pub fn new(pool: AnyPool, dialect: Box<dyn RecordDialect>, table: impl Into<String>) -> Self {
        Self {
            pool,
            dialect,
            table: table.into(),
        }
    }

    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    #[must_use]
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub async fn table_exists(&self) -> Result<bool> {
        let row = sqlx::query(self.dialect.table_exists_sql())
            .bind(self.table.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn create_table(&self) -> Result<()> {
        debug!(table = %self.table, dialect = self.dialect.name(), "Creating record table");
        sqlx::raw_sql(&self.dialect.create_table_sql(&self.table))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Creates the record table unless it already exists.
    pub async fn ensure_table(&self) -> Result<()> {
        if !self.table_exists().await? {
            self.create_table().await?;
        }
        Ok(())
    }

    /// Inserts a record, or refreshes `updated_at` and `down_queries` of an
    /// existing one.
    pub async fn upsert(&self, name: &str, down_queries: &str) -> Result<()> {
        debug!(name, "Recording migration");
        sqlx::query(&self.dialect.upsert_sql(&self.table))
            .bind(name)
            .bind(down_queries)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Removes a record. Fails with [`MigrateError::NotRecorded`] when no row
    /// matched, which happens when another run already removed it.
    pub async fn delete(&self, name: &str) -> Result<()> {
        debug!(name, "Removing migration record");
        let result = sqlx::query(&self.dialect.delete_sql(&self.table))
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(MigrateError::NotRecorded(name.to_string()));
        }
        Ok(())
    }

    /// All records ordered by name.
    pub async fn list_all(&self) -> Result<Vec<MigrationRecord>> {
        let rows = sqlx::query(&self.dialect.select_all_sql(&self.table))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(decode_record).collect()
    }
}

fn decode_record(row: &AnyRow) -> Result<MigrationRecord> {
    let name = text(row, 0)?.unwrap_or_default();
    let invalid = |message: String| MigrateError::InvalidRecord {
        name: name.clone(),
        message,
    };

    let created_at = text(row, 1)?
        .ok_or_else(|| invalid("created_at is NULL".to_string()))
        .and_then(|value| parse_timestamp(&value).map_err(invalid))?;
    let updated_at = text(row, 2)?
        .map(|value| parse_timestamp(&value).map_err(invalid))
        .transpose()?;
    let down_queries = text(row, 3)?.unwrap_or_default();

    Ok(MigrationRecord {
        name,
        created_at,
        updated_at,
        down_queries,
    })
}

/// Reads a text column. MySQL TEXT columns reach the Any driver as blobs.
fn text(row: &AnyRow, index: usize) -> std::result::Result<Option<String>, sqlx::Error> {
    match row.try_get::<Option<String>, _>(index) {
        Ok(value) => Ok(value),
        Err(_) => row
            .try_get::<Option<Vec<u8>>, _>(index)
            .map(|bytes| bytes.map(|b| String::from_utf8_lossy(&b).into_owned())),
    }
}

fn parse_timestamp(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|dt| dt.and_utc())
        .map_err(|e| format!("invalid timestamp '{value}': {e}"))
}
