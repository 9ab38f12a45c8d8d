//! Statement execution.
//!
//! The engine runs the statements of one migration direction against a
//! single connection, stopping at the first failure. In dry-run mode nothing
//! reaches the database: statements are rendered with their bound values and
//! returned for preview.

use sqlx::any::AnyArguments;
use sqlx::query::Query;
use sqlx::{Any, AnyPool};
use tracing::{debug, info};

use crate::error::{MigrateError, Result};
use crate::script::{BindValue, Statement};

/// Runs migration statements.
#[derive(Debug, Clone)]
pub struct ExecutionEngine {
    pool: AnyPool,
    dry_run: bool,
}

impl ExecutionEngine {
    pub fn new(pool: AnyPool) -> Self {
        Self {
            pool,
            dry_run: false,
        }
    }

    /// Enables dry-run mode (SQL is rendered but not executed).
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Runs `statements` in order and returns them as executed, or rendered
    /// with literal values in dry-run mode.
    ///
    /// The first failing statement aborts the call. Statements that already
    /// ran are not rolled back.
    pub async fn run(&self, statements: &[Statement]) -> Result<Vec<String>> {
        if self.dry_run {
            return statements.iter().map(Statement::render).collect();
        }

        let mut conn = self.pool.acquire().await?;
        let mut log = Vec::with_capacity(statements.len());
        for statement in statements {
            debug!(sql = %statement, "Executing statement");
            if statement.has_binds() {
                let (sql, values) = statement.prepare()?;
                let query = values.into_iter().fold(sqlx::query(&sql), bind);
                query
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| MigrateError::statement(&statement.sql, e))?;
            } else {
                sqlx::raw_sql(&statement.sql)
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| MigrateError::statement(&statement.sql, e))?;
            }
            log.push(statement.sql.clone());
        }
        info!(count = log.len(), "Executed statements");
        Ok(log)
    }

    /// Runs stored SQL text that may hold several `;`-terminated statements.
    pub async fn run_raw(&self, sql: &str) -> Result<Vec<String>> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Ok(Vec::new());
        }
        if !self.dry_run {
            debug!(sql, "Executing stored statements");
            sqlx::raw_sql(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| MigrateError::statement(sql, e))?;
        }
        Ok(vec![sql.to_string()])
    }
}

fn bind<'q>(
    query: Query<'q, Any, AnyArguments<'q>>,
    value: BindValue,
) -> Query<'q, Any, AnyArguments<'q>> {
    match value {
        BindValue::Null => query.bind(Option::<String>::None),
        BindValue::Bool(b) => query.bind(b),
        BindValue::Int(i) => query.bind(i),
        BindValue::Float(f) => query.bind(f),
        BindValue::Text(s) => query.bind(s),
    }
}
