//! Upgrade and downgrade state machines.

use tracing::{info, warn};

use crate::dir::MigrationsDir;
use crate::error::{MigrateError, Result};
use crate::executor::ExecutionEngine;
use crate::history::MigrationRecordStore;
use crate::reconciler::{MigrationInfo, MigrationReconciler, MigrationState};
use crate::script::MigrationScript;

/// What one migration step ran, or would run in dry-run mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    pub name: String,
    /// State of the migration before the step.
    pub state: MigrationState,
    pub statements: Vec<String>,
}

/// Applies and reverts migrations.
#[derive(Debug)]
pub struct Migrator {
    store: MigrationRecordStore,
    dir: MigrationsDir,
    engine: ExecutionEngine,
}

impl Migrator {
    pub const fn new(store: MigrationRecordStore, dir: MigrationsDir, engine: ExecutionEngine) -> Self {
        Self { store, dir, engine }
    }

    #[must_use]
    pub const fn store(&self) -> &MigrationRecordStore {
        &self.store
    }

    #[must_use]
    pub const fn dir(&self) -> &MigrationsDir {
        &self.dir
    }

    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.engine.is_dry_run()
    }

    /// Reconciled migrations, see [`MigrationReconciler::find`].
    pub async fn info(&self, changes_only: bool) -> Result<Vec<MigrationInfo>> {
        MigrationReconciler::new(&self.store, &self.dir)
            .find(changes_only)
            .await
    }

    /// Migrations an upgrade would apply, in order.
    pub async fn plan_upgrade(
        &self,
        target: Option<&str>,
        count: Option<usize>,
    ) -> Result<Vec<MigrationInfo>> {
        select_upgrade(self.info(false).await?, target, count)
    }

    /// Migrations a downgrade would revert, in order.
    pub async fn plan_downgrade(
        &self,
        target: Option<&str>,
        count: Option<usize>,
    ) -> Result<Vec<MigrationInfo>> {
        select_downgrade(self.info(false).await?, target, count)
    }

    /// Applies NEW migrations in file order, recording each one after its
    /// `up` statements all succeed.
    pub async fn upgrade(&self, target: Option<&str>, count: Option<usize>) -> Result<Vec<StepReport>> {
        let plan = self.plan_upgrade(target, count).await?;
        if !self.is_dry_run() && !plan.is_empty() {
            self.store.ensure_table().await?;
        }

        let mut reports = Vec::with_capacity(plan.len());
        for migration in plan {
            reports.push(self.apply(migration).await?);
        }
        Ok(reports)
    }

    async fn apply(&self, migration: MigrationInfo) -> Result<StepReport> {
        let file = migration
            .file
            .ok_or_else(|| MigrateError::MigrationNotFound(migration.name.clone()))?;
        let script = MigrationScript::load(&file.path)?;

        // Rendered first so a bad DOWN bind fails before anything runs.
        let down = script.down_text()?;

        info!(name = %migration.name, state = %migration.state, "Applying migration");
        let statements = self.engine.run(script.up()).await?;
        if !self.is_dry_run() {
            self.store.upsert(&migration.name, &down).await?;
        }

        Ok(StepReport {
            name: migration.name,
            state: migration.state,
            statements,
        })
    }

    /// Reverts DELETED migrations from their stored statements, then APPLIED
    /// ones from their files, most recent first. Each record is removed once
    /// its statements all succeed.
    pub async fn downgrade(
        &self,
        target: Option<&str>,
        count: Option<usize>,
    ) -> Result<Vec<StepReport>> {
        let plan = self.plan_downgrade(target, count).await?;

        let mut reports = Vec::with_capacity(plan.len());
        for migration in plan {
            reports.push(self.revert(migration).await?);
        }
        Ok(reports)
    }

    async fn revert(&self, migration: MigrationInfo) -> Result<StepReport> {
        info!(name = %migration.name, state = %migration.state, "Reverting migration");
        let statements = match (&migration.file, &migration.record) {
            (Some(file), _) if migration.state == MigrationState::Applied => {
                let script = MigrationScript::load(&file.path)?;
                self.engine.run(script.down()).await?
            }
            (_, Some(record)) => {
                if record.down_queries.trim().is_empty() {
                    warn!(name = %migration.name, "Deleted migration has no stored down queries");
                }
                self.engine.run_raw(&record.down_queries).await?
            }
            _ => return Err(MigrateError::NotApplied(migration.name)),
        };

        if !self.is_dry_run() {
            self.store.delete(&migration.name).await?;
        }

        Ok(StepReport {
            name: migration.name,
            state: migration.state,
            statements,
        })
    }
}

/// Picks the migrations to apply.
///
/// A target applies exactly that migration, which must have a file. Without
/// a target, NEW migrations are taken in order, limited to `count` when it is
/// positive.
pub fn select_upgrade(
    infos: Vec<MigrationInfo>,
    target: Option<&str>,
    count: Option<usize>,
) -> Result<Vec<MigrationInfo>> {
    if let Some(target) = target {
        let info = infos
            .into_iter()
            .find(|i| i.name == target && i.state != MigrationState::Deleted)
            .ok_or_else(|| MigrateError::MigrationNotFound(target.to_string()))?;
        return Ok(vec![info]);
    }

    let pending = infos
        .into_iter()
        .filter(|i| i.state == MigrationState::New);
    Ok(match count.filter(|&n| n > 0) {
        Some(n) => pending.take(n).collect(),
        None => pending.collect(),
    })
}

/// Picks the migrations to revert.
///
/// Eligible migrations are DELETED and APPLIED ones, scanned from the end of
/// the reconciled list so DELETED entries come first and APPLIED entries run
/// most recent first. A target reverts exactly that migration. A positive
/// `count` keeps the first `count` eligible entries.
pub fn select_downgrade(
    infos: Vec<MigrationInfo>,
    target: Option<&str>,
    count: Option<usize>,
) -> Result<Vec<MigrationInfo>> {
    if let Some(target) = target {
        let info = infos
            .into_iter()
            .find(|i| i.name == target)
            .ok_or_else(|| MigrateError::MigrationNotFound(target.to_string()))?;
        if info.state == MigrationState::New {
            return Err(MigrateError::NotApplied(info.name));
        }
        return Ok(vec![info]);
    }

    let eligible = infos
        .into_iter()
        .rev()
        .filter(|i| i.state != MigrationState::New);
    Ok(match count.filter(|&n| n > 0) {
        Some(n) => eligible.take(n).collect(),
        None => eligible.collect(),
    })
}
