//! sqlshift CLI
//!
//! Command-line tool for generating and running reversible migrations.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::any::AnyPoolOptions;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use sqlshift::dialect;
use sqlshift::history::DEFAULT_TABLE;
use sqlshift::planner::load_schema;
use sqlshift::prelude::*;

/// Reversible MySQL schema migrations.
#[derive(Parser)]
#[command(name = "sqlshift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Database URL (mysql://, mariadb:// or sqlite:).
    #[arg(short, long, env = "DATABASE_URL")]
    database: Option<String>,

    /// Migrations directory.
    #[arg(short, long, env = "SQLSHIFT_MIGRATIONS_DIR", default_value = "migrations")]
    migrations_dir: PathBuf,

    /// Name of the record table.
    #[arg(short, long, env = "SQLSHIFT_TABLE", default_value = DEFAULT_TABLE)]
    table: String,

    /// Template used to render new migration files.
    #[arg(long, env = "SQLSHIFT_TEMPLATE")]
    template: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the record table.
    Init,

    /// Create an empty migration file.
    Create {
        /// Migration name/description.
        name: Option<String>,
    },

    /// Generate a migration from the difference between two schemas.
    Generate {
        /// Migration name/description.
        name: Option<String>,

        /// Declared schema (JSON).
        #[arg(long)]
        schema: PathBuf,

        /// Observed schema snapshot (JSON).
        #[arg(long)]
        observed: PathBuf,

        /// Tables to leave out of the comparison.
        #[arg(long = "ignore-table")]
        ignore_tables: Vec<String>,

        /// Print SQL without writing a file (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Show migration states.
    Info {
        /// Only show NEW and DELETED migrations.
        #[arg(long)]
        changes: bool,
    },

    /// Apply pending migrations.
    Migrate {
        /// Apply only this migration.
        name: Option<String>,

        /// Number of migrations to apply (all if not specified).
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,
    },

    /// Revert applied migrations.
    Downgrade {
        /// Revert only this migration.
        name: Option<String>,

        /// Number of migrations to revert (all if not specified).
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Show SQL without executing (dry run).
        #[arg(long)]
        dry_run: bool,

        /// Skip the confirmation when reverting everything.
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let dir = MigrationsDir::new(&cli.migrations_dir);

    match &cli.command {
        Commands::Init => {
            let store = connect(&cli).await?;
            store.ensure_table().await?;
            info!("Record table `{}` is ready.", store.table());
        }

        Commands::Create { name } => {
            let planner = MigrationPlanner::new(
                Box::new(DatabaseSchema::new()),
                Box::new(Autodetector::new()),
                generator(&cli)?,
                dir,
            );
            let path = planner.plan_empty(name.as_deref())?;
            println!("Created migration: {}", path.display());
        }

        Commands::Generate {
            name,
            schema,
            observed,
            ignore_tables,
            dry_run,
        } => {
            let declared = load_schema(schema)?;
            let options = ignore_tables
                .iter()
                .fold(AutodetectorOptions::new(), |options, table| {
                    options.ignore_table(table)
                });
            let planner = MigrationPlanner::new(
                Box::new(SnapshotScanner::new(observed)),
                Box::new(Autodetector::with_options(options)),
                generator(&cli)?,
                dir,
            )
            .record_table(&cli.table);

            if *dry_run {
                match planner.build_queries(&declared).await? {
                    Some(query) => {
                        println!("-- up");
                        for sql in query.up() {
                            println!("{sql}");
                        }
                        println!("\n-- down");
                        for sql in query.down() {
                            println!("{sql}");
                        }
                    }
                    None => info!("No diff queries found."),
                }
            } else {
                match planner.plan(name.as_deref(), &declared).await? {
                    Some(path) => println!("Created migration: {}", path.display()),
                    None => info!("No diff queries found."),
                }
            }
        }

        Commands::Info { changes } => {
            let migrator = migrator(&cli, dir, false).await?;
            let infos = migrator.info(*changes).await?;
            if infos.is_empty() {
                info!("No migrations found.");
            } else {
                print_infos(&infos);
            }
        }

        Commands::Migrate {
            name,
            count,
            dry_run,
        } => {
            let migrator = migrator(&cli, dir, *dry_run).await?;
            if *dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }
            let reports = migrator.upgrade(name.as_deref(), *count).await?;
            print_reports("Applied", &reports, *dry_run);
        }

        Commands::Downgrade {
            name,
            count,
            dry_run,
            yes,
        } => {
            let migrator = migrator(&cli, dir, *dry_run).await?;
            let everything = name.is_none() && count.unwrap_or(0) == 0;
            if everything && !dry_run && !yes && !confirm("Are you sure to run all migrations?")? {
                info!("Aborted.");
                return Ok(());
            }
            if *dry_run {
                info!("Dry run mode - SQL will be printed but not executed.");
            }
            let reports = migrator.downgrade(name.as_deref(), *count).await?;
            print_reports("Reverted", &reports, *dry_run);
        }
    }

    Ok(())
}

async fn connect(cli: &Cli) -> anyhow::Result<MigrationRecordStore> {
    let url = cli
        .database
        .as_deref()
        .context("a database URL is required (--database or DATABASE_URL)")?;
    let dialect = dialect::for_url(url)?;

    sqlx::any::install_default_drivers();
    let pool = AnyPoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await
        .with_context(|| format!("failed to connect to {}", dialect.name()))?;

    Ok(MigrationRecordStore::new(pool, dialect, &cli.table))
}

async fn migrator(cli: &Cli, dir: MigrationsDir, dry_run: bool) -> anyhow::Result<Migrator> {
    let store = connect(cli).await?;
    let engine = ExecutionEngine::new(store.pool().clone()).dry_run(dry_run);
    Ok(Migrator::new(store, dir, engine))
}

fn generator(cli: &Cli) -> sqlshift::error::Result<MigrationGenerator> {
    cli.template
        .as_deref()
        .map_or_else(|| Ok(MigrationGenerator::bundled()), MigrationGenerator::from_path)
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [Y/n] ");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

fn print_infos(infos: &[MigrationInfo]) {
    let width = infos
        .iter()
        .map(|i| i.name.len())
        .max()
        .unwrap_or(0)
        .max("Name".len());

    println!("{:<width$}  {:<8}  Last execution", "Name", "State");
    println!("{:-<1$}", "", width + 2 + 8 + 2 + 19);
    for migration in infos {
        let executed = migration.record.as_ref().map_or_else(String::new, |r| {
            r.last_executed_at().format("%Y-%m-%d %H:%M:%S").to_string()
        });
        println!(
            "{:<width$}  {:<8}  {executed}",
            migration.name,
            migration.state.to_string()
        );
    }
}

fn print_reports(verb: &str, reports: &[StepReport], dry_run: bool) {
    if reports.is_empty() {
        info!("No migrations to run.");
        return;
    }
    for report in reports {
        if dry_run {
            println!("-- {} ({})", report.name, report.state);
            for sql in &report.statements {
                println!("{sql}");
            }
            println!();
        } else {
            info!("{verb} {}", report.name);
        }
    }
}
