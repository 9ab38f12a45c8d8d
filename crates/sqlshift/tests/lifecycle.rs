//! Upgrade and downgrade against an in-memory SQLite database.

mod common;

use common::{memory_pool, migrator, states, store, tables, write_migration};
use sqlshift::prelude::*;

const USERS: &str = "2024-001-00001_users";
const POSTS: &str = "2024-002-00002_posts";

fn write_fixtures(dir: &std::path::Path) {
    write_migration(
        dir,
        USERS,
        r#"
up:
  - run: "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);"
  - run: "INSERT INTO users (id, name) VALUES (?, ?);"
    binds: [1, "o'brien"]
down:
  - run: "DROP TABLE users;"
"#,
    );
    write_migration(
        dir,
        POSTS,
        r#"
up:
  - run: "CREATE TABLE posts (id INTEGER PRIMARY KEY, user_id INTEGER, title TEXT);"
  - run: "INSERT INTO posts (user_id, title) VALUES (:user, :title);"
    binds: { user: 1, title: "hello" }
down:
  - run: "DELETE FROM posts WHERE title = :title"
    binds: { title: "hello" }
  - run: "DROP TABLE posts"
"#,
    );
}

#[tokio::test]
async fn test_full_lifecycle() {
    let pool = memory_pool().await;
    let tmp = tempfile::tempdir().unwrap();
    write_fixtures(tmp.path());

    let live = migrator(&pool, tmp.path(), false);
    let reports = live.upgrade(None, None).await.unwrap();
    let applied: Vec<&str> = reports.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(applied, [USERS, POSTS]);
    assert_eq!(tables(&pool).await, ["posts", "users"]);

    let records = store(&pool).list_all().await.unwrap();
    assert_eq!(records[1].name, POSTS);
    assert_eq!(
        records[1].down_queries,
        "DELETE FROM posts WHERE title = 'hello';\nDROP TABLE posts;"
    );

    // Nothing left to apply.
    assert!(live.upgrade(None, None).await.unwrap().is_empty());

    // The file of an applied migration disappears.
    std::fs::remove_file(tmp.path().join(format!("{POSTS}.yaml"))).unwrap();
    assert_eq!(
        states(&live.info(false).await.unwrap()),
        [
            (USERS.to_string(), MigrationState::Applied),
            (POSTS.to_string(), MigrationState::Deleted),
        ]
    );

    // Dry run previews without touching anything.
    let preview = migrator(&pool, tmp.path(), true)
        .downgrade(None, None)
        .await
        .unwrap();
    assert_eq!(preview.len(), 2);
    assert_eq!(preview[0].state, MigrationState::Deleted);
    assert_eq!(
        preview[0].statements,
        ["DELETE FROM posts WHERE title = 'hello';\nDROP TABLE posts;"]
    );
    assert_eq!(preview[1].statements, ["DROP TABLE users;"]);
    assert_eq!(store(&pool).list_all().await.unwrap().len(), 2);
    assert_eq!(tables(&pool).await, ["posts", "users"]);

    // The deleted migration is reverted first, from its record.
    let reverted = live.downgrade(None, Some(1)).await.unwrap();
    assert_eq!(reverted[0].name, POSTS);
    assert_eq!(tables(&pool).await, ["users"]);

    let reverted = live.downgrade(None, None).await.unwrap();
    assert_eq!(reverted[0].name, USERS);
    assert!(tables(&pool).await.is_empty());
    assert!(store(&pool).list_all().await.unwrap().is_empty());
    assert_eq!(
        states(&live.info(false).await.unwrap()),
        [(USERS.to_string(), MigrationState::New)]
    );
}

#[tokio::test]
async fn test_dry_run_upgrade_leaves_database_untouched() {
    let pool = memory_pool().await;
    let tmp = tempfile::tempdir().unwrap();
    write_fixtures(tmp.path());

    let reports = migrator(&pool, tmp.path(), true)
        .upgrade(None, Some(1))
        .await
        .unwrap();

    assert_eq!(reports.len(), 1);
    assert_eq!(
        reports[0].statements,
        [
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL);",
            "INSERT INTO users (id, name) VALUES (1, 'o''brien');",
        ]
    );
    assert!(tables(&pool).await.is_empty());
    assert!(!store(&pool).table_exists().await.unwrap());
}

#[tokio::test]
async fn test_failed_upgrade_is_not_recorded() {
    let pool = memory_pool().await;
    let tmp = tempfile::tempdir().unwrap();
    write_migration(
        tmp.path(),
        "2024-001-00001_broken",
        r#"
up:
  - run: "CREATE TABLE first (id INTEGER);"
  - run: "INSERT INTO nowhere VALUES (1);"
  - run: "CREATE TABLE second (id INTEGER);"
down:
  - run: "DROP TABLE first;"
"#,
    );

    let live = migrator(&pool, tmp.path(), false);
    let err = live.upgrade(None, None).await.unwrap_err();
    assert!(matches!(err, MigrateError::Statement { .. }));

    // Statements before the failure stay applied.
    assert_eq!(tables(&pool).await, ["first"]);
    assert_eq!(
        states(&live.info(false).await.unwrap()),
        [("2024-001-00001_broken".to_string(), MigrationState::New)]
    );
}

#[tokio::test]
async fn test_unrenderable_down_bind_stops_before_up() {
    let pool = memory_pool().await;
    let tmp = tempfile::tempdir().unwrap();
    write_migration(
        tmp.path(),
        "2024-001-00001_ratio",
        r#"
up:
  - run: "CREATE TABLE ratio (v REAL);"
down:
  - run: "DELETE FROM ratio WHERE v = ?;"
    binds: [.inf]
  - run: "DROP TABLE ratio;"
"#,
    );

    let live = migrator(&pool, tmp.path(), false);
    let err = live.upgrade(None, None).await.unwrap_err();
    assert!(matches!(err, MigrateError::InvalidBind { .. }));
    assert!(tables(&pool).await.is_empty());
}

#[tokio::test]
async fn test_targeted_upgrade_and_reapply() {
    let pool = memory_pool().await;
    let tmp = tempfile::tempdir().unwrap();
    write_migration(
        tmp.path(),
        "2024-001-00001_settings",
        r#"
up:
  - run: "CREATE TABLE IF NOT EXISTS settings (code TEXT PRIMARY KEY);"
down:
  - run: "DROP TABLE settings;"
"#,
    );
    write_fixtures(tmp.path());

    let live = migrator(&pool, tmp.path(), false);
    let reports = live.upgrade(Some(POSTS), None).await.unwrap();
    assert_eq!(reports.len(), 1);

    live.upgrade(Some("2024-001-00001_settings"), None).await.unwrap();
    live.upgrade(Some("2024-001-00001_settings"), None).await.unwrap();

    let records = store(&pool).list_all().await.unwrap();
    let settings = records
        .iter()
        .find(|r| r.name == "2024-001-00001_settings")
        .unwrap();
    assert!(settings.updated_at.is_some());

    assert!(matches!(
        live.downgrade(Some(USERS), None).await,
        Err(MigrateError::NotApplied(_))
    ));
    assert!(matches!(
        live.upgrade(Some("2030-001-00001_missing"), None).await,
        Err(MigrateError::MigrationNotFound(_))
    ));
}
