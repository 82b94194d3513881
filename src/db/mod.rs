//! Database module for SQLite persistence.
//!
//! SQLite is the source of truth for all application data. Regulations,
//! versions, changes and comments form a cascade: deleting a regulation
//! removes its whole subtree.

mod repository;

pub use repository::*;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Initialize the database connection pool and run migrations.
pub async fn init_database(db_path: &Path) -> Result<SqlitePool, sqlx::Error> {
    // Ensure the parent directory exists
    if let Some(parent) = db_path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }

    let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

    let options = SqliteConnectOptions::from_str(&db_url)?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_secs(30));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    // Run embedded migrations
    run_migrations(&pool).await?;

    Ok(pool)
}

/// Run database migrations.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS regulations (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            last_updated TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS versions (
            id TEXT NOT NULL,
            regulation_id TEXT NOT NULL REFERENCES regulations(id) ON DELETE CASCADE,
            seq INTEGER NOT NULL,
            version TEXT NOT NULL,
            title TEXT,
            upload_date TEXT NOT NULL,
            file_name TEXT NOT NULL,
            object_key TEXT NOT NULL,
            PRIMARY KEY (regulation_id, id)
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS changes (
            id TEXT PRIMARY KEY,
            regulation_id TEXT NOT NULL,
            version_id TEXT NOT NULL,
            summary TEXT NOT NULL,
            analysis TEXT NOT NULL,
            change TEXT NOT NULL,
            before_quote TEXT NOT NULL,
            after_quote TEXT NOT NULL,
            change_type TEXT NOT NULL,
            confidence REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            classification TEXT,
            FOREIGN KEY (regulation_id, version_id)
                REFERENCES versions(regulation_id, id) ON DELETE CASCADE
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS comments (
            id TEXT PRIMARY KEY,
            change_id TEXT NOT NULL REFERENCES changes(id) ON DELETE CASCADE,
            author TEXT NOT NULL,
            content TEXT NOT NULL,
            timestamp TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            role TEXT NOT NULL,
            password_hash TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_seen (
            notification_id TEXT NOT NULL REFERENCES notifications(id) ON DELETE CASCADE,
            username TEXT NOT NULL,
            PRIMARY KEY (notification_id, username)
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Indexes for common queries
    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_versions_regulation ON versions(regulation_id)",
        "CREATE INDEX IF NOT EXISTS idx_changes_version ON changes(regulation_id, version_id)",
        "CREATE INDEX IF NOT EXISTS idx_comments_change ON comments(change_id)",
        "CREATE INDEX IF NOT EXISTS idx_notifications_created ON notifications(created_at)",
    ] {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}
