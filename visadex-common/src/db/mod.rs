//! Database access for visadex
//!
//! SQLite schema initialization and connection pool setup. Table schemas
//! live here so the service and the test suites share one definition.

pub mod models;

use anyhow::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Creates the parent directory and database file when missing, then
/// ensures all tables exist.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;
    init_tables(&pool).await?;

    Ok(pool)
}

/// Create visadex tables if they don't exist
///
/// Also used by tests against in-memory pools.
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS countries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            capital TEXT,
            region TEXT,
            sub_region TEXT,
            flag_img TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // status holds only canonical enum strings; NULL means unresolved
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS visa_status (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            passport INTEGER NOT NULL REFERENCES countries(id) ON DELETE CASCADE,
            destination INTEGER NOT NULL REFERENCES countries(id) ON DELETE CASCADE,
            status TEXT,
            notes TEXT,
            UNIQUE(passport, destination),
            CHECK(passport <> destination)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_visa_status_unresolved ON visa_status(passport) WHERE status IS NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            country_id INTEGER NOT NULL REFERENCES countries(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            state_province TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database tables initialized (countries, visa_status, cities)");

    Ok(())
}
