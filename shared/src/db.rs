/// Database connection pool and helpers for Linkdeck.
use anyhow::Result;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use crate::models::{ConversionRecord, ConversionStats, ConversionStatus};

/// Create SQLite connection pool with WAL mode and busy timeout.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(std::time::Duration::from_secs(10))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    info!("Connected to database: {}", database_url);
    Ok(pool)
}

/// Run migrations from the migrations directory.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("../migrations").run(pool).await?;

    info!("Database migrations completed");
    Ok(())
}

/// Register or update user on contact.
pub async fn upsert_user(pool: &SqlitePool, chat_id: i64, username: Option<&str>) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO users (chat_id, username)
        VALUES (?, ?)
        ON CONFLICT(chat_id) DO UPDATE SET
            last_activity = CURRENT_TIMESTAMP,
            username = COALESCE(excluded.username, users.username)
        "#,
    )
    .bind(chat_id)
    .bind(username)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a finished (or failed) conversion.
pub async fn record_conversion(
    pool: &SqlitePool,
    id: &str,
    chat_id: i64,
    file_name: &str,
    stats: &ConversionStats,
    status: ConversionStatus,
    error_msg: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO conversions (id, chat_id, file_name, entries, videos, pdfs, others, status, error_msg)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(id)
    .bind(chat_id)
    .bind(file_name)
    .bind(stats.entries as i64)
    .bind(stats.videos as i64)
    .bind(stats.pdfs as i64)
    .bind(stats.others as i64)
    .bind(status.to_string())
    .bind(error_msg)
    .execute(pool)
    .await?;

    Ok(())
}

/// Most recent conversions for a user, newest first.
pub async fn get_user_conversions(
    pool: &SqlitePool,
    chat_id: i64,
    limit: i64,
) -> Result<Vec<ConversionRecord>> {
    let records = sqlx::query_as::<_, ConversionRecord>(
        r#"
        SELECT * FROM conversions WHERE chat_id = ?
        ORDER BY created_at DESC, rowid DESC LIMIT ?
        "#,
    )
    .bind(chat_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// System-wide counters for the admin `/stats` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemStats {
    pub total_users: i64,
    pub total_conversions: i64,
    pub completed_conversions: i64,
    pub failed_conversions: i64,
    pub total_links: i64,
}

pub async fn get_system_stats(pool: &SqlitePool) -> Result<SystemStats> {
    let (total_users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversions")
        .fetch_one(pool)
        .await?;
    let (completed,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM conversions WHERE status = 'done'")
            .fetch_one(pool)
            .await?;
    let (failed,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM conversions WHERE status = 'error'")
            .fetch_one(pool)
            .await?;
    let (links,): (i64,) = sqlx::query_as(
        "SELECT COALESCE(SUM(entries), 0) FROM conversions WHERE status = 'done'",
    )
    .fetch_one(pool)
    .await?;

    Ok(SystemStats {
        total_users,
        total_conversions: total,
        completed_conversions: completed,
        failed_conversions: failed,
        total_links: links,
    })
}
