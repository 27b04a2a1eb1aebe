//! Database initialization
//!
//! Creates the database file on first run and the three tables the
//! coordinator persists to: `tracks`, `queue_items` and `bot_status`.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Open (creating if needed) the database at `db_path` and ensure the schema
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Applied to every pooled connection, not just the first one
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent)
///
/// Separate from [`init_database`] so in-memory pools used by tests get the
/// same schema.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(pool)
        .await?;

    create_tracks_table(pool).await?;
    create_queue_items_table(pool).await?;
    create_bot_status_table(pool).await?;

    Ok(())
}

async fn create_tracks_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL UNIQUE,
            filepath TEXT NOT NULL,
            title TEXT,
            artist TEXT,
            album TEXT,
            genre TEXT,
            year INTEGER,
            duration REAL,
            file_size INTEGER,
            format TEXT,
            bitrate INTEGER,
            sample_rate INTEGER,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_played TIMESTAMP,
            play_count INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    for column in ["title", "artist", "album", "genre"] {
        let sql = format!(
            "CREATE INDEX IF NOT EXISTS idx_tracks_{column} ON tracks({column})"
        );
        sqlx::query(&sql).execute(pool).await?;
    }

    Ok(())
}

async fn create_queue_items_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            track_id INTEGER NOT NULL REFERENCES tracks(id),
            position INTEGER NOT NULL,
            requested_by TEXT,
            requested_at TIMESTAMP NOT NULL,
            played INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Ascending scans of the pending queue
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_queue_items_pending ON queue_items(played, position)",
    )
    .execute(pool)
    .await?;

    // Positions are unique among unplayed entries
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_queue_items_unplayed_position
        ON queue_items(position) WHERE played = 0
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_bot_status_table(pool: &SqlitePool) -> Result<()> {
    // Single-row table: the CHECK pins the only valid id
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bot_status (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            guild_id TEXT,
            channel_id TEXT,
            is_connected INTEGER NOT NULL DEFAULT 0,
            is_playing INTEGER NOT NULL DEFAULT 0,
            current_track_id INTEGER REFERENCES tracks(id),
            volume REAL NOT NULL DEFAULT 0.5,
            position REAL NOT NULL DEFAULT 0.0,
            last_updated TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
