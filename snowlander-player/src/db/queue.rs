//! Queue store queries
//!
//! Among entries with `played = 0`, `position` is unique and orders playback
//! (lowest first). Entries are marked played rather than deleted when the
//! engine takes them, so `queue_items` doubles as request history.

use crate::error::{Error, Result};
use snowlander_common::db::{QueueEntry, QueueEntryWithTrack, Track};
use snowlander_common::time::now;
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{FromRow, Pool, Row, Sqlite};
use tracing::debug;

/// Joined select: queue columns are prefixed, track columns keep their names
const ENTRY_WITH_TRACK_SELECT: &str = r#"
    SELECT q.id AS q_id, q.track_id AS q_track_id, q.position AS q_position,
           q.requested_by AS q_requested_by, q.requested_at AS q_requested_at,
           q.played AS q_played, t.*
    FROM queue_items q
    JOIN tracks t ON t.id = q.track_id
"#;

fn entry_with_track_from_row(row: &SqliteRow) -> std::result::Result<QueueEntryWithTrack, sqlx::Error> {
    let entry = QueueEntry {
        id: row.try_get("q_id")?,
        track_id: row.try_get("q_track_id")?,
        position: row.try_get("q_position")?,
        requested_by: row.try_get("q_requested_by")?,
        requested_at: row.try_get("q_requested_at")?,
        played: row.try_get("q_played")?,
    };
    let track = Track::from_row(row)?;
    Ok(QueueEntryWithTrack { entry, track })
}

/// Append a request for `track_id`
///
/// The position is `max(position of unplayed) + 1`, or 1 for an empty queue.
/// The transaction is opened with `BEGIN IMMEDIATE`, so the write lock is
/// held before the maximum is read; concurrent enqueues queue up on the busy
/// timeout instead of failing or observing the same maximum.
pub async fn enqueue(
    db: &Pool<Sqlite>,
    track_id: i64,
    requested_by: Option<&str>,
) -> Result<QueueEntry> {
    let mut conn = db.acquire().await?;
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

    let result = match append_entry(&mut *conn, track_id, requested_by).await {
        Ok(entry) => sqlx::query("COMMIT")
            .execute(&mut *conn)
            .await
            .map(|_| entry)
            .map_err(Error::from),
        Err(e) => Err(e),
    };

    if result.is_err() {
        if let Err(e) = sqlx::query("ROLLBACK").execute(&mut *conn).await {
            debug!("Rollback after failed enqueue: {}", e);
        }
    }
    result
}

async fn append_entry(
    conn: &mut SqliteConnection,
    track_id: i64,
    requested_by: Option<&str>,
) -> Result<QueueEntry> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tracks WHERE id = ?)")
        .bind(track_id)
        .fetch_one(&mut *conn)
        .await?;
    if !exists {
        return Err(Error::TrackNotFound(track_id));
    }

    sqlx::query_as::<_, QueueEntry>(
        r#"
        INSERT INTO queue_items (track_id, position, requested_by, requested_at, played)
        SELECT ?, COALESCE(MAX(position), 0) + 1, ?, ?, 0
        FROM queue_items
        WHERE played = 0
        RETURNING id, track_id, position, requested_by, requested_at, played
        "#,
    )
    .bind(track_id)
    .bind(requested_by)
    .bind(now())
    .fetch_one(&mut *conn)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::InvalidState("Queue position already taken, retry the request".to_string())
        }
        other => Error::Database(other),
    })
}

/// Unplayed entry with the lowest position
pub async fn peek_next(db: &Pool<Sqlite>) -> Result<Option<QueueEntryWithTrack>> {
    let sql = format!(
        "{} WHERE q.played = 0 ORDER BY q.position ASC LIMIT 1",
        ENTRY_WITH_TRACK_SELECT
    );
    let row = sqlx::query(&sql).fetch_optional(db).await?;
    Ok(row.as_ref().map(entry_with_track_from_row).transpose()?)
}

/// Mark an entry played
///
/// Returns `true` if the entry changed, `false` if it was already played.
/// Unknown ids are `NotFound`.
pub async fn advance(db: &Pool<Sqlite>, entry_id: i64) -> Result<bool> {
    let result = sqlx::query("UPDATE queue_items SET played = 1 WHERE id = ? AND played = 0")
        .bind(entry_id)
        .execute(db)
        .await?;

    if result.rows_affected() > 0 {
        return Ok(true);
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM queue_items WHERE id = ?)")
        .bind(entry_id)
        .fetch_one(db)
        .await?;
    if exists {
        Ok(false)
    } else {
        Err(Error::NotFound(format!("Queue item {} not found", entry_id)))
    }
}

/// Delete an unplayed entry; returns whether one was deleted
pub async fn remove(db: &Pool<Sqlite>, entry_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM queue_items WHERE id = ? AND played = 0")
        .bind(entry_id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Pending entries in play order, at most `limit`
pub async fn list_pending(db: &Pool<Sqlite>, limit: i64) -> Result<Vec<QueueEntryWithTrack>> {
    let sql = format!(
        "{} WHERE q.played = 0 ORDER BY q.position ASC LIMIT ?",
        ENTRY_WITH_TRACK_SELECT
    );
    let rows = sqlx::query(&sql).bind(limit.max(0)).fetch_all(db).await?;

    rows.iter()
        .map(|row| entry_with_track_from_row(row).map_err(Error::from))
        .collect()
}

/// Number of unplayed entries
pub async fn pending_count(db: &Pool<Sqlite>) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_items WHERE played = 0")
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Any entry (played or not) by id
pub async fn get_entry(db: &Pool<Sqlite>, entry_id: i64) -> Result<QueueEntryWithTrack> {
    let sql = format!("{} WHERE q.id = ?", ENTRY_WITH_TRACK_SELECT);
    let row = sqlx::query(&sql)
        .bind(entry_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Queue item {} not found", entry_id)))?;
    Ok(entry_with_track_from_row(&row)?)
}
