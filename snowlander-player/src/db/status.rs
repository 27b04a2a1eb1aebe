//! Persistence of the single `bot_status` row

use crate::error::Result;
use snowlander_common::db::PlaybackStatus;
use sqlx::{Pool, Sqlite};

/// Load the persisted status row, if one was ever written
pub async fn load_status(db: &Pool<Sqlite>) -> Result<Option<PlaybackStatus>> {
    let status = sqlx::query_as::<_, PlaybackStatus>("SELECT * FROM bot_status WHERE id = 1")
        .fetch_optional(db)
        .await?;
    Ok(status)
}

/// Insert or overwrite the status row
pub async fn save_status(db: &Pool<Sqlite>, status: &PlaybackStatus) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bot_status (
            id, guild_id, channel_id, is_connected, is_playing,
            current_track_id, volume, position, last_updated
        )
        VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            guild_id = excluded.guild_id,
            channel_id = excluded.channel_id,
            is_connected = excluded.is_connected,
            is_playing = excluded.is_playing,
            current_track_id = excluded.current_track_id,
            volume = excluded.volume,
            position = excluded.position,
            last_updated = excluded.last_updated
        "#,
    )
    .bind(&status.guild_id)
    .bind(&status.channel_id)
    .bind(status.is_connected)
    .bind(status.is_playing)
    .bind(status.current_track_id)
    .bind(status.volume as f64)
    .bind(status.position)
    .bind(status.last_updated)
    .execute(db)
    .await?;

    Ok(())
}
