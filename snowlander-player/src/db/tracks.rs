//! Track catalog queries
//!
//! Substring matching uses SQLite `LIKE`, which is case-insensitive for
//! ASCII. Wildcards in the search term are escaped so they match literally.

use crate::error::{Error, Result};
use snowlander_common::db::{NewTrack, Track};
use snowlander_common::time::now;
use sqlx::{Pool, QueryBuilder, Sqlite};

/// Hard ceiling on one catalog listing page
pub const MAX_LIST_LIMIT: i64 = 200;

/// Filters for browsing the library
#[derive(Debug, Clone, Default)]
pub struct TrackFilter {
    /// Matches title, artist, album or filename
    pub search: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

/// Build a `LIKE` pattern matching `term` anywhere, with wildcards escaped
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

/// First track whose title, artist or filename contains `term`
///
/// Ties are broken by ascending id so the same term always resolves to the
/// same track.
pub async fn find_track(db: &Pool<Sqlite>, term: &str) -> Result<Track> {
    let term = term.trim();
    if term.is_empty() {
        return Err(Error::NotFound("empty search term".to_string()));
    }

    let pattern = like_pattern(term);
    sqlx::query_as::<_, Track>(
        r#"
        SELECT * FROM tracks
        WHERE title LIKE ?1 ESCAPE '\'
           OR artist LIKE ?1 ESCAPE '\'
           OR filename LIKE ?1 ESCAPE '\'
        ORDER BY id ASC
        LIMIT 1
        "#,
    )
    .bind(&pattern)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| Error::NotFound(format!("No tracks found matching '{}'", term)))
}

/// Tracks whose title, artist, album or filename contains `term`
pub async fn search_tracks(db: &Pool<Sqlite>, term: &str, limit: i64) -> Result<Vec<Track>> {
    let limit = limit.clamp(1, MAX_LIST_LIMIT);
    let pattern = like_pattern(term.trim());

    let tracks = sqlx::query_as::<_, Track>(
        r#"
        SELECT * FROM tracks
        WHERE title LIKE ?1 ESCAPE '\'
           OR artist LIKE ?1 ESCAPE '\'
           OR album LIKE ?1 ESCAPE '\'
           OR filename LIKE ?1 ESCAPE '\'
        ORDER BY id ASC
        LIMIT ?2
        "#,
    )
    .bind(&pattern)
    .bind(limit)
    .fetch_all(db)
    .await?;

    Ok(tracks)
}

/// Library listing with optional filters, ordered by artist, album, title
pub async fn list_tracks(db: &Pool<Sqlite>, filter: &TrackFilter) -> Result<Vec<Track>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM tracks WHERE 1 = 1");

    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search.trim());
        query.push(" AND (");
        for (i, column) in ["title", "artist", "album", "filename"].iter().enumerate() {
            if i > 0 {
                query.push(" OR ");
            }
            query.push(*column);
            query.push(" LIKE ");
            query.push_bind(pattern.clone());
            query.push(r" ESCAPE '\'");
        }
        query.push(")");
    }

    for (column, value) in [
        ("artist", &filter.artist),
        ("album", &filter.album),
        ("genre", &filter.genre),
    ] {
        if let Some(value) = value.as_deref().filter(|s| !s.trim().is_empty()) {
            query.push(" AND ");
            query.push(column);
            query.push(" LIKE ");
            query.push_bind(like_pattern(value.trim()));
            query.push(r" ESCAPE '\'");
        }
    }

    let limit = if filter.limit <= 0 { 50 } else { filter.limit.min(MAX_LIST_LIMIT) };
    query.push(" ORDER BY artist, album, title, id LIMIT ");
    query.push_bind(limit);
    query.push(" OFFSET ");
    query.push_bind(filter.offset.max(0));

    let tracks = query.build_query_as::<Track>().fetch_all(db).await?;
    Ok(tracks)
}

pub async fn get_track(db: &Pool<Sqlite>, track_id: i64) -> Result<Track> {
    sqlx::query_as::<_, Track>("SELECT * FROM tracks WHERE id = ?")
        .bind(track_id)
        .fetch_optional(db)
        .await?
        .ok_or(Error::TrackNotFound(track_id))
}

pub async fn track_count(db: &Pool<Sqlite>) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
        .fetch_one(db)
        .await?;
    Ok(count)
}

/// Add a track to the catalog
///
/// Entry point for the library importer; the coordinator itself never
/// writes catalog metadata.
pub async fn insert_track(db: &Pool<Sqlite>, track: &NewTrack) -> Result<Track> {
    let inserted = sqlx::query_as::<_, Track>(
        r#"
        INSERT INTO tracks (
            filename, filepath, title, artist, album, genre, year,
            duration, file_size, format, bitrate, sample_rate, created_at, play_count
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
        RETURNING *
        "#,
    )
    .bind(&track.filename)
    .bind(&track.filepath)
    .bind(&track.title)
    .bind(&track.artist)
    .bind(&track.album)
    .bind(&track.genre)
    .bind(track.year)
    .bind(track.duration)
    .bind(track.file_size)
    .bind(&track.format)
    .bind(track.bitrate)
    .bind(track.sample_rate)
    .bind(now())
    .fetch_one(db)
    .await?;

    Ok(inserted)
}

/// Bump play statistics when a track starts
pub async fn record_play(db: &Pool<Sqlite>, track_id: i64) -> Result<()> {
    let result = sqlx::query(
        "UPDATE tracks SET play_count = play_count + 1, last_played = ? WHERE id = ?",
    )
    .bind(now())
    .bind(track_id)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::TrackNotFound(track_id));
    }
    Ok(())
}
