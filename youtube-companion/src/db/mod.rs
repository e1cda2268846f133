//! Local SQLite storage for videos, notes and the activity log.

use crate::youtube_api::VideoSnapshot;
use jiff::Timestamp;
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use std::time::Duration;

pub mod models;

pub use models::{EventKind, EventLog, Note, RequestOrigin, Video};

/// Default location of the database when `DATABASE_URL` is not set.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://companion.db";

/// How long a connection waits on a locked database before giving up.
const SQLITE_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Tables are created on connect; there is no migration history.
const SCHEMA: [&str; 6] = [
    "CREATE TABLE IF NOT EXISTS videos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        youtube_video_id TEXT NOT NULL UNIQUE,
        title TEXT NOT NULL,
        description TEXT,
        thumbnail_url TEXT,
        published_at INTEGER,
        view_count INTEGER NOT NULL DEFAULT 0,
        like_count INTEGER NOT NULL DEFAULT 0,
        comment_count INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS notes (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        video_id INTEGER NOT NULL REFERENCES videos(id) ON DELETE CASCADE,
        content TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS index_notes_on_video_id ON notes(video_id)",
    "CREATE TABLE IF NOT EXISTS event_logs (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        event_type TEXT NOT NULL,
        event_data TEXT,
        ip_address TEXT,
        user_agent TEXT,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS index_event_logs_on_event_type ON event_logs(event_type)",
    "CREATE INDEX IF NOT EXISTS index_event_logs_on_created_at ON event_logs(created_at)",
];

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

fn not_blank(field: &str, value: &str) -> Result<(), DbError> {
    if value.trim().is_empty() {
        return Err(DbError::Validation(format!("{field} can't be blank")));
    }
    Ok(())
}

fn count(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Handle to the application database.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if needed) the database at `url` and makes sure the tables exist.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(SQLITE_BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    /// A private database that lives as long as the returned handle.
    pub async fn in_memory() -> Result<Self, DbError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

        // Every connection to :memory: is its own database, so there must only ever be one.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, DbError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// All videos, most recently added first.
    pub async fn recent_videos(&self) -> Result<Vec<Video>, DbError> {
        let videos = sqlx::query_as::<_, Video>(
            "SELECT * FROM videos ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    /// All videos, most viewed first.
    pub async fn videos_by_views(&self) -> Result<Vec<Video>, DbError> {
        let videos = sqlx::query_as::<_, Video>(
            "SELECT * FROM videos ORDER BY view_count DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(videos)
    }

    pub async fn video(&self, id: i64) -> Result<Video, DbError> {
        sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| DbError::NotFound(format!("video {id}")))
    }

    pub async fn video_by_youtube_id(
        &self,
        youtube_video_id: &str,
    ) -> Result<Option<Video>, DbError> {
        let video = sqlx::query_as::<_, Video>("SELECT * FROM videos WHERE youtube_video_id = ?")
            .bind(youtube_video_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(video)
    }

    /// Inserts the video, or overwrites the YouTube-sourced fields of the existing row with the
    /// same `youtube_video_id`.
    pub async fn upsert_video(&self, snapshot: &VideoSnapshot) -> Result<Video, DbError> {
        not_blank("youtube video id", &snapshot.youtube_video_id)?;
        not_blank("title", &snapshot.title)?;
        let now = Timestamp::now().as_second();

        let video = sqlx::query_as::<_, Video>(
            r#"INSERT INTO videos
            (youtube_video_id, title, description, thumbnail_url, published_at,
             view_count, like_count, comment_count, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(youtube_video_id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                thumbnail_url = excluded.thumbnail_url,
                published_at = excluded.published_at,
                view_count = excluded.view_count,
                like_count = excluded.like_count,
                comment_count = excluded.comment_count,
                updated_at = excluded.updated_at
            RETURNING *"#,
        )
        .bind(&snapshot.youtube_video_id)
        .bind(&snapshot.title)
        .bind(&snapshot.description)
        .bind(&snapshot.thumbnail_url)
        .bind(snapshot.published_at.map(|t| t.as_second()))
        .bind(count(snapshot.view_count))
        .bind(count(snapshot.like_count))
        .bind(count(snapshot.comment_count))
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(id = video.id, youtube_video_id = %video.youtube_video_id, "stored video");
        Ok(video)
    }

    pub async fn update_video_stats(
        &self,
        id: i64,
        view_count: u64,
        like_count: u64,
        comment_count: u64,
    ) -> Result<Video, DbError> {
        sqlx::query_as::<_, Video>(
            r#"UPDATE videos
            SET view_count = ?, like_count = ?, comment_count = ?, updated_at = ?
            WHERE id = ?
            RETURNING *"#,
        )
        .bind(count(view_count))
        .bind(count(like_count))
        .bind(count(comment_count))
        .bind(Timestamp::now().as_second())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("video {id}")))
    }

    /// Changes the title and/or description; `None` leaves a field as it is.
    pub async fn update_video_details(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<Video, DbError> {
        if let Some(title) = title {
            not_blank("title", title)?;
        }

        sqlx::query_as::<_, Video>(
            r#"UPDATE videos
            SET title = COALESCE(?, title), description = COALESCE(?, description), updated_at = ?
            WHERE id = ?
            RETURNING *"#,
        )
        .bind(title)
        .bind(description)
        .bind(Timestamp::now().as_second())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("video {id}")))
    }

    /// Removes the local record of a video along with its notes. YouTube is not touched.
    pub async fn delete_video(&self, id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("video {id}")));
        }
        Ok(())
    }

    /// Notes on a video, newest first.
    pub async fn notes_for_video(&self, video_id: i64) -> Result<Vec<Note>, DbError> {
        let notes = sqlx::query_as::<_, Note>(
            "SELECT * FROM notes WHERE video_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    pub async fn create_note(&self, video_id: i64, content: &str) -> Result<Note, DbError> {
        not_blank("content", content)?;
        self.video(video_id).await?;
        let now = Timestamp::now().as_second();

        let note = sqlx::query_as::<_, Note>(
            r#"INSERT INTO notes (video_id, content, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING *"#,
        )
        .bind(video_id)
        .bind(content)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(note)
    }

    /// Rewrites a note's content. The note must belong to `video_id`.
    pub async fn update_note(
        &self,
        video_id: i64,
        note_id: i64,
        content: &str,
    ) -> Result<Note, DbError> {
        not_blank("content", content)?;

        sqlx::query_as::<_, Note>(
            r#"UPDATE notes SET content = ?, updated_at = ?
            WHERE id = ? AND video_id = ?
            RETURNING *"#,
        )
        .bind(content)
        .bind(Timestamp::now().as_second())
        .bind(note_id)
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("note {note_id} on video {video_id}")))
    }

    /// Deletes a note. The note must belong to `video_id`.
    pub async fn delete_note(&self, video_id: i64, note_id: i64) -> Result<(), DbError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ? AND video_id = ?")
            .bind(note_id)
            .bind(video_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!("note {note_id} on video {video_id}")));
        }
        Ok(())
    }

    /// Appends to the activity log.
    pub async fn log_event(
        &self,
        kind: EventKind,
        data: &serde_json::Value,
        origin: Option<&RequestOrigin>,
    ) -> Result<EventLog, DbError> {
        let event = sqlx::query_as::<_, EventLog>(
            r#"INSERT INTO event_logs (event_type, event_data, ip_address, user_agent, created_at)
            VALUES (?, ?, ?, ?, ?)
            RETURNING *"#,
        )
        .bind(kind.as_str())
        .bind(data.to_string())
        .bind(origin.and_then(|o| o.ip_address.as_deref()))
        .bind(origin.and_then(|o| o.user_agent.as_deref()))
        .bind(Timestamp::now().as_second())
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(event = %kind, id = event.id, "logged event");
        Ok(event)
    }

    /// The latest `limit` events, newest first.
    pub async fn recent_events(&self, limit: u32) -> Result<Vec<EventLog>, DbError> {
        let events = sqlx::query_as::<_, EventLog>(
            "SELECT * FROM event_logs ORDER BY created_at DESC, id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }

    pub async fn events_of_type(&self, kind: EventKind) -> Result<Vec<EventLog>, DbError> {
        let events = sqlx::query_as::<_, EventLog>(
            "SELECT * FROM event_logs WHERE event_type = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(events)
    }
}
