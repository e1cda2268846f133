use jiff::Timestamp;
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};
use std::fmt;

/// A YouTube video the user has added, as last fetched from YouTube.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Video {
    pub id: i64,
    pub youtube_video_id: String,
    pub title: String,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<Timestamp>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Video {
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.youtube_video_id)
    }
}

/// A private note attached to a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub id: i64,
    pub video_id: i64,
    pub content: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An entry in the append-only activity log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventLog {
    pub id: i64,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

/// What happened, as recorded in [`EventLog::event_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    VideoFetched,
    VideoViewed,
    VideoSynced,
    VideoUpdated,
    CommentCreated,
    CommentReplyCreated,
    CommentDeleted,
    NoteCreated,
    NoteUpdated,
    NoteDeleted,
}

impl EventKind {
    pub const ALL: [EventKind; 10] = [
        EventKind::VideoFetched,
        EventKind::VideoViewed,
        EventKind::VideoSynced,
        EventKind::VideoUpdated,
        EventKind::CommentCreated,
        EventKind::CommentReplyCreated,
        EventKind::CommentDeleted,
        EventKind::NoteCreated,
        EventKind::NoteUpdated,
        EventKind::NoteDeleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::VideoFetched => "video_fetched",
            EventKind::VideoViewed => "video_viewed",
            EventKind::VideoSynced => "video_synced",
            EventKind::VideoUpdated => "video_updated",
            EventKind::CommentCreated => "comment_created",
            EventKind::CommentReplyCreated => "comment_reply_created",
            EventKind::CommentDeleted => "comment_deleted",
            EventKind::NoteCreated => "note_created",
            EventKind::NoteUpdated => "note_updated",
            EventKind::NoteDeleted => "note_deleted",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who triggered an event, when the caller knows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOrigin {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

fn decode_error(column: &str, e: impl fmt::Display) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.to_string().into(),
    }
}

/// Timestamps are stored as whole seconds since the Unix epoch.
fn timestamp(row: &SqliteRow, column: &str) -> Result<Timestamp, sqlx::Error> {
    let seconds: i64 = row.try_get(column)?;
    Timestamp::from_second(seconds).map_err(|e| decode_error(column, e))
}

fn optional_timestamp(row: &SqliteRow, column: &str) -> Result<Option<Timestamp>, sqlx::Error> {
    let seconds: Option<i64> = row.try_get(column)?;
    seconds
        .map(|s| Timestamp::from_second(s).map_err(|e| decode_error(column, e)))
        .transpose()
}

impl<'r> FromRow<'r, SqliteRow> for Video {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            youtube_video_id: row.try_get("youtube_video_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            thumbnail_url: row.try_get("thumbnail_url")?,
            published_at: optional_timestamp(row, "published_at")?,
            view_count: row.try_get("view_count")?,
            like_count: row.try_get("like_count")?,
            comment_count: row.try_get("comment_count")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for Note {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            video_id: row.try_get("video_id")?,
            content: row.try_get("content")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for EventLog {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let raw: Option<String> = row.try_get("event_data")?;
        let event_data = match raw {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| decode_error("event_data", e))?,
            None => serde_json::Value::Null,
        };
        Ok(Self {
            id: row.try_get("id")?,
            event_type: row.try_get("event_type")?,
            event_data,
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
            created_at: timestamp(row, "created_at")?,
        })
    }
}
