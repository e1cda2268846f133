//! The application's user-facing operations.
//!
//! Each operation consults YouTube through [`YouTubeClient`] where needed, updates the local
//! [`Database`], and records what happened in the activity log.

use crate::db::{Database, DbError, EventKind, Note, RequestOrigin, Video};
use crate::token_store::TokenStore;
use crate::youtube_api::{ApiError, CommentSnapshot, DEFAULT_MAX_COMMENTS, YouTubeClient};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

static VIDEO_URL_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"(?:youtube\.com/watch\?v=|youtu\.be/)([^&?/]+)")
            .expect("Failed to compile watch URL regex"),
        Regex::new(r"youtube\.com/embed/([^&?/]+)").expect("Failed to compile embed URL regex"),
        Regex::new(r"youtube\.com/v/([^&?/]+)").expect("Failed to compile /v/ URL regex"),
    ]
});

static BARE_VIDEO_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9_-]{11}$").expect("Failed to compile video id regex")
});

/// Pulls the video ID out of a YouTube watch, short, embed or `/v/` URL, or accepts a bare
/// 11-character ID.
pub fn extract_video_id(url_or_id: &str) -> Option<&str> {
    let input = url_or_id.trim();
    if input.is_empty() {
        return None;
    }

    for pattern in VIDEO_URL_PATTERNS.iter() {
        if let Some(id) = pattern.captures(input).and_then(|c| c.get(1)) {
            return Some(id.as_str());
        }
    }

    BARE_VIDEO_ID.is_match(input).then_some(input)
}

#[derive(Debug, thiserror::Error)]
pub enum CompanionError {
    #[error("invalid YouTube URL: {0:?}")]
    InvalidVideoUrl(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl CompanionError {
    /// True when the user should be sent through the authorization flow.
    pub fn requires_authorization(&self) -> bool {
        matches!(self, Self::Api(e) if e.requires_authorization())
    }
}

/// Result of [`Companion::add_video`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedVideo {
    pub video: Video,
    /// The video was already in the database and nothing was fetched.
    pub already_present: bool,
}

/// A video together with its notes, as shown on its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPage {
    pub video: Video,
    pub notes: Vec<Note>,
    pub authorized: bool,
}

/// The companion application: YouTube on one side, local storage on the other.
#[derive(Debug)]
pub struct Companion<S> {
    youtube: YouTubeClient<S>,
    db: Database,
}

impl<S: TokenStore> Companion<S> {
    pub fn new(youtube: YouTubeClient<S>, db: Database) -> Self {
        Self { youtube, db }
    }

    pub fn youtube(&self) -> &YouTubeClient<S> {
        &self.youtube
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub async fn is_authorized(&self) -> bool {
        self.youtube.oauth().is_authorized().await
    }

    async fn require_authorization(&self) -> Result<(), CompanionError> {
        if self.is_authorized().await {
            Ok(())
        } else {
            Err(ApiError::AuthRequired.into())
        }
    }

    /// Adds a video by URL or ID, fetching its details from YouTube.
    ///
    /// Works without authorization if an API key is configured. A video that is already
    /// stored is returned as is.
    #[tracing::instrument(skip(self, origin))]
    pub async fn add_video(
        &self,
        url_or_id: &str,
        origin: Option<&RequestOrigin>,
    ) -> Result<AddedVideo, CompanionError> {
        let youtube_video_id = extract_video_id(url_or_id)
            .ok_or_else(|| CompanionError::InvalidVideoUrl(url_or_id.to_string()))?;

        if let Some(video) = self.db.video_by_youtube_id(youtube_video_id).await? {
            tracing::info!(id = video.id, "video already exists");
            return Ok(AddedVideo {
                video,
                already_present: true,
            });
        }

        let snapshot = self.youtube.video_details(youtube_video_id).await?;
        let video = self.db.upsert_video(&snapshot).await?;
        self.db
            .log_event(
                EventKind::VideoFetched,
                &json!({ "video_id": video.id, "youtube_video_id": youtube_video_id }),
                origin,
            )
            .await?;

        tracing::info!(id = video.id, title = %video.title, "added video");
        Ok(AddedVideo {
            video,
            already_present: false,
        })
    }

    /// Loads a video and its notes.
    ///
    /// When authorized, the view/like/comment counts are refreshed from YouTube first. Failing
    /// to do so does not fail the operation.
    #[tracing::instrument(skip(self, origin))]
    pub async fn show_video(
        &self,
        id: i64,
        origin: Option<&RequestOrigin>,
    ) -> Result<VideoPage, CompanionError> {
        let mut video = self.db.video(id).await?;
        let authorized = self.is_authorized().await;

        if authorized {
            let snapshot = self
                .youtube
                .fetch_video_details(&video.youtube_video_id)
                .await;
            if let Some(snapshot) = snapshot {
                match self
                    .db
                    .update_video_stats(
                        id,
                        snapshot.view_count,
                        snapshot.like_count,
                        snapshot.comment_count,
                    )
                    .await
                {
                    Ok(updated) => video = updated,
                    Err(e) => tracing::error!(error = %e, "failed to store video stats"),
                }
            }
        }

        let notes = self.db.notes_for_video(id).await?;
        self.db
            .log_event(EventKind::VideoViewed, &json!({ "video_id": id }), origin)
            .await?;

        Ok(VideoPage {
            video,
            notes,
            authorized,
        })
    }

    /// Replaces the stored details of a video with what YouTube currently reports.
    #[tracing::instrument(skip(self, origin))]
    pub async fn sync_video(
        &self,
        id: i64,
        origin: Option<&RequestOrigin>,
    ) -> Result<Video, CompanionError> {
        self.require_authorization().await?;
        let video = self.db.video(id).await?;

        let snapshot = self.youtube.video_details(&video.youtube_video_id).await?;
        let video = self.db.upsert_video(&snapshot).await?;
        self.db
            .log_event(EventKind::VideoSynced, &json!({ "video_id": video.id }), origin)
            .await?;

        Ok(video)
    }

    /// Changes a video's title and/or description on YouTube, then locally.
    ///
    /// Blank values count as "leave unchanged".
    #[tracing::instrument(skip(self, origin))]
    pub async fn update_video(
        &self,
        id: i64,
        title: Option<&str>,
        description: Option<&str>,
        origin: Option<&RequestOrigin>,
    ) -> Result<Video, CompanionError> {
        self.require_authorization().await?;
        let video = self.db.video(id).await?;

        let title = title.filter(|t| !t.trim().is_empty());
        let description = description.filter(|d| !d.trim().is_empty());

        self.youtube
            .update_video(&video.youtube_video_id, title, description)
            .await?;
        let video = self.db.update_video_details(id, title, description).await?;
        self.db
            .log_event(
                EventKind::VideoUpdated,
                &json!({ "video_id": video.id, "title": title }),
                origin,
            )
            .await?;

        Ok(video)
    }

    /// Forgets a video and its notes locally. The video on YouTube is not affected.
    pub async fn remove_video(&self, id: i64) -> Result<(), CompanionError> {
        self.db.delete_video(id).await?;
        tracing::info!(id, "removed video");
        Ok(())
    }

    /// The most recent comments on a video, oldest first.
    ///
    /// Requires authorization. Once authorized, a failure to reach YouTube reads as "no
    /// comments".
    pub async fn comments(&self, video_id: i64) -> Result<Vec<CommentSnapshot>, CompanionError> {
        self.require_authorization().await?;
        let video = self.db.video(video_id).await?;

        Ok(self
            .youtube
            .fetch_comments(&video.youtube_video_id, DEFAULT_MAX_COMMENTS)
            .await)
    }

    /// Posts a new top-level comment, returning the ID YouTube assigned to it.
    #[tracing::instrument(skip(self, text, origin))]
    pub async fn post_comment(
        &self,
        video_id: i64,
        text: &str,
        origin: Option<&RequestOrigin>,
    ) -> Result<String, CompanionError> {
        self.require_authorization().await?;
        let video = self.db.video(video_id).await?;

        let comment_id = self.youtube.post_comment(&video.youtube_video_id, text).await?;
        self.db
            .log_event(
                EventKind::CommentCreated,
                &json!({ "video_id": video.id, "youtube_comment_id": comment_id }),
                origin,
            )
            .await?;

        Ok(comment_id)
    }

    #[tracing::instrument(skip(self, text, origin))]
    pub async fn reply_to_comment(
        &self,
        video_id: i64,
        parent_comment_id: &str,
        text: &str,
        origin: Option<&RequestOrigin>,
    ) -> Result<String, CompanionError> {
        self.require_authorization().await?;
        let video = self.db.video(video_id).await?;

        let comment_id = self.youtube.reply_to_comment(parent_comment_id, text).await?;
        self.db
            .log_event(
                EventKind::CommentReplyCreated,
                &json!({
                    "video_id": video.id,
                    "parent_comment_id": parent_comment_id,
                    "youtube_comment_id": comment_id
                }),
                origin,
            )
            .await?;

        Ok(comment_id)
    }

    #[tracing::instrument(skip(self, origin))]
    pub async fn delete_comment(
        &self,
        video_id: i64,
        comment_id: &str,
        origin: Option<&RequestOrigin>,
    ) -> Result<(), CompanionError> {
        self.require_authorization().await?;
        let video = self.db.video(video_id).await?;

        self.youtube.delete_comment(comment_id).await?;
        self.db
            .log_event(
                EventKind::CommentDeleted,
                &json!({ "video_id": video.id, "youtube_comment_id": comment_id }),
                origin,
            )
            .await?;

        Ok(())
    }

    pub async fn add_note(
        &self,
        video_id: i64,
        content: &str,
        origin: Option<&RequestOrigin>,
    ) -> Result<Note, CompanionError> {
        let note = self.db.create_note(video_id, content).await?;
        self.db
            .log_event(
                EventKind::NoteCreated,
                &json!({ "note_id": note.id, "video_id": video_id }),
                origin,
            )
            .await?;
        Ok(note)
    }

    pub async fn edit_note(
        &self,
        video_id: i64,
        note_id: i64,
        content: &str,
        origin: Option<&RequestOrigin>,
    ) -> Result<Note, CompanionError> {
        let note = self.db.update_note(video_id, note_id, content).await?;
        self.db
            .log_event(
                EventKind::NoteUpdated,
                &json!({ "note_id": note.id, "video_id": video_id }),
                origin,
            )
            .await?;
        Ok(note)
    }

    pub async fn delete_note(
        &self,
        video_id: i64,
        note_id: i64,
        origin: Option<&RequestOrigin>,
    ) -> Result<(), CompanionError> {
        self.db.delete_note(video_id, note_id).await?;
        self.db
            .log_event(
                EventKind::NoteDeleted,
                &json!({ "note_id": note_id, "video_id": video_id }),
                origin,
            )
            .await?;
        Ok(())
    }
}
