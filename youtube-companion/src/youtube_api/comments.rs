//! YouTube comment threads and comments.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Response structure for the `commentThreads.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/commentThreads/list>
#[derive(Debug, Deserialize)]
pub struct CommentThreadListResponse {
    #[serde(default)]
    pub items: Vec<CommentThread>,
    #[serde(rename = "pageInfo")]
    pub page_info: Option<PageInfo>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

/// A top-level comment and, implicitly, its replies.
///
/// See: <https://developers.google.com/youtube/v3/docs/commentThreads#resource>
#[derive(Debug, Deserialize)]
pub struct CommentThread {
    pub id: String,
    pub snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThreadSnippet {
    pub video_id: Option<String>,
    pub top_level_comment: Comment,
    #[serde(default)]
    pub total_reply_count: u64,
}

/// See: <https://developers.google.com/youtube/v3/docs/comments#resource>
#[derive(Debug, Deserialize)]
pub struct Comment {
    pub id: String,
    pub snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSnippet {
    #[serde(default)]
    pub author_display_name: String,
    /// The comment as YouTube renders it, which may contain HTML.
    #[serde(default)]
    pub text_display: String,
    pub parent_id: Option<String>,
    pub published_at: Timestamp,
    #[serde(default)]
    pub like_count: u64,
}

/// Request body for `commentThreads.insert`.
#[derive(Debug, Serialize)]
pub(crate) struct NewCommentThread<'a> {
    pub snippet: NewCommentThreadSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewCommentThreadSnippet<'a> {
    pub video_id: &'a str,
    pub top_level_comment: NewComment<'a>,
}

/// Request body for `comments.insert`, and the top-level comment of a new thread.
#[derive(Debug, Serialize)]
pub(crate) struct NewComment<'a> {
    pub snippet: NewCommentSnippet<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewCommentSnippet<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<&'a str>,
    pub text_original: &'a str,
}

impl<'a> NewComment<'a> {
    pub(crate) fn top_level(text: &'a str) -> Self {
        Self {
            snippet: NewCommentSnippet {
                parent_id: None,
                text_original: text,
            },
        }
    }

    pub(crate) fn reply(parent_id: &'a str, text: &'a str) -> Self {
        Self {
            snippet: NewCommentSnippet {
                parent_id: Some(parent_id),
                text_original: text,
            },
        }
    }
}

/// A top-level comment as shown next to a video.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSnapshot {
    /// ID of the top-level comment, usable as a reply parent or for deletion.
    pub id: String,
    pub author: String,
    pub text: String,
    pub published_at: Timestamp,
    pub like_count: u64,
    pub reply_count: u64,
}

impl From<CommentThread> for CommentSnapshot {
    fn from(thread: CommentThread) -> Self {
        let comment = thread.snippet.top_level_comment;
        Self {
            id: comment.id,
            author: comment.snippet.author_display_name,
            text: comment.snippet.text_display,
            published_at: comment.snippet.published_at,
            like_count: comment.snippet.like_count,
            reply_count: thread.snippet.total_reply_count,
        }
    }
}
