//! YouTube Videos API types and functionality.

use crate::youtube_api::types::PageInfo;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response structure for the `videos.list` API call.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos/list>
#[derive(Debug, Deserialize)]
pub struct VideoListResponse {
    /// A list of videos that match the request criteria.
    ///
    /// Empty when no video has the requested ID.
    #[serde(default)]
    pub items: Vec<Video>,
    #[serde(rename = "pageInfo")]
    pub page_info: Option<PageInfo>,
}

/// A `video` resource represents a YouTube video.
///
/// Which of the optional parts are present depends on the `part` parameter of the request.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#resource>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Video {
    /// The ID that YouTube uses to uniquely identify the video.
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<VideoSnippet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<VideoStatistics>,
}

/// Basic details about a video.
///
/// `videos.update` replaces the snippet wholesale, so fields this type does not model are
/// carried in `other` and written back untouched.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#snippet>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSnippet {
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Required by `videos.update` whenever the snippet is written.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnails: Option<Thumbnails>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Thumbnail images keyed by size.
///
/// See: <https://developers.google.com/youtube/v3/docs/thumbnails>
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Thumbnail>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high: Option<Thumbnail>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Statistics about the video.
///
/// YouTube reports counts as decimal strings.
///
/// See: <https://developers.google.com/youtube/v3/docs/videos#statistics>
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoStatistics {
    /// The number of times the video has been viewed.
    pub view_count: Option<String>,
    /// The number of users who have indicated that they liked the video.
    pub like_count: Option<String>,
    /// The number of comments for the video.
    pub comment_count: Option<String>,
}

/// Request body for `videos.update` with `part=snippet`.
#[derive(Debug, Serialize)]
pub(crate) struct VideoUpdate {
    pub id: String,
    pub snippet: VideoSnippet,
}

/// What the application keeps locally about a video at the time it was fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSnapshot {
    pub youtube_video_id: String,
    pub title: String,
    pub description: String,
    pub thumbnail_url: Option<String>,
    pub published_at: Option<Timestamp>,
    pub view_count: u64,
    pub like_count: u64,
    pub comment_count: u64,
}

fn count(raw: Option<&String>) -> u64 {
    raw.and_then(|c| c.parse().ok()).unwrap_or(0)
}

impl From<Video> for VideoSnapshot {
    fn from(video: Video) -> Self {
        let statistics = video.statistics.as_ref();
        let view_count = count(statistics.and_then(|s| s.view_count.as_ref()));
        let like_count = count(statistics.and_then(|s| s.like_count.as_ref()));
        let comment_count = count(statistics.and_then(|s| s.comment_count.as_ref()));

        let (title, description, thumbnail_url, published_at) = match video.snippet {
            Some(snippet) => {
                let thumbnail_url = snippet.thumbnails.and_then(|t| {
                    t.high.or(t.default).map(|thumbnail| thumbnail.url)
                });
                (
                    snippet.title,
                    snippet.description,
                    thumbnail_url,
                    snippet.published_at,
                )
            }
            None => (String::new(), String::new(), None, None),
        };

        Self {
            youtube_video_id: video.id,
            title,
            description,
            thumbnail_url,
            published_at,
            view_count,
            like_count,
            comment_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn snapshot_prefers_high_thumbnail_and_parses_counts() {
        let video: Video = serde_json::from_value(json!({
            "id": "dQw4w9WgXcQ",
            "snippet": {
                "title": "Never Gonna Give You Up",
                "description": "The official video",
                "publishedAt": "2009-10-25T06:57:33Z",
                "categoryId": "10",
                "thumbnails": {
                    "default": { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/default.jpg" },
                    "high": { "url": "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg" }
                }
            },
            "statistics": { "viewCount": "1500000000", "likeCount": "17000000" }
        }))
        .unwrap();

        assert_eq!(
            VideoSnapshot::from(video),
            VideoSnapshot {
                youtube_video_id: "dQw4w9WgXcQ".to_string(),
                title: "Never Gonna Give You Up".to_string(),
                description: "The official video".to_string(),
                thumbnail_url: Some("https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string()),
                published_at: Some("2009-10-25T06:57:33Z".parse().unwrap()),
                view_count: 1_500_000_000,
                like_count: 17_000_000,
                comment_count: 0,
            }
        );
    }

    #[test]
    fn snapshot_falls_back_to_default_thumbnail() {
        let video: Video = serde_json::from_value(json!({
            "id": "abc123XYZ89",
            "snippet": {
                "title": "t",
                "thumbnails": { "default": { "url": "https://example/default.jpg" } }
            }
        }))
        .unwrap();

        let snapshot = VideoSnapshot::from(video);
        assert_eq!(snapshot.thumbnail_url.as_deref(), Some("https://example/default.jpg"));
        assert_eq!(snapshot.description, "");
    }

    #[test]
    fn snippet_keeps_unmodelled_fields_on_write() {
        let snippet: VideoSnippet = serde_json::from_value(json!({
            "title": "t",
            "description": "d",
            "categoryId": "22",
            "tags": ["a", "b"],
            "defaultLanguage": "en"
        }))
        .unwrap();

        let written = serde_json::to_value(&snippet).unwrap();
        assert_eq!(written["tags"], json!(["a", "b"]));
        assert_eq!(written["defaultLanguage"], "en");
        assert_eq!(written["categoryId"], "22");
    }
}
