//! Core YouTube API client functionality and authentication management.

use crate::oauth::OAuthManager;
use crate::token_store::TokenStore;
use crate::youtube_api::{
    comments::{
        CommentSnapshot, CommentThreadListResponse, NewComment, NewCommentThread,
        NewCommentThreadSnippet,
    },
    errors::ApiError,
    types::InsertedResource,
    videos::{VideoListResponse, VideoSnapshot, VideoUpdate},
};
use http::Method;
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;

/// Base URL of the YouTube Data API v3.
pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// Number of comment threads fetched when the caller does not ask for a specific amount.
pub const DEFAULT_MAX_COMMENTS: u32 = 20;

/// How a request proves it may read the resource.
enum Access {
    Bearer(String),
    ApiKey(String),
}

/// Client for interacting with the YouTube Data API v3.
///
/// Authenticated calls take their bearer token from the shared [`OAuthManager`], which
/// transparently refreshes an expired access token first. Reading public video details may
/// instead fall back to a static API key when no one has authorized the application.
///
/// Every call is a single request: there are no retries, no batching and no caching.
#[derive(Debug)]
pub struct YouTubeClient<S> {
    oauth: Arc<OAuthManager<S>>,
    api_key: Option<String>,
    api_base: String,
    client: reqwest::Client,
}

impl<S> Clone for YouTubeClient<S> {
    fn clone(&self) -> Self {
        Self {
            oauth: Arc::clone(&self.oauth),
            api_key: self.api_key.clone(),
            api_base: self.api_base.clone(),
            client: self.client.clone(),
        }
    }
}

impl<S: TokenStore> YouTubeClient<S> {
    /// Creates a new YouTube API client.
    ///
    /// # Arguments
    ///
    /// * `oauth` - Shared OAuth manager that owns the stored credential
    /// * `api_key` - Optional key for unauthenticated reads of public video data
    /// * `client` - Shared HTTP client for making API requests
    pub fn new(
        oauth: Arc<OAuthManager<S>>,
        api_key: Option<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            oauth,
            api_key,
            api_base: API_BASE.to_string(),
            client,
        }
    }

    /// Sends requests to `api_base` instead of Google.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn oauth(&self) -> &Arc<OAuthManager<S>> {
        &self.oauth
    }

    /// Picks the bearer credential when there is one, otherwise the API key.
    async fn read_access(&self) -> Result<Access, ApiError> {
        if let Some(credential) = self.oauth.current_credential().await {
            return Ok(Access::Bearer(credential.access_token().to_string()));
        }
        match &self.api_key {
            Some(key) => Ok(Access::ApiKey(key.clone())),
            None => Err(ApiError::AuthRequired),
        }
    }

    /// Makes an HTTP request to the YouTube API with common error handling.
    ///
    /// # Arguments
    ///
    /// * `method` - The HTTP method to use (GET, POST, etc.)
    /// * `resource` - The API resource path below the base URL, such as `videos`
    /// * `query_params` - Query parameters
    /// * `json_body` - Optional JSON body
    /// * `access` - Bearer token or API key to present
    ///
    /// # Returns
    ///
    /// The raw [`reqwest::Response`] for method-specific JSON parsing; any non-2xx status
    /// becomes [`ApiError::Remote`].
    async fn make_request(
        &self,
        method: Method,
        resource: &str,
        query_params: &[(&str, &str)],
        json_body: Option<&impl Serialize>,
        access: Access,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}/{}", self.api_base, resource);
        let mut request = self.client.request(method.clone(), &url).query(query_params);

        request = match access {
            Access::Bearer(token) => request.bearer_auth(token),
            Access::ApiKey(key) => request.query(&[("key", key.as_str())]),
        };

        if let Some(body) = json_body {
            request = request.json(body);
        }

        let response = request.send().await?;

        let status_code = response.status();
        if !status_code.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            tracing::debug!(%method, %url, %status_code, "YouTube API request failed");
            return Err(ApiError::remote(status_code, &error_text));
        }

        Ok(response)
    }

    /// Like [`Self::make_request`], but requires the user's credential.
    #[instrument(skip(self, json_body), level = tracing::Level::TRACE)]
    async fn make_authenticated_request(
        &self,
        method: Method,
        resource: &str,
        query_params: &[(&str, &str)],
        json_body: Option<&impl Serialize>,
    ) -> Result<reqwest::Response, ApiError> {
        let credential = self.oauth.authorized_credential().await?;
        let access = Access::Bearer(credential.access_token().to_string());
        self.make_request(method, resource, query_params, json_body, access)
            .await
    }

    /// Looks up a single video by its ID.
    ///
    /// Uses the `videos.list` API. Works without authorization when an API key is
    /// configured, since the data read is public.
    ///
    /// # Returns
    ///
    /// The [`VideoSnapshot`] for the video, or [`ApiError::NotFound`] when YouTube returns no
    /// item for the ID.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/list>
    #[instrument(skip(self))]
    pub async fn video_details(&self, video_id: &str) -> Result<VideoSnapshot, ApiError> {
        let access = self.read_access().await?;
        let query_params = [("part", "snippet,statistics,contentDetails"), ("id", video_id)];

        let response = self
            .make_request(Method::GET, "videos", &query_params, None::<&()>, access)
            .await?;
        let videos: VideoListResponse = response.json().await?;

        tracing::debug!(
            video_id,
            returned_items = videos.items.len(),
            "fetched video details"
        );

        videos
            .items
            .into_iter()
            .next()
            .map(VideoSnapshot::from)
            .ok_or_else(|| ApiError::NotFound(format!("video {video_id}")))
    }

    /// [`Self::video_details`] for callers that only care whether it worked.
    ///
    /// Errors are logged and read as "absent".
    pub async fn fetch_video_details(&self, video_id: &str) -> Option<VideoSnapshot> {
        match self.video_details(video_id).await {
            Ok(video) => Some(video),
            Err(e) => {
                tracing::error!(video_id, error = %e, "YouTube API error");
                None
            }
        }
    }

    /// Changes a video's title and/or description.
    ///
    /// `videos.update` replaces the whole snippet, so this reads the current snippet,
    /// overlays the provided fields and writes all of it back. `None` or blank arguments
    /// leave the corresponding field as it is.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/videos/update>
    #[instrument(skip(self))]
    pub async fn update_video(
        &self,
        video_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<(), ApiError> {
        let response = self
            .make_authenticated_request(
                Method::GET,
                "videos",
                &[("part", "snippet"), ("id", video_id)],
                None::<&()>,
            )
            .await?;
        let videos: VideoListResponse = response.json().await?;
        let mut snippet = videos
            .items
            .into_iter()
            .next()
            .and_then(|video| video.snippet)
            .ok_or_else(|| ApiError::NotFound(format!("video {video_id}")))?;

        if let Some(title) = title.filter(|t| !t.trim().is_empty()) {
            snippet.title = title.to_string();
        }
        if let Some(description) = description.filter(|d| !d.trim().is_empty()) {
            snippet.description = description.to_string();
        }

        let update = VideoUpdate {
            id: video_id.to_string(),
            snippet,
        };
        self.make_authenticated_request(
            Method::PUT,
            "videos",
            &[("part", "snippet")],
            Some(&update),
        )
        .await?;

        tracing::debug!(video_id, "successfully updated video");
        Ok(())
    }

    /// Lists the most recent top-level comments on a video.
    ///
    /// Asks YouTube for `order=time` and returns the page sorted oldest first.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/commentThreads/list>
    #[instrument(skip(self))]
    pub async fn comments(
        &self,
        video_id: &str,
        max_results: u32,
    ) -> Result<Vec<CommentSnapshot>, ApiError> {
        let max_results_string = max_results.to_string();
        let query_params = [
            ("part", "snippet"),
            ("videoId", video_id),
            ("maxResults", max_results_string.as_str()),
            ("order", "time"),
        ];

        let response = self
            .make_authenticated_request(Method::GET, "commentThreads", &query_params, None::<&()>)
            .await?;
        let threads: CommentThreadListResponse = response.json().await?;

        let mut comments: Vec<_> = threads
            .items
            .into_iter()
            .map(CommentSnapshot::from)
            .collect();
        comments.sort_by_key(|comment| comment.published_at);

        tracing::debug!(video_id, returned_items = comments.len(), "fetched comments");
        Ok(comments)
    }

    /// [`Self::comments`] that reads any error as "no comments".
    pub async fn fetch_comments(&self, video_id: &str, max_results: u32) -> Vec<CommentSnapshot> {
        match self.comments(video_id, max_results).await {
            Ok(comments) => comments,
            Err(e) => {
                tracing::error!(video_id, error = %e, "YouTube API error");
                Vec::new()
            }
        }
    }

    /// Starts a new comment thread on a video.
    ///
    /// # Returns
    ///
    /// The ID of the created comment thread.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/commentThreads/insert>
    #[instrument(skip(self, text))]
    pub async fn post_comment(&self, video_id: &str, text: &str) -> Result<String, ApiError> {
        let thread = NewCommentThread {
            snippet: NewCommentThreadSnippet {
                video_id,
                top_level_comment: NewComment::top_level(text),
            },
        };

        let response = self
            .make_authenticated_request(
                Method::POST,
                "commentThreads",
                &[("part", "snippet")],
                Some(&thread),
            )
            .await?;
        let inserted: InsertedResource = response.json().await?;

        tracing::debug!(video_id, comment_id = %inserted.id, "posted comment");
        Ok(inserted.id)
    }

    /// Replies to an existing top-level comment.
    ///
    /// # Returns
    ///
    /// The ID of the created reply.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/comments/insert>
    #[instrument(skip(self, text))]
    pub async fn reply_to_comment(
        &self,
        parent_comment_id: &str,
        text: &str,
    ) -> Result<String, ApiError> {
        let reply = NewComment::reply(parent_comment_id, text);

        let response = self
            .make_authenticated_request(
                Method::POST,
                "comments",
                &[("part", "snippet")],
                Some(&reply),
            )
            .await?;
        let inserted: InsertedResource = response.json().await?;

        tracing::debug!(parent_comment_id, comment_id = %inserted.id, "posted reply");
        Ok(inserted.id)
    }

    /// Deletes a comment.
    ///
    /// # API Reference
    ///
    /// <https://developers.google.com/youtube/v3/docs/comments/delete>
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, comment_id: &str) -> Result<(), ApiError> {
        self.make_authenticated_request(
            Method::DELETE,
            "comments",
            &[("id", comment_id)],
            None::<&()>,
        )
        .await?;

        tracing::debug!(comment_id, "deleted comment");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::{Credential, MemoryTokenStore};
    use jiff::Timestamp;
    use mockito::{Matcher, ServerGuard};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn client_with(
        server: &ServerGuard,
        store: MemoryTokenStore,
        api_key: Option<&str>,
    ) -> YouTubeClient<MemoryTokenStore> {
        let oauth = OAuthManager::new("client-id", "client-secret", store)
            .with_endpoints(
                &format!("{}/auth", server.url()),
                &format!("{}/token", server.url()),
            )
            .unwrap();
        YouTubeClient::new(
            Arc::new(oauth),
            api_key.map(str::to_string),
            reqwest::Client::new(),
        )
        .with_api_base(server.url())
    }

    fn authorized_client(server: &ServerGuard) -> YouTubeClient<MemoryTokenStore> {
        let credential = Credential::new("AT1", "RT1", Timestamp::MAX);
        client_with(server, MemoryTokenStore::with_credential(credential), None)
    }

    fn video_fixture() -> serde_json::Value {
        json!({
            "kind": "youtube#videoListResponse",
            "items": [{
                "id": "abc123XYZ89",
                "snippet": {
                    "title": "Old Title",
                    "description": "old desc",
                    "publishedAt": "2024-03-01T12:00:00Z",
                    "categoryId": "22",
                    "tags": ["rust", "oauth"],
                    "thumbnails": {
                        "default": { "url": "https://i.ytimg.com/vi/abc123XYZ89/default.jpg" },
                        "high": { "url": "https://i.ytimg.com/vi/abc123XYZ89/hqdefault.jpg" }
                    }
                },
                "statistics": { "viewCount": "42", "likeCount": "7", "commentCount": "3" }
            }],
            "pageInfo": { "totalResults": 1, "resultsPerPage": 1 }
        })
    }

    fn thread(id: &str, published_at: &str) -> serde_json::Value {
        json!({
            "id": format!("thread-{id}"),
            "snippet": {
                "videoId": "abc123XYZ89",
                "totalReplyCount": 1,
                "topLevelComment": {
                    "id": id,
                    "snippet": {
                        "authorDisplayName": format!("author {id}"),
                        "textDisplay": format!("comment {id}"),
                        "publishedAt": published_at,
                        "likeCount": 2
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn video_details_with_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("part".into(), "snippet,statistics,contentDetails".into()),
                Matcher::UrlEncoded("id".into(), "abc123XYZ89".into()),
            ]))
            .match_header("authorization", "Bearer AT1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(video_fixture().to_string())
            .expect(1)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        let video = yt.fetch_video_details("abc123XYZ89").await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            video,
            VideoSnapshot {
                youtube_video_id: "abc123XYZ89".to_string(),
                title: "Old Title".to_string(),
                description: "old desc".to_string(),
                thumbnail_url: Some(
                    "https://i.ytimg.com/vi/abc123XYZ89/hqdefault.jpg".to_string()
                ),
                published_at: Some("2024-03-01T12:00:00Z".parse().unwrap()),
                view_count: 42,
                like_count: 7,
                comment_count: 3,
            }
        );
    }

    #[tokio::test]
    async fn video_details_without_authorization_uses_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "abc123XYZ89".into()),
                Matcher::UrlEncoded("key".into(), "public-key".into()),
            ]))
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(video_fixture().to_string())
            .expect(1)
            .create_async()
            .await;
        let yt = client_with(&server, MemoryTokenStore::new(), Some("public-key"));

        let video = yt.video_details("abc123XYZ89").await.unwrap();

        mock.assert_async().await;
        assert_eq!(video.title, "Old Title");
    }

    #[tokio::test]
    async fn video_details_without_any_access_requires_authorization() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let yt = client_with(&server, MemoryTokenStore::new(), None);

        assert!(matches!(
            yt.video_details("abc123XYZ89").await,
            Err(ApiError::AuthRequired)
        ));
        assert_eq!(yt.fetch_video_details("abc123XYZ89").await, None);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn video_details_api_error_reads_as_absent() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":{"code":403,"message":"quotaExceeded"}}"#)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        assert_eq!(yt.fetch_video_details("abc123XYZ89").await, None);
        match yt.video_details("abc123XYZ89").await {
            Err(ApiError::Remote { status, message }) => {
                assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
                assert_eq!(message, "quotaExceeded");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_video_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "kind": "youtube#videoListResponse", "items": [] }).to_string())
            .create_async()
            .await;
        let yt = authorized_client(&server);

        assert!(matches!(
            yt.video_details("doesNotExist").await,
            Err(ApiError::NotFound(_))
        ));
        assert_eq!(yt.fetch_video_details("doesNotExist").await, None);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_before_the_call() {
        let mut server = mockito::Server::new_async().await;
        let refresh = server
            .mock("POST", "/token")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"AT2","expires_in":3600,"token_type":"Bearer"}"#)
            .expect(1)
            .create_async()
            .await;
        let videos = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .match_header("authorization", "Bearer AT2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(video_fixture().to_string())
            .expect(1)
            .create_async()
            .await;
        let expired = Credential::new("AT1", "RT1", Timestamp::UNIX_EPOCH);
        let yt = client_with(&server, MemoryTokenStore::with_credential(expired), None);

        assert!(yt.fetch_video_details("abc123XYZ89").await.is_some());
        refresh.assert_async().await;
        videos.assert_async().await;
    }

    #[tokio::test]
    async fn update_video_preserves_unchanged_snippet_fields() {
        let mut server = mockito::Server::new_async().await;
        let read = server
            .mock("GET", "/videos")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("part".into(), "snippet".into()),
                Matcher::UrlEncoded("id".into(), "abc123XYZ89".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(video_fixture().to_string())
            .expect(1)
            .create_async()
            .await;
        let write = server
            .mock("PUT", "/videos")
            .match_query(Matcher::UrlEncoded("part".into(), "snippet".into()))
            .match_header("authorization", "Bearer AT1")
            .match_body(Matcher::PartialJson(json!({
                "id": "abc123XYZ89",
                "snippet": {
                    "title": "New Title",
                    "description": "old desc",
                    "categoryId": "22",
                    "tags": ["rust", "oauth"]
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"abc123XYZ89"}"#)
            .expect(1)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        yt.update_video("abc123XYZ89", Some("New Title"), None)
            .await
            .unwrap();

        read.assert_async().await;
        write.assert_async().await;
    }

    #[tokio::test]
    async fn update_video_ignores_blank_fields() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(video_fixture().to_string())
            .create_async()
            .await;
        let write = server
            .mock("PUT", "/videos")
            .match_query(Matcher::Any)
            .match_body(Matcher::PartialJson(json!({
                "snippet": { "title": "Old Title", "description": "new desc" }
            })))
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        yt.update_video("abc123XYZ89", Some("   "), Some("new desc"))
            .await
            .unwrap();
        write.assert_async().await;
    }

    #[tokio::test]
    async fn update_of_missing_video_writes_nothing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items":[]}"#)
            .create_async()
            .await;
        let write = server
            .mock("PUT", "/videos")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        let result = yt.update_video("abc123XYZ89", Some("New Title"), None).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
        assert_eq!(result.unwrap_err().to_string(), "video abc123XYZ89 not found");
        write.assert_async().await;
    }

    #[tokio::test]
    async fn comments_come_back_oldest_first() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("part".into(), "snippet".into()),
                Matcher::UrlEncoded("videoId".into(), "abc123XYZ89".into()),
                Matcher::UrlEncoded("maxResults".into(), "20".into()),
                Matcher::UrlEncoded("order".into(), "time".into()),
            ]))
            .match_header("authorization", "Bearer AT1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "items": [
                        thread("c3", "2024-03-03T00:00:00Z"),
                        thread("c1", "2024-03-01T00:00:00Z"),
                        thread("c2", "2024-03-02T00:00:00Z"),
                    ]
                })
                .to_string(),
            )
            .expect(1)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        let comments = yt
            .fetch_comments("abc123XYZ89", DEFAULT_MAX_COMMENTS)
            .await;

        mock.assert_async().await;
        let ids: Vec<_> = comments.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2", "c3"]);
        assert!(comments.windows(2).all(|w| w[0].published_at <= w[1].published_at));
        assert_eq!(
            comments[0],
            CommentSnapshot {
                id: "c1".to_string(),
                author: "author c1".to_string(),
                text: "comment c1".to_string(),
                published_at: "2024-03-01T00:00:00Z".parse().unwrap(),
                like_count: 2,
                reply_count: 1,
            }
        );
    }

    #[tokio::test]
    async fn comment_errors_read_as_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/commentThreads")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"commentsDisabled"}}"#)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        assert!(yt.fetch_comments("abc123XYZ89", 20).await.is_empty());

        let unauthorized = client_with(&server, MemoryTokenStore::new(), Some("public-key"));
        assert!(unauthorized.fetch_comments("abc123XYZ89", 20).await.is_empty());
        assert!(matches!(
            unauthorized.comments("abc123XYZ89", 20).await,
            Err(ApiError::AuthRequired)
        ));
    }

    #[tokio::test]
    async fn post_comment_creates_thread() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/commentThreads")
            .match_query(Matcher::UrlEncoded("part".into(), "snippet".into()))
            .match_header("authorization", "Bearer AT1")
            .match_body(Matcher::Json(json!({
                "snippet": {
                    "videoId": "abc123XYZ89",
                    "topLevelComment": { "snippet": { "textOriginal": "Great video" } }
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"kind":"youtube#commentThread","id":"UgxNEW"}"#)
            .expect(1)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        let id = yt.post_comment("abc123XYZ89", "Great video").await.unwrap();

        mock.assert_async().await;
        assert_eq!(id, "UgxNEW");
    }

    #[tokio::test]
    async fn reply_names_parent_comment() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/comments")
            .match_query(Matcher::UrlEncoded("part".into(), "snippet".into()))
            .match_body(Matcher::Json(json!({
                "snippet": { "parentId": "UgxPARENT", "textOriginal": "Thanks!" }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"kind":"youtube#comment","id":"UgxPARENT.reply1"}"#)
            .expect(1)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        let id = yt.reply_to_comment("UgxPARENT", "Thanks!").await.unwrap();

        mock.assert_async().await;
        assert_eq!(id, "UgxPARENT.reply1");
    }

    #[tokio::test]
    async fn delete_comment_reports_remote_failure() {
        let mut server = mockito::Server::new_async().await;
        let ok = server
            .mock("DELETE", "/comments")
            .match_query(Matcher::UrlEncoded("id".into(), "UgxMINE".into()))
            .with_status(204)
            .expect(1)
            .create_async()
            .await;
        let _mock = server
            .mock("DELETE", "/comments")
            .match_query(Matcher::UrlEncoded("id".into(), "UgxTHEIRS".into()))
            .with_status(403)
            .with_body(r#"{"error":{"code":403,"message":"forbidden"}}"#)
            .create_async()
            .await;
        let yt = authorized_client(&server);

        yt.delete_comment("UgxMINE").await.unwrap();
        ok.assert_async().await;

        let e = yt.delete_comment("UgxTHEIRS").await.unwrap_err();
        assert_eq!(e.to_string(), "YouTube API returned 403 Forbidden: forbidden");
        assert!(!e.requires_authorization());
    }

    #[tokio::test]
    async fn mutations_without_credential_never_reach_youtube() {
        let mut server = mockito::Server::new_async().await;
        let mut mocks = Vec::new();
        for method in ["GET", "POST", "PUT", "DELETE"] {
            let mock = server
                .mock(method, Matcher::Any)
                .match_query(Matcher::Any)
                .expect(0)
                .create_async()
                .await;
            mocks.push(mock);
        }
        let yt = client_with(&server, MemoryTokenStore::new(), Some("public-key"));

        let results = [
            yt.post_comment("abc123XYZ89", "hi").await.map(|_| ()),
            yt.reply_to_comment("UgxPARENT", "hi").await.map(|_| ()),
            yt.delete_comment("UgxMINE").await,
            yt.update_video("abc123XYZ89", Some("t"), None).await,
        ];
        for result in results {
            assert!(matches!(result, Err(ApiError::AuthRequired)));
        }
        for mock in mocks {
            mock.assert_async().await;
        }
    }
}
