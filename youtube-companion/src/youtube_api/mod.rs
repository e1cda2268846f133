//! YouTube Data API v3 client library.
//!
//! Covers the slice of the API the companion needs: reading and editing video metadata, and
//! listing, posting, replying to and deleting comments.
//!
//! Reads of public video data work with either the user's OAuth credential or a static API
//! key. Everything else requires the user to have authorized the application; see
//! [`crate::oauth::OAuthManager`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use youtube_companion::oauth::OAuthManager;
//! use youtube_companion::token_store::FileTokenStore;
//! use youtube_companion::youtube_api::{YouTubeClient, DEFAULT_MAX_COMMENTS};
//!
//! # async fn example() -> eyre::Result<()> {
//! let store = FileTokenStore::new("tmp/tokens.json");
//! let oauth = Arc::new(OAuthManager::new("client-id", "client-secret", store));
//! let client = YouTubeClient::new(oauth, None, reqwest::Client::new());
//!
//! if let Some(video) = client.fetch_video_details("dQw4w9WgXcQ").await {
//!     println!("{} has {} views", video.title, video.view_count);
//! }
//! for comment in client.fetch_comments("dQw4w9WgXcQ", DEFAULT_MAX_COMMENTS).await {
//!     println!("{}: {}", comment.author, comment.text);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod comments;
pub mod errors;
pub mod types;
pub mod videos;

pub use client::{API_BASE, DEFAULT_MAX_COMMENTS, YouTubeClient};
pub use comments::CommentSnapshot;
pub use errors::ApiError;
pub use types::PageInfo;
pub use videos::{Video, VideoSnapshot, VideoStatistics};
