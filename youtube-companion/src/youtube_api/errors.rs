use crate::oauth::AuthError;
use crate::youtube_api::types::GoogleErrorResponse;
use reqwest::StatusCode;

/// Why a call to the YouTube API did not produce a result.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("YouTube authorization required")]
    AuthRequired,

    #[error("YouTube authorization expired and could not be renewed: {0}")]
    RefreshFailed(String),

    #[error("YouTube API returned {status}: {message}")]
    Remote { status: StatusCode, message: String },

    #[error("YouTube API request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ApiError {
    /// Builds a [`ApiError::Remote`] from a non-2xx response body, preferring the message in
    /// Google's error envelope over the raw body.
    pub(crate) fn remote(status: StatusCode, body: &str) -> Self {
        let message = match serde_json::from_str::<GoogleErrorResponse>(body) {
            Ok(envelope) => envelope.error.message,
            Err(_) if body.trim().is_empty() => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
            Err(_) => body.trim().to_string(),
        };
        Self::Remote { status, message }
    }

    /// True when the user has to go through the authorization flow before retrying.
    pub fn requires_authorization(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::RefreshFailed(_))
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::RefreshFailed(reason) => Self::RefreshFailed(reason),
            _ => Self::AuthRequired,
        }
    }
}
