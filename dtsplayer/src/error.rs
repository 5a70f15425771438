//! Error handling for the Spotify client and its collaborators

use thiserror::Error;

/// Result type used across dtsplayer
pub type Result<T> = std::result::Result<T, SpotifyError>;

/// Errors raised while talking to Spotify or managing credentials
#[derive(Error, Debug)]
pub enum SpotifyError {
    /// Access token rejected (401/403)
    #[error("Authentication failed: {0}")]
    Unauthorized(String),

    /// No active playback device, or unknown resource (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limiting (429)
    #[error("Rate limit exceeded, please try again later")]
    RateLimited,

    /// Any other error status returned by the Web API
    #[error("Spotify API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Error returned by the accounts service during an OAuth grant
    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Durable credential storage failure
    #[error("Credential store error: {0}")]
    Store(String),
}

impl SpotifyError {
    /// Builds an API error from an HTTP status code and a message
    pub fn from_status_code(status: u16, message: impl Into<String>) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(message.into()),
            404 => Self::NotFound(message.into()),
            429 => Self::RateLimited,
            _ => Self::Api {
                status,
                message: message.into(),
            },
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// True for errors that a new login would fix
    pub fn is_auth_error(&self) -> bool {
        matches!(self, SpotifyError::Unauthorized(_) | SpotifyError::OAuth(_))
    }
}
