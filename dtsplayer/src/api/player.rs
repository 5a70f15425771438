//! Player endpoints (`/me/player`)

use super::SpotifyApi;
use crate::error::Result;
use crate::models::{PlayOptions, PlayerState};
use reqwest::{Method, StatusCode};

impl SpotifyApi {
    /// Resumes playback on the active device
    pub async fn play(&self) -> Result<()> {
        self.request::<()>(Method::PUT, "/me/player/play", None)
            .await
            .map(drop)
    }

    /// Starts playback with an explicit context or list of items
    pub async fn play_with(&self, options: &PlayOptions) -> Result<()> {
        self.request(Method::PUT, "/me/player/play", Some(options))
            .await
            .map(drop)
    }

    pub async fn pause(&self) -> Result<()> {
        self.request::<()>(Method::PUT, "/me/player/pause", None)
            .await
            .map(drop)
    }

    /// Skips to the next item in the queue
    pub async fn next(&self) -> Result<()> {
        self.request::<()>(Method::POST, "/me/player/next", None)
            .await
            .map(drop)
    }

    /// Skips to the previous item
    pub async fn previous(&self) -> Result<()> {
        self.request::<()>(Method::POST, "/me/player/previous", None)
            .await
            .map(drop)
    }

    /// Reads the current playback state
    ///
    /// A 204 (no active device) is reported as a default, non-playing state.
    pub async fn player_state(&self) -> Result<PlayerState> {
        let response = self
            .request::<()>(Method::GET, "/me/player", None)
            .await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(PlayerState::default());
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(PlayerState::default());
        }
        Ok(serde_json::from_str(&text)?)
    }
}
