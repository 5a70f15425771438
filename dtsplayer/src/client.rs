//! Authenticated playback client and the factory that builds it
//!
//! The controller only sees the [`PlaybackClient`] and [`PlaybackConnector`]
//! traits, so the actor can be driven by a recording fake in tests.

use crate::api::SpotifyApi;
use crate::api::auth::OAuthApp;
use crate::credential::Credential;
use crate::error::Result;
use crate::models::{self, PlayOptions, PlayerState};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Refresh margin before the access token expires
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Playback operations on one authenticated account
#[async_trait]
pub trait PlaybackClient: Send {
    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn player_state(&mut self) -> Result<PlayerState>;

    async fn next(&mut self) -> Result<()>;

    async fn previous(&mut self) -> Result<()>;

    /// Plays a single item as the whole play context
    async fn play_item(&mut self, item_id: &str) -> Result<()>;

    /// Plays a collection, replacing the current context
    async fn play_collection(&mut self, collection_id: &str) -> Result<()>;

    /// Credential currently held by the client
    ///
    /// This may be a token the client refreshed by itself after it was built.
    async fn credential(&mut self) -> Credential;
}

/// Builds a client bound to a credential
pub trait PlaybackConnector: Send + 'static {
    type Client: PlaybackClient + 'static;

    fn connect(&self, credential: Credential) -> Self::Client;
}

/// [`PlaybackClient`] backed by the Spotify Web API
///
/// The access token is refreshed through the OAuth application whenever it
/// is about to expire, before the request goes out.
pub struct SpotifyClient {
    api: SpotifyApi,
    oauth: OAuthApp,
    credential: Credential,
}

impl SpotifyClient {
    pub fn new(api: SpotifyApi, oauth: OAuthApp, credential: Credential) -> Self {
        Self {
            api,
            oauth,
            credential,
        }
    }

    async fn ensure_fresh(&mut self) -> Result<()> {
        if !self.credential.expires_within(REFRESH_MARGIN) {
            return Ok(());
        }

        let refreshed = self.oauth.refresh(&self.credential).await?;
        info!(
            "Spotify access token refreshed, valid until {}",
            refreshed.expiry()
        );
        self.api.set_access_token(refreshed.access_token());
        self.credential = refreshed;
        Ok(())
    }
}

#[async_trait]
impl PlaybackClient for SpotifyClient {
    async fn play(&mut self) -> Result<()> {
        self.ensure_fresh().await?;
        self.api.play().await
    }

    async fn pause(&mut self) -> Result<()> {
        self.ensure_fresh().await?;
        self.api.pause().await
    }

    async fn player_state(&mut self) -> Result<PlayerState> {
        self.ensure_fresh().await?;
        self.api.player_state().await
    }

    async fn next(&mut self) -> Result<()> {
        self.ensure_fresh().await?;
        self.api.next().await
    }

    async fn previous(&mut self) -> Result<()> {
        self.ensure_fresh().await?;
        self.api.previous().await
    }

    async fn play_item(&mut self, item_id: &str) -> Result<()> {
        self.ensure_fresh().await?;
        let options = PlayOptions::items(vec![models::item_uri(item_id)]);
        self.api.play_with(&options).await
    }

    async fn play_collection(&mut self, collection_id: &str) -> Result<()> {
        self.ensure_fresh().await?;
        let options = PlayOptions::context(models::collection_uri(collection_id));
        self.api.play_with(&options).await
    }

    async fn credential(&mut self) -> Credential {
        if let Err(e) = self.ensure_fresh().await {
            warn!("Could not refresh Spotify token for snapshot: {}", e);
        }
        self.credential.clone()
    }
}

/// Builds [`SpotifyClient`]s sharing one HTTP connection pool
#[derive(Clone, Debug)]
pub struct SpotifyConnector {
    http: Client,
    api_url: String,
    oauth: OAuthApp,
}

impl SpotifyConnector {
    pub fn new(http: Client, api_url: impl Into<String>, oauth: OAuthApp) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            oauth,
        }
    }
}

impl PlaybackConnector for SpotifyConnector {
    type Client = SpotifyClient;

    fn connect(&self, credential: Credential) -> SpotifyClient {
        debug!("Binding Spotify client to token {:?}", credential);
        let api = SpotifyApi::with_http_client(
            self.http.clone(),
            self.api_url.clone(),
            credential.access_token(),
        );
        SpotifyClient::new(api, self.oauth.clone(), credential)
    }
}
