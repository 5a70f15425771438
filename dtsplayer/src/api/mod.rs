//! Low-level access to the Spotify Web API
//!
//! This module only knows how to send authenticated requests and turn
//! error responses into [`SpotifyError`] values. Token lifetime is handled
//! one level up by [`crate::client::SpotifyClient`].

pub mod auth;
pub mod player;

use crate::error::{Result, SpotifyError};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Base URL of the Spotify Web API
pub const API_BASE_URL: &str = "https://api.spotify.com/v1";

/// Builds the HTTP client shared by the API and OAuth layers
pub fn http_client() -> Result<Client> {
    Ok(Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(concat!("dtspotify/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Spotify Web API client bound to one access token
pub struct SpotifyApi {
    client: Client,
    base_url: String,
    access_token: String,
}

impl SpotifyApi {
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        Ok(Self::with_http_client(
            http_client()?,
            API_BASE_URL,
            access_token,
        ))
    }

    /// Builds a client on top of an existing `reqwest::Client`
    pub fn with_http_client(
        client: Client,
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Sends a request and fails on any non-2xx status
    pub(crate) async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.access_token);

        request = match body {
            Some(body) => request.json(body),
            // Spotify répond 411 sur un PUT/POST sans Content-Length
            None => request.header(CONTENT_LENGTH, 0),
        };

        let response = request.send().await?;
        check_status(response).await
    }
}

/// Turns an error response into a typed error
///
/// Both error layouts are understood: the Web API's
/// `{"error": {"status": 404, "message": "..."}}` and the accounts
/// service's `{"error": "invalid_grant", "error_description": "..."}`.
pub(crate) async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = error_message(&text).unwrap_or(text);
    warn!("Spotify error ({}): {}", status.as_u16(), message);
    Err(SpotifyError::from_status_code(status.as_u16(), message))
}

fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    match json.get("error")? {
        Value::Object(obj) => obj
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string),
        Value::String(code) => {
            let description = json
                .get("error_description")
                .and_then(|d| d.as_str())
                .unwrap_or_default();
            if description.is_empty() {
                Some(code.clone())
            } else {
                Some(format!("{}: {}", code, description))
            }
        }
        _ => None,
    }
}
