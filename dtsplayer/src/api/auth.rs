//! OAuth2 authorization-code flow against the Spotify accounts service

use super::check_status;
use crate::credential::Credential;
use crate::error::{Result, SpotifyError};
use crate::models::TokenResponse;
use reqwest::Client;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Base URL of the Spotify accounts service
pub const ACCOUNTS_BASE_URL: &str = "https://accounts.spotify.com";

/// Scopes needed to read and drive playback
pub const SCOPES: &[&str] = &[
    "user-read-currently-playing",
    "user-read-playback-state",
    "user-modify-playback-state",
];

/// Registered Spotify application
#[derive(Clone)]
pub struct OAuthApp {
    client: Client,
    client_id: String,
    client_secret: String,
    redirect_url: String,
    accounts_url: String,
}

impl OAuthApp {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::with_http_client(
            super::http_client()?,
            client_id,
            client_secret,
            redirect_url,
        ))
    }

    pub fn with_http_client(
        client: Client,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            accounts_url: ACCOUNTS_BASE_URL.to_string(),
        }
    }

    /// Overrides the accounts service location
    pub fn with_accounts_url(mut self, accounts_url: impl Into<String>) -> Self {
        self.accounts_url = accounts_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn redirect_url(&self) -> &str {
        &self.redirect_url
    }

    /// Consent page URL the user must visit to log in
    pub fn authorize_url(&self, state: &str) -> Result<String> {
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &format!("{}/authorize", self.accounts_url),
            &[
                ("client_id", self.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_url.as_str()),
                ("scope", scope.as_str()),
                ("state", state),
            ],
        )?;
        Ok(url.into())
    }

    /// Exchanges the code received on the redirect URL for a credential
    pub async fn exchange_code(&self, code: &str) -> Result<Credential> {
        info!("Exchanging authorization code for a Spotify token");
        let response = self
            .token_request(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.redirect_url.as_str()),
            ])
            .await?;

        let refresh_token = response
            .refresh_token
            .clone()
            .ok_or_else(|| SpotifyError::OAuth("token response has no refresh_token".into()))?;
        Ok(into_credential(response, refresh_token))
    }

    /// Obtains a new access token from the credential's refresh token
    ///
    /// Spotify may omit the refresh token from the answer, in which case
    /// the previous one stays valid and is carried over.
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential> {
        if credential.refresh_token().is_empty() {
            return Err(SpotifyError::OAuth("credential has no refresh token".into()));
        }

        debug!("Refreshing Spotify access token");
        let response = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credential.refresh_token()),
            ])
            .await?;

        let refresh_token = response
            .refresh_token
            .clone()
            .unwrap_or_else(|| credential.refresh_token().to_string());
        Ok(into_credential(response, refresh_token))
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self
            .client
            .post(format!("{}/api/token", self.accounts_url))
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(params)
            .send()
            .await?;

        let response = check_status(response).await.map_err(|err| match err {
            SpotifyError::Http(e) => SpotifyError::Http(e),
            other => SpotifyError::OAuth(other.to_string()),
        })?;
        Ok(response.json().await?)
    }
}

fn into_credential(response: TokenResponse, refresh_token: String) -> Credential {
    let mut credential = Credential::expiring_in(
        response.access_token,
        refresh_token,
        Duration::from_secs(response.expires_in),
    );
    if let Some(token_type) = response.token_type {
        credential = credential.with_token_type(token_type);
    }
    credential
}

impl fmt::Debug for OAuthApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthApp")
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url)
            .field("accounts_url", &self.accounts_url)
            .finish_non_exhaustive()
    }
}
