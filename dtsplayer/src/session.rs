//! OAuth login session
//!
//! One session is created per process. Its random state id is embedded in
//! the login URL and checked again on the redirect.

use crate::api::auth::OAuthApp;
use crate::controller::Controller;
use crate::credential::Credential;
use crate::error::{Result, SpotifyError};
use crate::store::CredentialStore;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

pub struct LoginSession {
    oauth: OAuthApp,
    store: Arc<dyn CredentialStore>,
    key: String,
    state: String,
    login_url: String,
    controller: Option<Controller>,
    logins: watch::Sender<u64>,
}

impl LoginSession {
    pub fn new(
        oauth: OAuthApp,
        store: Arc<dyn CredentialStore>,
        key: impl Into<String>,
    ) -> Result<Self> {
        let state = Uuid::new_v4().to_string();
        let login_url = oauth.authorize_url(&state)?;
        let (logins, _) = watch::channel(0);

        Ok(Self {
            oauth,
            store,
            key: key.into(),
            state,
            login_url,
            controller: None,
            logins,
        })
    }

    /// Pushes every credential obtained by a login to `controller`
    pub fn with_controller(mut self, controller: Controller) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    /// URL the user must open to grant access
    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Counter bumped after each successful login
    pub fn logins(&self) -> watch::Receiver<u64> {
        self.logins.subscribe()
    }

    /// Finishes a login from the redirect's `state` and `code` parameters
    pub async fn complete(&self, state: &str, code: &str) -> Result<Credential> {
        if state != self.state {
            warn!("Login redirect with unexpected state");
            return Err(SpotifyError::OAuth("state mismatch".into()));
        }
        if code.is_empty() {
            return Err(SpotifyError::OAuth("missing authorization code".into()));
        }

        let credential = self.oauth.exchange_code(code).await?;
        self.store
            .save(&self.key, &credential, credential.remaining())
            .await?;
        info!("Login complete, token valid until {}", credential.expiry());

        if let Some(controller) = &self.controller {
            controller.push_credential(credential.clone()).await;
        }
        self.logins.send_modify(|count| *count += 1);

        Ok(credential)
    }
}
