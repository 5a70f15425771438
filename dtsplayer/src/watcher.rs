//! Feeds stored credentials to the controller
//!
//! The store is polled periodically. A credential is pushed only when its
//! remaining lifetime is above the minimum TTL and it differs from the one
//! pushed last.

use crate::controller::Controller;
use crate::credential::Credential;
use crate::store::CredentialStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct CredentialWatcher {
    store: Arc<dyn CredentialStore>,
    key: String,
    controller: Controller,
    poll_period: Duration,
    min_ttl: Duration,
    last_pushed: Option<Credential>,
}

impl CredentialWatcher {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        key: impl Into<String>,
        controller: Controller,
        poll_period: Duration,
        min_ttl: Duration,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            controller,
            poll_period,
            min_ttl,
            last_pushed: None,
        }
    }

    /// Polls until `cancel` fires; the first poll happens immediately
    pub async fn run(mut self, cancel: CancellationToken) {
        let mut ticker = interval(self.poll_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.poll().await;
                }
            }
        }
        debug!("Credential watcher stopped");
    }

    /// Checks the store once; returns true when a credential was pushed
    pub async fn poll(&mut self) -> bool {
        let ttl = match self.store.ttl(&self.key).await {
            Ok(Some(ttl)) => ttl,
            Ok(None) => {
                debug!("No stored Spotify token yet");
                return false;
            }
            Err(e) => {
                warn!("Could not read token TTL: {}", e);
                return false;
            }
        };

        if ttl <= self.min_ttl {
            error!(
                ttl_secs = ttl.as_secs(),
                "Stored Spotify token is about to expire, a new login is needed"
            );
            return false;
        }

        let credential = match self.store.load(&self.key).await {
            Ok(Some(credential)) => credential,
            Ok(None) => return false,
            Err(e) => {
                warn!("Could not load stored token: {}", e);
                return false;
            }
        };

        if self.last_pushed.as_ref() == Some(&credential) {
            return false;
        }

        info!("Pushing stored Spotify token, valid until {}", credential.expiry());
        self.controller.push_credential(credential.clone()).await;
        self.last_pushed = Some(credential);
        true
    }
}
