//! Periodic write-back of the controller's credential

use crate::controller::Controller;
use crate::error::Result;
use crate::store::CredentialStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct CredentialPersister {
    store: Arc<dyn CredentialStore>,
    key: String,
    controller: Controller,
    period: Duration,
}

impl CredentialPersister {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        key: impl Into<String>,
        controller: Controller,
        period: Duration,
    ) -> Self {
        Self {
            store,
            key: key.into(),
            controller,
            period,
        }
    }

    /// Persists every period until `cancel` fires
    ///
    /// Failures are logged and retried on the next period.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.persist() => {
                    if let Err(e) = result {
                        warn!("Could not persist Spotify token: {}", e);
                    }
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(self.period) => {}
            }
        }
        debug!("Credential persister stopped");
    }

    /// Stores the current credential with a TTL equal to its remaining
    /// validity; returns false when it was already expired
    pub async fn persist(&self) -> Result<bool> {
        let credential = self.controller.current_credential().await;
        let ttl = credential.remaining();
        if ttl.is_zero() {
            warn!("Current Spotify token already expired, not persisted");
            return Ok(false);
        }

        self.store.save(&self.key, &credential, ttl).await?;
        debug!(ttl_secs = ttl.as_secs(), "Spotify token persisted");
        Ok(true)
    }
}
