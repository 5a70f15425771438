//! Stockage durable des jetons Spotify
//!
//! Les jetons sont conservés avec une durée de vie (TTL) : une entrée
//! expirée est considérée comme absente. [`FileCredentialStore`] écrit un
//! fichier JSON par clé dans un répertoire dédié.

use crate::credential::Credential;
use crate::error::{Result, SpotifyError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info};
use uuid::Uuid;

/// Key/value storage of credentials with expiry
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Loads the credential stored under `key`, `None` when absent or expired
    async fn load(&self, key: &str) -> Result<Option<Credential>>;

    /// Time left before the entry expires, `None` when absent
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    async fn save(&self, key: &str, credential: &Credential, ttl: Duration) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    credential: Credential,
    stored_until: DateTime<Utc>,
}

impl StoredCredential {
    fn ttl_at(&self, now: DateTime<Utc>) -> Duration {
        (self.stored_until - now).to_std().unwrap_or(Duration::ZERO)
    }
}

/// Store writing one JSON file per key
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    directory: PathBuf,
}

impl FileCredentialStore {
    /// Crée le store, et son répertoire s'il n'existe pas
    pub async fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        if !fs::try_exists(&directory).await? {
            fs::create_dir_all(&directory).await?;
            info!("Created token directory: {}", directory.display());
        }
        Ok(Self { directory })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Format: `{directory}/{key}.json`
    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() || key.contains(['/', '\\']) || key.contains("..") {
            return Err(SpotifyError::store(format!("invalid key: {:?}", key)));
        }
        Ok(self.directory.join(format!("{}.json", key)))
    }

    /// Lit une entrée valide, supprime les entrées expirées
    async fn read_entry(&self, key: &str) -> Result<Option<StoredCredential>> {
        let path = self.entry_path(key)?;

        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No stored token at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let entry: StoredCredential = serde_json::from_str(&json)?;
        if entry.ttl_at(Utc::now()).is_zero() {
            debug!("Stored token expired: {}", path.display());
            self.remove(key).await?;
            return Ok(None);
        }

        Ok(Some(entry))
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self, key: &str) -> Result<Option<Credential>> {
        Ok(self.read_entry(key).await?.map(|entry| entry.credential))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        Ok(self
            .read_entry(key)
            .await?
            .map(|entry| entry.ttl_at(Utc::now())))
    }

    async fn save(&self, key: &str, credential: &Credential, ttl: Duration) -> Result<()> {
        let path = self.entry_path(key)?;
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SpotifyError::store(format!("invalid ttl: {}", e)))?;

        let entry = StoredCredential {
            credential: credential.clone(),
            stored_until: Utc::now() + ttl,
        };
        let json = serde_json::to_string_pretty(&entry)?;

        // Écriture atomique : un fichier temporaire par écriture, puis renommage
        let tmp = path.with_extension(format!("json.{}.tmp", Uuid::new_v4().simple()));
        fs::write(&tmp, json).await?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(
            "Saved token to {} (ttl {}s)",
            path.display(),
            ttl.num_seconds()
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
