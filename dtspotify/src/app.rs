//! Process wiring for the relay service and the init companion

use crate::events::EventRelay;
use crate::notify::post_login_url;
use crate::routes::{self, WEBHOOK_PATH, WebhookState};
use anyhow::{Context, Result, anyhow};
use dtsconfig::Config;
use dtsplayer::{
    Controller, CredentialPersister, CredentialStore, CredentialWatcher, FileCredentialStore,
    LoginSession, OAuthApp, SpotifyConnector,
};
use dtsserver::{HealthExt, HealthRegistry, LogState, Server, ServerBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub const READINESS_CHECK: &str = "spotify client ready";

/// Everything the service reads from the configuration
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub client_id: String,
    pub client_secret: String,
    pub base_url: String,
    pub login_path: String,
    pub redirect_url: String,
    pub slack_url: String,
    pub api_url: String,
    pub accounts_url: String,
    pub http_port: u16,
    pub health_port: u16,
    pub token_dir: String,
    pub token_key: String,
    pub ready_timeout: Duration,
    pub persist_period: Duration,
    pub poll_period: Duration,
    pub min_token_ttl: Duration,
    pub init_min_token_ttl: Duration,
}

impl AppSettings {
    /// Reads the settings; a missing client id, secret, base URL or
    /// messaging URL is an error
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            client_id: config.get_spotify_client_id()?,
            client_secret: config.get_spotify_client_secret()?,
            base_url: config.get_base_url()?,
            login_path: config.get_spotify_login_path(),
            redirect_url: config.get_spotify_redirect_url()?,
            slack_url: config.get_slack_url()?,
            api_url: config.get_spotify_api_url(),
            accounts_url: config.get_spotify_accounts_url(),
            http_port: config.get_http_port(),
            health_port: config.get_health_port(),
            token_dir: config
                .get_token_store_dir()
                .context("Cannot prepare token directory")?,
            token_key: config.get_token_key(),
            ready_timeout: config.get_ready_timeout(),
            persist_period: config.get_persist_period(),
            poll_period: config.get_poll_period(),
            min_token_ttl: config.get_min_token_ttl(),
            init_min_token_ttl: config.get_init_min_token_ttl(),
        })
    }

    fn oauth(&self, http: reqwest::Client) -> OAuthApp {
        OAuthApp::with_http_client(
            http,
            self.client_id.as_str(),
            self.client_secret.as_str(),
            self.redirect_url.as_str(),
        )
        .with_accounts_url(self.accounts_url.as_str())
    }

    async fn store(&self) -> Result<Arc<dyn CredentialStore>> {
        let store = FileCredentialStore::new(&self.token_dir)
            .await
            .with_context(|| format!("Cannot open token store {}", self.token_dir))?;
        Ok(Arc::new(store))
    }

    fn server(&self, shutdown: &CancellationToken) -> Server {
        ServerBuilder::new("dtspotify", self.base_url.as_str(), self.http_port)
            .shutdown(shutdown.clone())
            .build()
    }
}

/// True when the store holds no credential, or one that expires soon
async fn needs_login(store: &dyn CredentialStore, key: &str, min_ttl: Duration) -> bool {
    match store.ttl(key).await {
        Ok(Some(ttl)) => ttl <= min_ttl,
        Ok(None) => true,
        Err(e) => {
            warn!("Cannot read stored token: {}", e);
            true
        }
    }
}

async fn notify_login(http: &reqwest::Client, settings: &AppSettings, session: &LoginSession) {
    info!("Login required: {}", session.login_url());
    if let Err(e) = post_login_url(http, &settings.slack_url, session.login_url()).await {
        warn!("Could not post login URL: {:#}", e);
    }
}

/// Runs the relay service until Ctrl+C or a fatal error
pub async fn run(settings: AppSettings, log_state: LogState) -> Result<()> {
    let cancel = CancellationToken::new();
    let http = dtsplayer::api::http_client()?;
    let oauth = settings.oauth(http.clone());
    let store = settings.store().await?;

    // ========== Contrôleur Spotify ==========
    let connector = SpotifyConnector::new(http.clone(), settings.api_url.as_str(), oauth.clone());
    let (controller, controller_task) = Controller::spawn(connector, cancel.clone());

    let session = Arc::new(
        LoginSession::new(oauth, store.clone(), settings.token_key.as_str())?
            .with_controller(controller.clone()),
    );

    // ========== Santé ==========
    let health = HealthRegistry::new();
    {
        let ready = controller.readiness();
        health.add_readiness_check(READINESS_CHECK, move || {
            if ready.is_ready() {
                Ok(())
            } else {
                Err("spotify client not initialized".to_string())
            }
        });
    }
    let mut health_server = ServerBuilder::new(
        "dtspotify-health",
        settings.base_url.as_str(),
        settings.health_port,
    )
    .shutdown(cancel.clone())
    .build();
    health_server.init_health(&health).await;
    health_server.init_log_setup(log_state).await;

    // ========== Webhook et login ==========
    let (events_tx, events_rx) = mpsc::channel(32);
    let mut server = settings.server(&cancel);
    server
        .add_post_handler_with_state(WEBHOOK_PATH, routes::dtconn, WebhookState { events: events_tx })
        .await;
    server
        .add_handler_with_state(&settings.login_path, routes::login, session.clone())
        .await;

    if needs_login(store.as_ref(), &settings.token_key, settings.min_token_ttl).await {
        notify_login(&http, &settings, &session).await;
    }

    // ========== Tâches de fond ==========
    let watcher = CredentialWatcher::new(
        store.clone(),
        settings.token_key.as_str(),
        controller.clone(),
        settings.poll_period,
        settings.min_token_ttl,
    );
    let watcher_task = tokio::spawn(watcher.run(cancel.clone()));

    let persister = CredentialPersister::new(
        store.clone(),
        settings.token_key.as_str(),
        controller.clone(),
        settings.persist_period,
    );
    let persister_task = tokio::spawn(persister.run(cancel.clone()));

    let relay = EventRelay::new(controller.clone(), events_rx, settings.ready_timeout);
    let mut relay_task = tokio::spawn(relay.run(cancel.clone()));

    // ========== Démarrage ==========
    health_server.start().await?;
    server.start().await?;
    info!("dtspotify is running, press Ctrl+C to stop");

    let outcome = tokio::select! {
        result = &mut relay_task => match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(e) => Err(anyhow!("Event relay task failed: {}", e)),
        },
        result = signal::ctrl_c() => {
            result.context("Failed to listen for ctrl_c")?;
            info!("Ctrl+C reçu, arrêt");
            Ok(())
        }
    };

    if let Err(e) = &outcome {
        error!("{:#}", e);
    }

    cancel.cancel();
    server.wait().await;
    health_server.wait().await;
    let _ = watcher_task.await;
    let _ = persister_task.await;
    if !relay_task.is_finished() {
        relay_task.abort();
    }
    controller_task.wait().await?;

    outcome
}

/// Makes sure a usable credential is stored, asking for a login if needed
///
/// Returns immediately when the stored credential lives longer than the
/// init threshold.
pub async fn run_init(settings: AppSettings) -> Result<()> {
    let store = settings.store().await?;
    if !needs_login(
        store.as_ref(),
        &settings.token_key,
        settings.init_min_token_ttl,
    )
    .await
    {
        info!("A live Spotify token is already stored");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let http = dtsplayer::api::http_client()?;
    let session = Arc::new(LoginSession::new(
        settings.oauth(http.clone()),
        store,
        settings.token_key.as_str(),
    )?);
    let mut logins = session.logins();

    let mut server = settings.server(&cancel);
    server
        .add_handler_with_state(&settings.login_path, routes::login, session.clone())
        .await;
    server.start().await?;

    notify_login(&http, &settings, &session).await;

    let outcome = tokio::select! {
        changed = logins.changed() => changed
            .map(|_| info!("Spotify token stored"))
            .context("Login session closed"),
        result = signal::ctrl_c() => {
            result.context("Failed to listen for ctrl_c")?;
            Err(anyhow!("Interrupted before login completed"))
        }
    };

    cancel.cancel();
    server.wait().await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use dtsplayer::Credential;

    #[test]
    fn test_settings_require_secrets() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let config = Config::load_config(&dir.path().to_string_lossy())?;
        assert!(AppSettings::from_config(&config).is_err());

        config.set_spotify_client_id("client")?;
        config.set_spotify_client_secret("secret")?;
        config.set_base_url("https://dt.example.org/")?;
        config.set_slack_url("https://hooks.slack.com/services/T/B/X")?;

        let settings = AppSettings::from_config(&config)?;
        assert_eq!(settings.redirect_url, "https://dt.example.org/login");
        assert_eq!(settings.login_path, "/login");
        assert_eq!(settings.token_key, "spotify_token");
        assert_eq!(settings.ready_timeout, Duration::from_secs(300));
        assert_eq!(settings.min_token_ttl, Duration::from_secs(120));
        Ok(())
    }

    #[tokio::test]
    async fn test_needs_login() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileCredentialStore::new(dir.path()).await?;
        let key = "spotify_token";
        let min_ttl = Duration::from_secs(300);

        assert!(needs_login(&store, key, min_ttl).await);

        let credential = Credential::expiring_in("a", "r", Duration::from_secs(3600));
        store.save(key, &credential, Duration::from_secs(60)).await?;
        assert!(needs_login(&store, key, min_ttl).await);

        store.save(key, &credential, Duration::from_secs(3600)).await?;
        assert!(!needs_login(&store, key, min_ttl).await);
        Ok(())
    }
}
