//! # dtsplayer - Pilotage Spotify pour dtspotify
//!
//! Cette crate possède le client Spotify authentifié et la tâche unique qui
//! l'utilise. Les commandes de lecture, les renouvellements de jeton et les
//! demandes d'instantané passent tous par des canaux vers cette tâche.
//!
//! ## Architecture
//!
//! - `api` : accès bas niveau à l'API Web Spotify et au flux OAuth
//! - `client` : traits `PlaybackClient` / `PlaybackConnector` et leur
//!   implémentation Spotify avec rafraîchissement transparent du jeton
//! - `controller` : la tâche qui sérialise les commandes, avec sa porte de
//!   disponibilité (`ReadinessGate`)
//! - `store` : stockage durable des jetons avec TTL
//! - `session` : session de connexion OAuth (state, échange du code)
//! - `watcher` / `persist` : alimentation et sauvegarde périodiques du jeton
//!
//! ## Utilisation
//!
//! ```rust,no_run
//! use dtsplayer::{Controller, Credential, OAuthApp, SpotifyConnector, API_BASE_URL};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http = dtsplayer::api::http_client()?;
//!     let oauth = OAuthApp::with_http_client(http.clone(), "id", "secret", "http://localhost/login");
//!     let connector = SpotifyConnector::new(http, API_BASE_URL, oauth);
//!
//!     let cancel = CancellationToken::new();
//!     let (controller, task) = Controller::spawn(connector, cancel.clone());
//!
//!     controller
//!         .push_credential(Credential::expiring_in("access", "refresh", Duration::from_secs(3600)))
//!         .await;
//!     controller.readiness().wait().await;
//!     controller.toggle().await;
//!
//!     cancel.cancel();
//!     task.wait().await
//! }
//! ```

pub mod api;
pub mod client;
pub mod controller;
pub mod credential;
pub mod error;
pub mod models;
pub mod persist;
pub mod session;
pub mod store;
pub mod watcher;

pub use api::API_BASE_URL;
pub use api::SpotifyApi;
pub use api::auth::{OAuthApp, SCOPES};
pub use client::{PlaybackClient, PlaybackConnector, SpotifyClient, SpotifyConnector};
pub use controller::{Command, Controller, ControllerTask, ReadinessGate};
pub use credential::Credential;
pub use error::{Result, SpotifyError};
pub use models::{PlayOptions, PlayerState};
pub use persist::CredentialPersister;
pub use session::LoginSession;
pub use store::{CredentialStore, FileCredentialStore};
pub use watcher::CredentialWatcher;
