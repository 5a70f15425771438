//! # dtspotify - Capteurs Disruptive Technologies vers Spotify
//!
//! Reçoit les événements des capteurs sur `/dtconn`, les traduit en
//! commandes de lecture et les confie au contrôleur de `dtsplayer`.
//!
//! - [`events`] : schéma des événements et relais vers le contrôleur
//! - [`routes`] : handlers HTTP du webhook et de la redirection OAuth
//! - [`notify`] : envoi de l'URL de connexion sur un webhook Slack
//! - [`app`] : assemblage du service et du compagnon `dtspotify-init`

pub mod app;
pub mod events;
pub mod notify;
pub mod routes;

pub use app::{AppSettings, run, run_init};
pub use events::{DtEvent, EventRelay};
