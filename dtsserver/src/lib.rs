//! # dtsserver - Serveurs HTTP de dtspotify
//!
//! - [`server`] : serveur Axum avec enregistrement de routes et arrêt gracieux
//! - [`health`] : registre de vérifications et endpoints `/live` / `/ready`
//! - [`logs`] : initialisation de `tracing` et réglage du niveau à chaud
//!
//! ```rust,no_run
//! use dtsserver::{HealthExt, HealthRegistry, ServerBuilder, logs::init_logging};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let log_state = init_logging();
//!
//!     let health = HealthRegistry::new();
//!     health.add_readiness_check("always", || Ok(()));
//!
//!     let mut server = ServerBuilder::new("dtspotify-health", "http://localhost", 8086).build();
//!     server.init_health(&health).await;
//!     server.init_log_setup(log_state).await;
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod health;
mod health_ext;
pub mod logs;
pub mod server;

pub use health::{HealthRegistry, HealthReport};
pub use health_ext::HealthExt;
pub use logs::{LogState, init_logging};
pub use server::{Server, ServerBuilder};
