//! Extension pour monter les routes de santé et de logs sur un `Server`

use crate::Server;
use crate::health::HealthRegistry;
use crate::logs::{LogState, create_logs_router};

/// Trait d'extension pour ajouter `/live`, `/ready` et `/api/log_setup`
pub trait HealthExt {
    /// Enregistre les routes `/live` et `/ready` du registre
    async fn init_health(&mut self, registry: &HealthRegistry);

    /// Enregistre `GET/POST /api/log_setup`
    async fn init_log_setup(&mut self, log_state: LogState);
}

impl HealthExt for Server {
    async fn init_health(&mut self, registry: &HealthRegistry) {
        self.add_router("/", registry.router()).await;
    }

    async fn init_log_setup(&mut self, log_state: LogState) {
        self.add_router("/api", create_logs_router(log_state)).await;
    }
}
