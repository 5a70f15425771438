use dtsconfig::get_config;
use dtspotify::AppSettings;
use dtsserver::init_logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_state = init_logging();

    let settings = AppSettings::from_config(&get_config())?;
    info!(
        "🎵 Starting dtspotify (webhook on port {}, health on port {})",
        settings.http_port, settings.health_port
    );

    dtspotify::run(settings, log_state).await
}
