//! Ensures a live Spotify token is stored before the service starts

use dtsconfig::get_config;
use dtspotify::AppSettings;
use dtsserver::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let settings = AppSettings::from_config(&get_config())?;
    dtspotify::run_init(settings).await
}
