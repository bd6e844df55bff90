//! replaybot agent entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    // Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting replaybot agent");

    let config = config::Config::load()?;
    tracing::info!(
        upload_info_url = %config.uploader.upload_info_url,
        settings = %config.settings_path().display(),
        "configuration loaded"
    );

    let recordings: Vec<String> = std::env::args().skip(1).collect();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config, recordings))?;

    tracing::info!("agent shut down cleanly");
    Ok(())
}
