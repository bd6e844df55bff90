//! Wires the settings store and the upload pipeline to host events.
//!
//! Recordings given on the command line are uploaded and the agent exits.
//! Without arguments, every line read from stdin is treated as the path of
//! a freshly saved recording until stdin closes or Ctrl-C is pressed.

use std::sync::Arc;

use replaybot_settings::{JsonSettingsStore, SettingKey, SettingsStore};
use replaybot_uploader::{JobHandle, Uploader};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use crate::config::Config;

/// Runs the agent until all work is done or shutdown is requested.
pub async fn run(config: Config, recordings: Vec<String>) -> anyhow::Result<()> {
    let store: Arc<dyn SettingsStore> = Arc::new(JsonSettingsStore::new(config.settings_path()));
    let uploader = Uploader::with_defaults(config.uploader, store.clone())?;

    let name_bot = store.get(SettingKey::NameBot);
    if !name_bot.is_empty() {
        tracing::info!(bot = %name_bot, "linked bot");
    }
    uploader.on_host_loaded();

    let mut jobs = JoinSet::new();

    if recordings.is_empty() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => match line? {
                    Some(path) if !path.trim().is_empty() => {
                        if let Some(job) = uploader.on_recording_saved(path.trim()) {
                            jobs.spawn(report(job));
                        }
                    }
                    Some(_) => {}
                    None => break,
                },
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown signal received");
                    uploader.shutdown().await;
                    break;
                }
            }
        }
    } else {
        for path in &recordings {
            if let Some(job) = uploader.on_recording_saved(path) {
                jobs.spawn(report(job));
            }
        }
    }

    let mut incomplete = 0usize;
    tokio::select! {
        _ = async {
            while let Some(done) = jobs.join_next().await {
                if !matches!(done, Ok(true)) {
                    incomplete += 1;
                }
            }
        } => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    uploader.shutdown().await;
    if incomplete > 0 {
        anyhow::bail!("{incomplete} upload(s) did not complete");
    }
    Ok(())
}

/// Waits for a job and logs its outcome. Returns true when it completed.
async fn report(job: JobHandle) -> bool {
    let id = job.id();
    match job.wait().await {
        Ok(report) if report.is_complete() => {
            tracing::info!(
                job = %id,
                file_name = %report.file_name,
                chunks = report.total_chunks,
                "recording uploaded"
            );
            true
        }
        Ok(report) => {
            tracing::warn!(
                job = %id,
                file_name = %report.file_name,
                acked = report.acked,
                total = report.total_chunks,
                failed = ?report.failed,
                read_error = ?report.read_error,
                "recording partially uploaded"
            );
            false
        }
        Err(e) => {
            tracing::error!(job = %id, error = %e, "recording upload failed");
            false
        }
    }
}
