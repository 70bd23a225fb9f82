//! Presence sweeper binary.
//!
//! Marks user records whose `updateDateTime` is older than the staleness
//! threshold as inactive. The entry point owns the document store handle,
//! then either runs a single sweep or schedules one every interval until a
//! termination signal arrives.

mod atomic;
mod background;
mod config;
mod document;
mod error;
mod file_store;
mod logging;
mod store;
mod sweep;

use chrono::Utc;
use clap::Parser;
use shadow_rs::shadow;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use crate::background::spawn_sweeper;
use crate::config::Args;
use crate::file_store::FileStore;
use crate::sweep::run_sweep;

shadow!(build);

/// Starts the sweeper and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging("info");

    let args = Args::parse();
    let settings = args.sweep_settings()?;
    let store = Arc::new(FileStore::new(PathBuf::from(&args.data_file)));
    store.ensure_parent().await?;

    if args.once {
        let result = run_sweep(store.as_ref(), &settings, Utc::now()).await;
        info!(updated = result.updated, "single sweep finished");
        return Ok(());
    }

    info!(
        store = ?store.path(),
        collection = %settings.collection,
        staleness_secs = settings.staleness.num_seconds(),
        interval_secs = settings.interval.as_secs(),
        "🧹 Starting inactivity sweeper"
    );
    let sweeper = spawn_sweeper(store, settings);
    shutdown_signal().await;
    sweeper.abort();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
}
