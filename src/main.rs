//! cabalbot - IRC command bot for countervandalism channels.

use cabalbot::app::{self, Collaborators};
use cabalbot::centralauth::CentralAuthClient;
use cabalbot::config::Config;
use cabalbot::journal::Journal;
use cabalbot::settings::StaticSettings;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(
        server = %config.server.url,
        port = config.server.port,
        tls = config.server.tls,
        nick = %config.bot.botname,
        "Starting CabalBot"
    );

    let journal = Journal::open(&config.journal.path).await.map_err(|e| {
        error!(path = %config.journal.path.display(), error = %e, "Failed to open journal");
        e
    })?;

    let collaborators = Collaborators {
        settings: Box::new(StaticSettings::from(&config.settings)),
        lookup: Arc::new(CentralAuthClient::new(&config.centralauth)?),
        feed: None,
    };

    let running = app::launch(&config, journal, collaborators).await?;
    running.run_until(shutdown_signal()).await?;

    info!("CabalBot stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
