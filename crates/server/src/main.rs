mod bootstrap;
mod health;
mod http;
mod interactions;
mod jobs;
mod services;
mod startup;
mod state;

use std::time::Duration;

use anyhow::{Context, Result};
use tembea_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use tembea_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging comes up before anything that might log.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    startup::run(&app.state, &app.config.admin).await;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("could not bind {address}"))?;
    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        address = %address,
        "tembea-server listening"
    );

    let scheduler = app.state.scheduler.clone();
    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    axum::serve(listener, http::router(app.state))
        .with_graceful_shutdown(wait_for_shutdown(grace))
        .await
        .context("server error")?;

    scheduler.shutdown();
    app.db_pool.close().await;
    tracing::info!(
        event_name = "system.server.stopped",
        correlation_id = "shutdown",
        "tembea-server stopped"
    );

    Ok(())
}

/// Resolves on Ctrl-C. In-flight requests then get `grace` to finish before the process exits.
async fn wait_for_shutdown(grace: Duration) {
    if let Err(signal_error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "system.server.signal_failed",
            error = %signal_error,
            "could not listen for ctrl-c"
        );
        return;
    }
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        grace_secs = grace.as_secs(),
        "tembea-server stopping"
    );
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!(event_name = "system.server.forced_exit", "graceful shutdown timed out");
        std::process::exit(1);
    });
}
