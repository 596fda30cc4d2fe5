use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;

use ndjson_batch_sink::backend::{make_sink_from_config, parse_prefix};
use ndjson_batch_sink::config::ServiceConfig;
use ndjson_batch_sink::engine::BatchEngine;
use ndjson_batch_sink::env::{env_or, DEFAULT_LOGLEVEL, LOGLEVEL_ENV};
use ndjson_batch_sink::init::init_tracing;
use ndjson_batch_sink::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing(&env_or(LOGLEVEL_ENV, DEFAULT_LOGLEVEL)).context("install tracing subscriber")?;

    let config = ServiceConfig::from_env().context("load configuration")?;
    let backend = parse_prefix(&config.prefix).context("parse PREFIX")?;
    let sink = make_sink_from_config(&backend).context("build storage sink")?;

    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;

    let engine = Arc::new(BatchEngine::start(sink, config.engine_config()));

    // The engine is drained whether the server stopped cleanly or not.
    let served = server::serve(listener, Arc::clone(&engine), wait_for_shutdown_signal()).await;
    let drained = engine.shutdown().await;

    served.context("http server")?;
    drained.context("drain buffered records")?;
    Ok(())
}

/// Wait for shutdown signals (Ctrl+C or SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down");
        }
    }
}
