mod classifier;
mod config;
mod error;
mod http_server;
mod logger;
mod trigger;
mod types;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use config::Config;
use http_server::ReceiverState;
use logger::EventLog;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use trigger::TriggerClient;

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; the environment may already be populated.
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env().context("invalid configuration")?;
    let log = EventLog::new(&config.log_file);

    if config.secret.is_some() {
        tracing::warn!("WEBHOOK_SECRET is set but webhook signatures are not verified");
    }

    let trigger = TriggerClient::new(config.build.clone(), log.clone())
        .context("failed to build trigger client")?;
    let state = ReceiverState::new(trigger, log.clone());
    let app = http_server::router(state.clone(), config.max_body_bytes);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("failed to bind {}:{}", config.host, config.port))?;
    let port = listener.local_addr().context("listener has no local address")?.port();

    tracing::info!(
        log_file = %log.path().display(),
        build_server = %config.build.base_url,
        job = %config.build.job_name,
        "webhook receiver ready"
    );
    log.info(format!("Webhook receiver listening on port {port}"));

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    let pending = state.in_flight_triggers();
    if pending > 0 {
        tracing::info!(pending, "waiting for in-flight build triggers");
    }
    tokio::select! {
        _ = state.drain_triggers() => {}
        _ = shutdown_signal() => {
            tracing::warn!(
                pending = state.in_flight_triggers(),
                "second shutdown signal, abandoning in-flight build triggers"
            );
        }
    }

    tracing::info!("webhook receiver stopped");
    Ok(())
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
