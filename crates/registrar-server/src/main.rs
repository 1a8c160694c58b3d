//! registrar server
//!
//! Startup order:
//! - load config (file, then env overrides), register metrics
//! - supervise the database connection with bounded retries
//! - on success bind and serve; on exhaustion exit 1

use std::process::ExitCode;
use std::sync::Arc;

use sqlx::MySqlPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use registrar_core::error::{RegistrarError, Result};
use registrar_core::metrics::MetricsRegistry;
use registrar_server::{
    app_state::AppState,
    bootstrap::{ConnectionRetrySupervisor, MySqlConnector, RetryPolicy},
    config,
    obs::metrics::register_connect_attempts,
    router,
};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, class = e.class().as_str(), "registrar stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    let cfg = config::load()?;
    let registry = Arc::new(MetricsRegistry::new());
    let attempts = register_connect_attempts(&registry)?;
    let state = AppState::new(cfg, Arc::clone(&registry))?;

    let db = &state.cfg().database;
    let connector = MySqlConnector::from_config(db);
    let mut supervisor =
        ConnectionRetrySupervisor::new(RetryPolicy::from_config(db)).with_attempt_counter(attempts);

    supervisor
        .run(&connector, |pool| serve(state.clone(), pool))
        .await?
}

async fn serve(state: AppState, pool: MySqlPool) -> Result<()> {
    state.attach_database(pool)?;
    let listen = state.cfg().server.listen_addr()?;
    let app = router::build_router(state.clone());

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| RegistrarError::Internal(format!("bind {listen} failed: {e}")))?;
    tracing::info!(%listen, metrics_path = %state.cfg().metrics.path, "registrar listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(state))
        .await
        .map_err(|e| RegistrarError::Internal(format!("server failed: {e}")))
}

async fn shutdown_signal(state: AppState) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    state.set_draining();
    tracing::info!("signal received, starting graceful shutdown");
}
