use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;

use marketplace::{
    app::{build_app, serve},
    auth::services::run_token_cleanup,
    config::AppConfig,
    metrics::{metrics_app, Metrics},
    state::AppState,
    store::create_pool,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "marketplace=debug,axum=info,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = Arc::new(AppConfig::from_env()?);

    let db = create_pool(&config.database_url, config.db_max_connections)
        .await
        .context("connect to postgres")?;

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .context("run migrations")?;

    let metrics = Metrics::new("marketplace").context("register metrics")?;
    let state = AppState::from_parts(db, Arc::clone(&config), metrics.clone());

    let (stop_tx, stop_rx) = watch::channel(false);
    let cleanup = tokio::spawn(run_token_cleanup(
        state.auth.clone(),
        config.token_cleanup_interval(),
        stop_rx.clone(),
    ));

    let app = build_app(state);
    let served = tokio::try_join!(
        serve(app, &config.host, config.port, stopped(stop_rx.clone())),
        serve(metrics_app(metrics), &config.host, config.metrics_port, stopped(stop_rx)),
        async {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
            Ok::<_, anyhow::Error>(())
        },
    );
    // also reached when a server fails; the cleanup task still needs the flag
    let _ = stop_tx.send(true);

    if let Err(e) = cleanup.await {
        tracing::warn!(error = %e, "token cleanup task ended abnormally");
    }
    tracing::info!("shut down");
    served.map(|_| ())
}

/// Resolves once the stop flag flips or its sender is gone.
async fn stopped(mut stop: watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            break;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
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
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
