use keygate_server::{app, config::ServerConfig, error::StartupError};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!(production = config.session.production, "Loaded configuration");

    let state = match app::build_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start");
            std::process::exit(1);
        }
    };

    let cleanup_period = match app::revocation_cleanup_interval(&config.session) {
        Ok(period) => period,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start");
            std::process::exit(1);
        }
    };

    // Spawn periodic revocation cleanup task
    let cleanup_store = state.store.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_period);
        loop {
            interval.tick().await;
            let count = cleanup_store.prune_revocations().await;
            if count > 0 {
                tracing::debug!(pruned_revocations = count, "Periodic revocation cleanup");
            }
        }
    });

    let app = app::router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            let err = StartupError::Bind {
                addr: config.bind_addr.clone(),
                details: e.to_string(),
            };
            tracing::error!(error = %err, "Failed to start");
            std::process::exit(1);
        }
    };

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
