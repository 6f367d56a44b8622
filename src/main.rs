use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_anomaly::logic::LoadError;
use api_anomaly::{create_router, AppState, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "api_anomaly=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.log_format == "json" {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("API Anomaly Detection service starting...");
    tracing::info!(
        model_dir = %config.model_dir.display(),
        n_estimators = config.forest.n_estimators,
        contamination = config.forest.contamination,
        "configuration loaded"
    );
    if config.uses_default_token() {
        if config.is_production() {
            tracing::warn!("API_TOKEN is not set; the default token is in use in production");
        } else {
            tracing::info!("Using the default API token");
        }
    }

    let state = AppState::new(config.clone());

    if config.autoload_model {
        autoload(&state).await;
    }

    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Publish the persisted model if there is one
async fn autoload(state: &AppState) {
    let engine = Arc::clone(&state.engine);
    match tokio::task::spawn_blocking(move || engine.load()).await {
        Ok(Ok(status)) => {
            tracing::info!(trained_at = ?status.training_date, "loaded persisted model");
        }
        Ok(Err(LoadError::NotFound(dir))) => {
            tracing::info!(dir = %dir.display(), "no persisted model, starting untrained");
        }
        Ok(Err(e)) => tracing::warn!("Failed to load persisted model: {}", e),
        Err(e) => tracing::warn!("Model autoload task failed: {}", e),
    }
}

/// Handle graceful shutdown signals
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
