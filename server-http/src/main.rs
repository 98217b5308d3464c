use anyhow::Context;
use axum::ServiceExt;
use crm::planes::data::{CustomerOperationsService, ServiceSettings};
use crm::CacheStore;
use erply_client::{ClientSettings, ErplyClient};
use server_http::{build_app, AppState};
use shared::config::Config;
use std::sync::Arc;
use std::time::Duration;
use storage_engine::CacheStoreFactory;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting customer gateway...");

    // Load environment variables from .env file (if exists)
    match dotenvy::dotenv() {
        Ok(_) => info!("Loaded environment variables from .env file"),
        Err(_) => info!("No .env file found, using system environment variables"),
    }

    let config = Config::from_env().context("invalid configuration")?;
    let cache_ttl = Duration::from_secs(config.customer_cache_ttl_secs);

    let cache = CacheStoreFactory::create(config.redis_addr.as_deref(), cache_ttl)
        .await
        .context("failed to initialize customer cache")?;

    let directory = ErplyClient::new(config.erply.clone(), ClientSettings::default())
        .context("failed to build Erply client")?;
    info!("Erply endpoint: {}", directory.endpoint());

    let customer_operations = CustomerOperationsService::new(
        cache.clone(),
        Arc::new(directory),
        ServiceSettings::with_cache_ttl(cache_ttl),
    );

    let state = AppState::new(Arc::new(customer_operations), config.api_key.as_str());
    let app = build_app(state, &config.allowed_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("HTTP Server listening on http://{}", addr);

    // Graceful shutdown handler
    axum::serve(listener, ServiceExt::<axum::extract::Request>::into_make_service(app))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Err(e) = cache.close().await {
        warn!("Failed to close customer cache: {}", e);
    }
    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }

    info!("Shutting down gracefully...");
}
