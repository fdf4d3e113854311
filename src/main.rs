use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salon_backend::{
    api,
    auth::TokenService,
    config::{Config, StorageBackend},
    object_store as obj,
    pipeline::{StagingArea, Thumbnailer, UploadPipeline},
    storage::Database,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; variables may come from the environment
    let _ = dotenvy::dotenv();

    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "salon-backend starting");

    // Load configuration
    let config = Config::load()?;

    // Initialize database; failing here aborts startup
    let db = Database::open(&config.server.data_dir)
        .with_context(|| format!("Failed to open database in {}", config.server.data_dir))?;
    info!("Database opened at: {}", config.server.data_dir);

    // Initialize object store backend
    let object_store: Arc<dyn obj::ObjectStore> = match config.storage.backend {
        StorageBackend::Local => {
            let store = obj::LocalStore::new(&config.storage.local_storage_path)
                .context("Failed to create local storage directory")?;
            info!(
                "Using local storage backend at: {}",
                config.storage.local_storage_path
            );
            Arc::new(store)
        }
        StorageBackend::Database => {
            info!("Using database storage backend");
            Arc::new(obj::DatabaseStore::new(db.clone()))
        }
        StorageBackend::S3 => {
            let store =
                obj::S3Store::new(&config.storage.s3).context("Failed to configure S3 backend")?;
            info!(
                "Using S3 storage backend, bucket: {}",
                config.storage.s3.bucket.as_deref().unwrap_or_default()
            );
            Arc::new(store)
        }
    };

    let thumbnailer = config.thumbnails.enabled.then(|| {
        Thumbnailer::new(config.thumbnails.max_width, config.thumbnails.max_height)
    });
    if let Some(t) = thumbnailer {
        info!("Thumbnails enabled: {}x{}", t.max_width, t.max_height);
    }

    let staging = StagingArea::new(
        config.storage.upload_tmp_dir.as_deref().map(Path::new),
        config.max_upload_size,
    )
    .context("Failed to prepare upload staging directory")?;

    let tokens = TokenService::new(
        &config.auth.jwt_secret,
        chrono::Duration::seconds(config.auth.token_ttl_seconds),
    );

    // Create shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        db: db.clone(),
        tokens,
        uploads: UploadPipeline::new(db, object_store, thumbnailer, staging),
    });

    // Build and start the HTTP server
    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!("Listening on: {}", config.server.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, draining connections");
}
