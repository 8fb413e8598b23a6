//! Taskflow Server - Main entry point

use anyhow::Result;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use taskflow_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tracing::info;

use taskflow_server::{
    api,
    config::Config,
    db,
    features::{FeatureState, UploadState},
    ingest::{
        files::scan_orphans, AppendOnlyLog, EventDispatcher, FileLifecycle, IngestionLog,
        IngestionWorker, PgTaskGateway,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("taskflow-server")
        .filter_directives("taskflow_server=debug,tower_http=debug,sqlx=warn")
        .build()
        .merge_env()?;

    let _log_guard = init_logging(&log_config)?;

    info!("Starting Taskflow Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    config.ingest.ensure_directories().await?;

    let pool = db::create_pool(&config.database).await?;
    db::run_migrations(&pool).await?;

    let orphans = scan_orphans(&config.ingest.upload_dir).await?;
    if !orphans.is_empty() {
        tracing::warn!(
            count = orphans.len(),
            upload_dir = %config.ingest.upload_dir.display(),
            "Upload directory holds files from earlier runs; they are not reprocessed automatically"
        );
    }

    // Ingestion pipeline
    let dispatcher = Arc::new(EventDispatcher::new(config.ingest.queue_capacity));
    let lifecycle = Arc::new(FileLifecycle::local());
    let ingestion_log: Arc<dyn IngestionLog> =
        Arc::new(AppendOnlyLog::open(&config.ingest.log_file).await?);
    let worker = Arc::new(IngestionWorker::new(
        Arc::new(PgTaskGateway::new(pool.clone())),
        lifecycle.clone(),
        ingestion_log.clone(),
        config.ingest.persist_timeout(),
    ));
    let consumer = dispatcher.subscribe(worker)?;

    info!(
        queue_capacity = dispatcher.capacity(),
        log_file = %config.ingest.log_file.display(),
        "Ingestion worker started"
    );

    let state = FeatureState {
        db: pool,
        uploads: UploadState {
            dispatcher: dispatcher.clone(),
            lifecycle,
            log: ingestion_log,
            upload_dir: config.ingest.upload_dir.clone(),
            max_upload_bytes: config.ingest.max_upload_bytes,
        },
    };

    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Let the worker finish what was already accepted
    dispatcher.close();
    let drain_timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    match tokio::time::timeout(drain_timeout, consumer).await {
        Ok(Ok(())) => info!("Ingestion queue drained"),
        Ok(Err(e)) => tracing::error!("Ingestion consumer task failed: {}", e),
        Err(_) => tracing::warn!(
            "Ingestion queue not drained within {} seconds; pending uploads stay on disk",
            drain_timeout.as_secs()
        ),
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
