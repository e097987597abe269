use std::future::IntoFuture;
use std::sync::Arc;

use anyhow::Context;
use backend::{
    catalog::{CatalogService, PgCatalogRepository},
    config::AppConfig,
    db::Db,
    http::{self, AppState},
};
use common::logger::init_logger;
use ledger::PgStockLedger;
use reservation::BatchCoordinator;
use tokio_util::sync::CancellationToken;

/// Connects the pool and brings the schema up to date.
async fn init_db(cfg: &AppConfig) -> anyhow::Result<Db> {
    let db = Db::connect(&cfg.database_url, cfg.db_max_connections).await?;
    db.migrate().await.context("running migrations")?;
    Ok(db)
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = AppConfig::from_env().context("loading configuration")?;
    init_logger("warehouse", cfg.is_production());

    tracing::info!(env = %cfg.app_env, "Starting warehouse service...");
    if cfg.reservation_max_concurrency > cfg.db_max_connections as usize {
        tracing::warn!(
            max_concurrency = cfg.reservation_max_concurrency,
            pool = cfg.db_max_connections,
            "reservation concurrency exceeds pool size; workers will queue on the pool"
        );
    }

    let db = init_db(&cfg).await?;

    // a lock wait never outlives the batch that started it
    let ledger = Arc::new(
        PgStockLedger::new(db.pool.clone()).with_lock_timeout(cfg.reservation_batch_timeout),
    );
    let coordinator = Arc::new(BatchCoordinator::new(ledger, cfg.coordinator()));
    let catalog = Arc::new(CatalogService::new(Arc::new(PgCatalogRepository::new(
        db.pool.clone(),
    ))));

    let shutdown = CancellationToken::new();
    let app = http::router(AppState::new(
        catalog,
        Arc::clone(&coordinator),
        shutdown.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(cfg.http_addr)
        .await
        .with_context(|| format!("binding {}", cfg.http_addr))?;
    tracing::info!(addr = %cfg.http_addr, "listening");

    let token = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move { token.cancelled().await })
        .into_future();
    let mut server = tokio::spawn(server);

    tokio::select! {
        res = &mut server => {
            res.context("server task panicked")?.context("server stopped")?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            // running batches stop and return what they already committed
            coordinator.close();
            shutdown.cancel();

            match tokio::time::timeout(cfg.shutdown_grace, &mut server).await {
                Ok(res) => res.context("server task panicked")?.context("server stopped")?,
                Err(_) => {
                    tracing::warn!(
                        grace_ms = cfg.shutdown_grace.as_millis() as u64,
                        "grace period elapsed; dropping remaining connections"
                    );
                    server.abort();
                }
            }
        }
    }

    db.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
