use std::sync::Arc;

use tracing::{info, warn};

use supply_chain_service::{
    build_router,
    config::{Config, StoreBackend},
    init_tracing,
    store::{MemoryStore, PgRecordStore, RecordStore},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    init_tracing("info,supply_chain_service=debug");

    let config = Config::from_env()?;

    let store: Arc<dyn RecordStore> = match &config.store {
        StoreBackend::Postgres(url) => {
            info!("Connecting to PostgreSQL...");
            let store = PgRecordStore::connect(url, config.max_connections).await?;
            store.ensure_schema().await?;
            info!("Database connection pool established.");
            Arc::new(store)
        }
        StoreBackend::Memory => {
            warn!("DATABASE_URL=memory: records are kept in process and lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState {
        store,
        policy: config.status_policy,
    };
    let app = build_router(state, config.cors_layer()?);

    let addr = config.addr();
    info!(policy = %config.status_policy, "Listening on http://{}", addr);
    info!("Submit events: POST http://{}/data  ·  Dashboard: GET http://{}/data/dashboard", addr, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
