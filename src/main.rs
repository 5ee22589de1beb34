//! Karaoke queue backend entrypoint wiring REST, SSE and the storage supervisor.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use karaoke_queue_back::{
    config::AppConfig,
    dao::event_store::memory::InMemoryEventStore,
    routes,
    services::sse_events,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    if !config.has_operators() {
        warn!("no operator token configured; the operator surface is unreachable");
    }
    let app_state = AppState::new(config);

    spawn_status_forwarder(app_state.clone());
    start_storage(app_state.clone()).await;

    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick the storage backend: MongoDB under supervision when `MONGO_URI` is
/// set, the in-memory store otherwise.
async fn start_storage(state: SharedState) {
    if env::var_os("MONGO_URI").is_some() && spawn_mongo_supervisor(state.clone()) {
        return;
    }

    info!("using in-memory storage");
    state
        .install_event_store(Arc::new(InMemoryEventStore::new()))
        .await;
}

#[cfg(feature = "mongo-store")]
fn spawn_mongo_supervisor(state: SharedState) -> bool {
    use karaoke_queue_back::{
        dao::{
            event_store::{
                EventStore,
                mongodb::{MongoConfig, MongoEventStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    info!("using MongoDB storage");
    tokio::spawn(storage_supervisor::run(state, || async {
        let config = MongoConfig::from_env().await.map_err(StorageError::from)?;
        let store = MongoEventStore::connect(config)
            .await
            .map_err(StorageError::from)?;
        Ok::<_, StorageError>(Arc::new(store) as Arc<dyn EventStore>)
    }));
    true
}

#[cfg(not(feature = "mongo-store"))]
fn spawn_mongo_supervisor(_state: SharedState) -> bool {
    warn!("MONGO_URI is set but the mongo-store feature is disabled");
    false
}

/// Relay degraded mode transitions to the operator stream.
fn spawn_status_forwarder(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    tokio::spawn(async move {
        while watcher.changed().await.is_ok() {
            let degraded = *watcher.borrow_and_update();
            if degraded {
                warn!("storage lost; running in degraded mode");
            }
            sse_events::broadcast_system_status(&state, degraded);
        }
    });
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
