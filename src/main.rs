//! pick-a-number binary entrypoint: loads configuration, installs the game store and serves HTTP.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pick_a_number::{
    config::{AppConfig, StoreBackend},
    dao::game_store::memory::MemoryGameStore,
    routes,
    services::openid::OpenIdRelyingParty,
    state::{AppState, SharedState, secret::RandomSecret},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let identity = OpenIdRelyingParty::new().context("building OpenID client")?;
    let app_state = AppState::new(
        Arc::new(RandomSecret),
        Arc::new(identity),
        config.public_url.clone(),
    );

    install_store(&app_state, config.store).await;
    let app = build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, store = %config.store, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the memory store directly; database stores are connected in the background.
async fn install_store(state: &SharedState, backend: StoreBackend) {
    match backend {
        StoreBackend::Memory => install_memory(state).await,
        StoreBackend::MongoDb => spawn_mongo(state).await,
        StoreBackend::CouchDb => spawn_couch(state).await,
    }
}

async fn install_memory(state: &SharedState) {
    state.set_game_store(Arc::new(MemoryGameStore::new())).await;
    info!("using in-memory game store");
}

#[cfg(feature = "mongo-store")]
async fn spawn_mongo(state: &SharedState) {
    use pick_a_number::{
        dao::{
            game_store::{
                GameStore,
                mongodb::{MongoConfig, MongoGameStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    tokio::spawn(storage_supervisor::run(state.clone(), || async {
        let config = MongoConfig::from_env().await?;
        let store = MongoGameStore::connect(config).await?;
        Ok::<Arc<dyn GameStore>, StorageError>(Arc::new(store))
    }));
}

#[cfg(not(feature = "mongo-store"))]
async fn spawn_mongo(state: &SharedState) {
    warn!("built without the `mongo-store` feature; falling back to memory");
    install_memory(state).await;
}

#[cfg(feature = "couch-store")]
async fn spawn_couch(state: &SharedState) {
    use pick_a_number::{
        dao::{
            game_store::{
                GameStore,
                couchdb::{CouchConfig, CouchGameStore},
            },
            storage::StorageError,
        },
        services::storage_supervisor,
    };

    tokio::spawn(storage_supervisor::run(state.clone(), || async {
        let config = CouchConfig::from_env()?;
        let store = CouchGameStore::connect(config).await?;
        Ok::<Arc<dyn GameStore>, StorageError>(Arc::new(store))
    }));
}

#[cfg(not(feature = "couch-store"))]
async fn spawn_couch(state: &SharedState) {
    warn!("built without the `couch-store` feature; falling back to memory");
    install_memory(state).await;
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
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
