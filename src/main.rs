//! Gameshow back binary entrypoint wiring REST, WebSocket, SSE and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, http::HeaderValue};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gameshow_back::{
    config::{AppConfig, StorageBackend},
    dao::{game_store::memory::MemoryGameStore, question_source::llm::LlmQuestionSource},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    config.log_summary();

    let questions =
        LlmQuestionSource::new(config.llm.clone()).context("building question source client")?;
    let cors = cors_layer(&config);
    let storage = config.storage;
    let app_state = AppState::new(config, Arc::new(questions));

    start_storage(&app_state, storage).await;
    let app = build_router(app_state, cors);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Install the in-memory store right away, or hand CouchDB to the storage supervisor.
async fn start_storage(state: &SharedState, backend: StorageBackend) {
    match backend {
        StorageBackend::Memory => {
            info!("using in-memory storage");
            state
                .install_game_store(Arc::new(MemoryGameStore::new()))
                .await;
        }
        #[cfg(feature = "couch-store")]
        StorageBackend::Couch => {
            use gameshow_back::dao::game_store::{
                GameStore,
                couchdb::{CouchConfig, CouchGameStore},
            };
            use gameshow_back::{dao::storage::StorageError, services::storage_supervisor};

            tokio::spawn(storage_supervisor::run(state.clone(), || async {
                let config = CouchConfig::from_env().map_err(StorageError::from)?;
                let store = CouchGameStore::connect(config)
                    .await
                    .map_err(StorageError::from)?;
                Ok(Arc::new(store) as Arc<dyn GameStore>)
            }));
        }
        #[cfg(not(feature = "couch-store"))]
        StorageBackend::Couch => {
            warn!("built without the couch-store feature; falling back to in-memory storage");
            state
                .install_game_store(Arc::new(MemoryGameStore::new()))
                .await;
        }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.permissive_cors() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(%origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, cors: CorsLayer) -> Router<()> {
    routes::router(state)
        .layer(cors)
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

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
