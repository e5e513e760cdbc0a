//! Merge or Reject binary entrypoint wiring configuration, storage, the completion client and HTTP.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::{Context, bail};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use merge_or_reject::{
    build_router,
    config::AppConfig,
    dao::{
        content_store::{ContentStore, memory::MemoryContentStore},
        storage::StorageError,
    },
    services::{
        completion::{CompletionClient, OpenAiClient},
        storage_supervisor,
    },
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let completion = OpenAiClient::from_env()
        .context("building completion client")?
        .map(|client| Arc::new(client) as Arc<dyn CompletionClient>);
    if completion.is_none() {
        warn!("OPENAI_API_KEY not set; snippet generation is disabled");
    }

    let app_state = AppState::new(config, completion);
    spawn_storage(app_state.clone()).await?;

    let app = build_router(app_state);

    let port = env::var("PORT")
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

/// Start the storage supervisor for the backend named by `STORE_BACKEND`.
async fn spawn_storage(state: SharedState) -> anyhow::Result<()> {
    let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| default_backend().into());
    info!(backend = %backend, "selecting storage backend");

    match backend.as_str() {
        "memory" => {
            let store = MemoryContentStore::new();
            tokio::spawn(storage_supervisor::run(state, move || {
                let store: Arc<dyn ContentStore> = Arc::new(store.clone());
                async move { Ok::<_, StorageError>(store) }
            }));
        }
        #[cfg(feature = "mongo-store")]
        "mongo" => {
            use merge_or_reject::dao::content_store::mongodb::{MongoConfig, MongoContentStore};

            let config = MongoConfig::from_env()
                .await
                .context("reading MongoDB configuration")?;
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = config.clone();
                async move {
                    let store = MongoContentStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn ContentStore>)
                }
            }));
        }
        #[cfg(feature = "couch-store")]
        "couch" => {
            use merge_or_reject::dao::content_store::couchdb::{CouchConfig, CouchContentStore};

            let config = CouchConfig::from_env().context("reading CouchDB configuration")?;
            tokio::spawn(storage_supervisor::run(state, move || {
                let config = config.clone();
                async move {
                    let store = CouchContentStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn ContentStore>)
                }
            }));
        }
        other => bail!("unsupported STORE_BACKEND `{other}`"),
    }

    Ok(())
}

fn default_backend() -> &'static str {
    if cfg!(feature = "mongo-store") {
        "mongo"
    } else if cfg!(feature = "couch-store") {
        "couch"
    } else {
        "memory"
    }
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
