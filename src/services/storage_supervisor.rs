use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::{
    dao::{content_store::ContentStore, storage::StorageError},
    services::user_service,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(10);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(5);
const MAX_RECONNECT_ATTEMPTS: u32 = 3;

/// Install the store in the shared state and seed the configured administrators.
async fn install(state: &SharedState, store: Arc<dyn ContentStore>) {
    if let Err(err) =
        user_service::seed_bootstrap_admins(&store, state.config().bootstrap_admins()).await
    {
        warn!(error = %err, "failed to seed bootstrap admins");
    }
    state.set_content_store(store).await;
}

/// Connect to the storage backend and keep the shared state in degraded mode while it is unavailable.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn ContentStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    loop {
        match connect().await {
            Ok(store) => {
                install(&state, store.clone()).await;
                info!("storage connection established; leaving degraded mode");
                delay = INITIAL_DELAY;

                loop {
                    match store.health_check().await {
                        Ok(()) => {
                            if state.is_degraded() {
                                info!("storage healthy again; leaving degraded mode");
                                state.update_degraded(false);
                            }
                            sleep(HEALTH_POLL_INTERVAL).await;
                        }
                        Err(err) => {
                            warn!(error = %err, "storage health check failed");
                            if reconnect(&state, store.as_ref()).await {
                                install(&state, store.clone()).await;
                                sleep(HEALTH_POLL_INTERVAL).await;
                            } else {
                                warn!(
                                    "exhausted storage reconnect attempts; staying in degraded mode"
                                );
                                state.clear_content_store().await;
                                break;
                            }
                        }
                    }
                }

                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
            Err(err) => {
                warn!(error = %err, "storage connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Retry `try_reconnect` with backoff, entering degraded mode after the first failure.
async fn reconnect(state: &SharedState, store: &dyn ContentStore) -> bool {
    let mut reconnect_delay = INITIAL_DELAY;

    for attempt in 0..MAX_RECONNECT_ATTEMPTS {
        match store.try_reconnect().await {
            Ok(()) => {
                info!(attempt, "storage reconnection succeeded after health check failure");
                return true;
            }
            Err(err) => {
                if attempt == 0 {
                    warn!(
                        attempt, error = %err,
                        "storage reconnect first attempt failed; entering degraded mode"
                    );
                    state.update_degraded(true);
                } else {
                    warn!(attempt, error = %err, "storage reconnect attempt failed");
                }
                sleep(reconnect_delay).await;
                reconnect_delay = (reconnect_delay * 2).min(MAX_DELAY);
            }
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{AppConfig, BootstrapAdmin},
        dao::{content_store::memory::MemoryContentStore, models::Role},
        state::AppState,
    };

    #[tokio::test]
    async fn installs_store_and_seeds_admins() {
        let config = AppConfig::default().with_bootstrap_admins(vec![BootstrapAdmin {
            id: "root".into(),
            display_name: "Root".into(),
        }]);
        let state = AppState::new(config, None);
        let store = MemoryContentStore::new();

        let handle = {
            let store = store.clone();
            tokio::spawn(run(state.clone(), move || {
                let store: Arc<dyn ContentStore> = Arc::new(store.clone());
                async move { Ok::<_, StorageError>(store) }
            }))
        };

        let mut watcher = state.degraded_watcher();
        tokio::time::timeout(Duration::from_secs(2), watcher.wait_for(|degraded| !degraded))
            .await
            .unwrap()
            .unwrap();
        handle.abort();

        let root = store.find_user("root".into()).await.unwrap().unwrap();
        assert_eq!(root.role, Role::Admin);
    }
}
