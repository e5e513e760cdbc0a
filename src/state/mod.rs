/// Session progress and scoring rules.
pub mod session;
/// Running-average aggregation rules.
pub mod stats;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::content_store::ContentStore, error::ServiceError,
    services::completion::CompletionClient,
};

pub type SharedState = Arc<AppState>;

/// Central application state holding the storage handle, configuration and collaborators.
pub struct AppState {
    content_store: RwLock<Option<Arc<dyn ContentStore>>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    completion: Option<Arc<dyn CompletionClient>>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig, completion: Option<Arc<dyn CompletionClient>>) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            content_store: RwLock::new(None),
            degraded: degraded_tx,
            config,
            completion,
        })
    }

    /// Obtain a handle to the current content store, if one is installed.
    pub async fn content_store(&self) -> Option<Arc<dyn ContentStore>> {
        let guard = self.content_store.read().await;
        guard.as_ref().cloned()
    }

    /// Return the installed store, or [`ServiceError::Degraded`] while storage is unavailable.
    pub async fn require_store(&self) -> Result<Arc<dyn ContentStore>, ServiceError> {
        if self.is_degraded() {
            return Err(ServiceError::Degraded);
        }
        self.content_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a content store implementation and leave degraded mode.
    pub async fn set_content_store(&self, store: Arc<dyn ContentStore>) {
        {
            let mut guard = self.content_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current content store and enter degraded mode.
    pub async fn clear_content_store(&self) {
        {
            let mut guard = self.content_store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Completion client used by the generation pipeline.
    pub fn completion(&self) -> Result<Arc<dyn CompletionClient>, ServiceError> {
        self.completion
            .clone()
            .ok_or_else(|| ServiceError::Upstream("completion service is not configured".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::content_store::memory::MemoryContentStore;

    #[tokio::test]
    async fn starts_degraded_until_a_store_is_installed() {
        let state = AppState::new(AppConfig::default(), None);
        let mut watcher = state.degraded_watcher();
        assert!(state.is_degraded());
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        state
            .set_content_store(Arc::new(MemoryContentStore::new()))
            .await;
        assert!(!state.is_degraded());
        assert!(watcher.has_changed().unwrap());
        assert!(!*watcher.borrow_and_update());
        assert!(state.require_store().await.is_ok());

        state.update_degraded(true);
        assert!(matches!(
            state.require_store().await,
            Err(ServiceError::Degraded)
        ));

        state.clear_content_store().await;
        assert!(state.content_store().await.is_none());
    }
}
