//! Process-local [`ContentStore`] backed by concurrent maps. Used for local
//! development (`STORE_BACKEND=memory`) and by the test-suite.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, ready};
use uuid::Uuid;

use crate::dao::{
    content_store::ContentStore,
    models::{
        LanguageVolumeEntity, SessionEntity, SnippetEntity, SnippetFilter, UserEntity,
        UserStatsEntity, user_stats_key,
    },
    storage::StorageResult,
};

#[derive(Clone, Default)]
pub struct MemoryContentStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    snippets: DashMap<Uuid, SnippetEntity>,
    languages: DashMap<String, LanguageVolumeEntity>,
    sessions: DashMap<Uuid, SessionEntity>,
    user_stats: DashMap<String, UserStatsEntity>,
    users: DashMap<String, UserEntity>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn session_count(&self) -> usize {
        self.inner.sessions.len()
    }
}

fn done<T: Send + 'static>(value: T) -> BoxFuture<'static, StorageResult<T>> {
    Box::pin(ready(Ok(value)))
}

impl ContentStore for MemoryContentStore {
    fn save_snippet(&self, snippet: SnippetEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.snippets.insert(snippet.id, snippet);
        done(())
    }

    fn find_snippet(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SnippetEntity>>> {
        done(self.inner.snippets.get(&id).map(|entry| entry.clone()))
    }

    fn delete_snippet(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        done(self.inner.snippets.remove(&id).is_some())
    }

    fn list_snippets(
        &self,
        filter: SnippetFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SnippetEntity>>> {
        let mut snippets: Vec<SnippetEntity> = self
            .inner
            .snippets
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        snippets.sort_by_key(|snippet| snippet.created_at);
        done(snippets)
    }

    fn save_language(
        &self,
        language: LanguageVolumeEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .languages
            .insert(language.language.clone(), language);
        done(())
    }

    fn find_language(
        &self,
        language: String,
    ) -> BoxFuture<'static, StorageResult<Option<LanguageVolumeEntity>>> {
        done(self.inner.languages.get(&language).map(|entry| entry.clone()))
    }

    fn list_languages(&self) -> BoxFuture<'static, StorageResult<Vec<LanguageVolumeEntity>>> {
        let mut languages: Vec<LanguageVolumeEntity> = self
            .inner
            .languages
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        languages.sort_by(|a, b| a.language.cmp(&b.language));
        done(languages)
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.sessions.insert(session.id, session);
        done(())
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        done(self.inner.sessions.get(&id).map(|entry| entry.clone()))
    }

    fn find_session_by_slug(
        &self,
        slug: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        done(
            self.inner
                .sessions
                .iter()
                .find(|entry| entry.share_slug.as_deref() == Some(slug.as_str()))
                .map(|entry| entry.value().clone()),
        )
    }

    fn save_user_stats(&self, stats: UserStatsEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner
            .user_stats
            .insert(user_stats_key(&stats.user_id, &stats.language), stats);
        done(())
    }

    fn find_user_stats(
        &self,
        user_id: String,
        language: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserStatsEntity>>> {
        let key = user_stats_key(&user_id, &language);
        done(self.inner.user_stats.get(&key).map(|entry| entry.clone()))
    }

    fn list_user_stats(
        &self,
        language: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<UserStatsEntity>>> {
        done(
            self.inner
                .user_stats
                .iter()
                .filter(|entry| language.as_deref().is_none_or(|l| entry.language == l))
                .map(|entry| entry.value().clone())
                .collect(),
        )
    }

    fn list_user_stats_for_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserStatsEntity>>> {
        done(
            self.inner
                .user_stats
                .iter()
                .filter(|entry| entry.user_id == user_id)
                .map(|entry| entry.value().clone())
                .collect(),
        )
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.users.insert(user.id.clone(), user);
        done(())
    }

    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        done(self.inner.users.get(&id).map(|entry| entry.clone()))
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let mut users: Vec<UserEntity> = self
            .inner
            .users
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        done(users)
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        done(())
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        done(())
    }
}
