#[cfg(feature = "couch-store")]
pub mod couchdb;
pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{
    LanguageVolumeEntity, SessionEntity, SnippetEntity, SnippetFilter, UserEntity,
    UserStatsEntity,
};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for snippets, languages, sessions,
/// statistics and users.
///
/// Every `save_*` call is an upsert keyed by the entity's natural key.
pub trait ContentStore: Send + Sync {
    fn save_snippet(&self, snippet: SnippetEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_snippet(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SnippetEntity>>>;
    fn delete_snippet(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>>;
    fn list_snippets(
        &self,
        filter: SnippetFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SnippetEntity>>>;

    fn save_language(&self, language: LanguageVolumeEntity)
    -> BoxFuture<'static, StorageResult<()>>;
    fn find_language(
        &self,
        language: String,
    ) -> BoxFuture<'static, StorageResult<Option<LanguageVolumeEntity>>>;
    fn list_languages(&self) -> BoxFuture<'static, StorageResult<Vec<LanguageVolumeEntity>>>;

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    fn find_session_by_slug(
        &self,
        slug: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;

    fn save_user_stats(&self, stats: UserStatsEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_user_stats(
        &self,
        user_id: String,
        language: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserStatsEntity>>>;
    /// List statistics rows for one language, or for every language when `None`.
    fn list_user_stats(
        &self,
        language: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<UserStatsEntity>>>;
    fn list_user_stats_for_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserStatsEntity>>>;

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;
    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;
    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>>;

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
