use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        LANGUAGE_COLLECTION_NAME, MongoLanguageDocument, MongoSessionDocument,
        MongoSnippetDocument, MongoUserDocument, MongoUserStatsDocument, SESSION_COLLECTION_NAME,
        SNIPPET_COLLECTION_NAME, USER_COLLECTION_NAME, USER_STATS_COLLECTION_NAME, doc_id,
    },
};
use crate::dao::{
    content_store::ContentStore,
    models::{
        LanguageVolumeEntity, SessionEntity, SnippetEntity, SnippetFilter, UserEntity,
        UserStatsEntity, user_stats_key,
    },
    storage::StorageResult,
};

/// MongoDB-backed [`ContentStore`] implementation.
#[derive(Clone)]
pub struct MongoContentStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoContentStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let indexes: [(&'static str, &'static str, Document); 3] = [
            (
                SNIPPET_COLLECTION_NAME,
                "snippet_selection_idx",
                doc! {"language": 1, "volume": 1, "difficulty": 1},
            ),
            (
                SESSION_COLLECTION_NAME,
                "session_slug_idx",
                doc! {"share_slug": 1},
            ),
            (
                USER_STATS_COLLECTION_NAME,
                "user_stats_language_idx",
                doc! {"language": 1, "highest_score": -1},
            ),
        ];

        let database = self.database().await;
        for (collection, name, keys) in indexes {
            let model = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(name.to_owned()))
                        .build(),
                )
                .build();

            database
                .collection::<Document>(collection)
                .create_index(model)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection,
                    index: name,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn collection<T>(&self, name: &str) -> Collection<T>
    where
        T: Send + Sync,
    {
        self.database().await.collection::<T>(name)
    }

    async fn upsert<T>(&self, collection: &'static str, id: String, document: &T) -> MongoResult<()>
    where
        T: Serialize + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .replace_one(doc_id(id.clone()), document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Save {
                collection,
                id,
                source,
            })?;
        Ok(())
    }

    async fn find_one<T>(&self, collection: &'static str, filter: Document) -> MongoResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .find_one(filter)
            .await
            .map_err(|source| MongoDaoError::load(collection, source))
    }

    async fn find_many<T>(
        &self,
        collection: &'static str,
        filter: Document,
        sort: Document,
    ) -> MongoResult<Vec<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        self.collection::<T>(collection)
            .await
            .find(filter)
            .sort(sort)
            .await
            .map_err(|source| MongoDaoError::load(collection, source))?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::load(collection, source))
    }

    async fn delete(&self, collection: &'static str, id: String) -> MongoResult<bool> {
        let result = self
            .collection::<Document>(collection)
            .await
            .delete_one(doc_id(id.clone()))
            .await
            .map_err(|source| MongoDaoError::Delete {
                collection,
                id,
                source,
            })?;
        Ok(result.deleted_count > 0)
    }

    async fn list_snippets(&self, filter: SnippetFilter) -> MongoResult<Vec<SnippetEntity>> {
        let documents: Vec<MongoSnippetDocument> = self
            .find_many(
                SNIPPET_COLLECTION_NAME,
                snippet_query(&filter),
                doc! {"created_at": 1},
            )
            .await?;
        documents.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_session(&self, filter: Document) -> MongoResult<Option<SessionEntity>> {
        let document: Option<MongoSessionDocument> =
            self.find_one(SESSION_COLLECTION_NAME, filter).await?;
        document.map(TryInto::try_into).transpose()
    }
}

fn snippet_query(filter: &SnippetFilter) -> Document {
    let mut query = Document::new();
    if let Some(language) = &filter.language {
        query.insert("language", language.as_str());
    }
    if let Some(volume) = filter.volume {
        query.insert("volume", i64::from(volume));
    }
    if let Some(difficulty) = filter.difficulty {
        query.insert("difficulty", difficulty.as_str());
    }
    query
}

impl ContentStore for MongoContentStore {
    fn save_snippet(&self, snippet: SnippetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document: MongoSnippetDocument = snippet.into();
            store
                .upsert(SNIPPET_COLLECTION_NAME, document.id.clone(), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_snippet(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SnippetEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoSnippetDocument> = store
                .find_one(SNIPPET_COLLECTION_NAME, doc_id(id.to_string()))
                .await?;
            Ok(document.map(TryInto::try_into).transpose()?)
        })
    }

    fn delete_snippet(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete(SNIPPET_COLLECTION_NAME, id.to_string())
                .await
                .map_err(Into::into)
        })
    }

    fn list_snippets(
        &self,
        filter: SnippetFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SnippetEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_snippets(filter).await.map_err(Into::into) })
    }

    fn save_language(
        &self,
        language: LanguageVolumeEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document: MongoLanguageDocument = language.into();
            store
                .upsert(LANGUAGE_COLLECTION_NAME, document.language.clone(), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_language(
        &self,
        language: String,
    ) -> BoxFuture<'static, StorageResult<Option<LanguageVolumeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoLanguageDocument> = store
                .find_one(LANGUAGE_COLLECTION_NAME, doc_id(language))
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_languages(&self) -> BoxFuture<'static, StorageResult<Vec<LanguageVolumeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoLanguageDocument> = store
                .find_many(LANGUAGE_COLLECTION_NAME, doc! {}, doc! {"_id": 1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document: MongoSessionDocument = session.into();
            store
                .upsert(SESSION_COLLECTION_NAME, document.id.clone(), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_session(doc_id(id.to_string()))
                .await
                .map_err(Into::into)
        })
    }

    fn find_session_by_slug(
        &self,
        slug: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_session(doc! {"share_slug": slug})
                .await
                .map_err(Into::into)
        })
    }

    fn save_user_stats(&self, stats: UserStatsEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document: MongoUserStatsDocument = stats.into();
            store
                .upsert(USER_STATS_COLLECTION_NAME, document.id.clone(), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_user_stats(
        &self,
        user_id: String,
        language: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoUserStatsDocument> = store
                .find_one(
                    USER_STATS_COLLECTION_NAME,
                    doc_id(user_stats_key(&user_id, &language)),
                )
                .await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_user_stats(
        &self,
        language: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<UserStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let filter = match language {
                Some(language) => doc! {"language": language},
                None => doc! {},
            };
            let documents: Vec<MongoUserStatsDocument> = store
                .find_many(USER_STATS_COLLECTION_NAME, filter, doc! {"_id": 1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn list_user_stats_for_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoUserStatsDocument> = store
                .find_many(
                    USER_STATS_COLLECTION_NAME,
                    doc! {"user_id": user_id},
                    doc! {"language": 1},
                )
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let document: MongoUserDocument = user.into();
            store
                .upsert(USER_COLLECTION_NAME, document.id.clone(), &document)
                .await
                .map_err(Into::into)
        })
    }

    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document: Option<MongoUserDocument> =
                store.find_one(USER_COLLECTION_NAME, doc_id(id)).await?;
            Ok(document.map(Into::into))
        })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoUserDocument> = store
                .find_many(USER_COLLECTION_NAME, doc! {}, doc! {"_id": 1})
                .await?;
            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
