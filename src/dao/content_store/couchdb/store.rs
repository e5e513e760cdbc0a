use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::dao::{
    content_store::ContentStore,
    models::{
        LanguageVolumeEntity, SessionEntity, SnippetEntity, SnippetFilter, UserEntity,
        UserStatsEntity,
    },
    storage::StorageResult,
};

use super::{
    config::CouchConfig,
    error::{CouchDaoError, CouchResult},
    models::{
        AllDocsResponse, CouchDocument, END_SUFFIX, FindResponse, INDEXES, LANGUAGE_PREFIX,
        SESSION_PREFIX, SNIPPET_PREFIX, USER_PREFIX, USER_STATS_PREFIX, language_doc_id,
        prefix_selector, session_doc_id, snippet_doc_id, user_doc_id, user_stats_doc_id,
    },
};

const ALL_DOCS: &str = "_all_docs";
const FIND: &str = "_find";
const INDEX: &str = "_index";
const FIND_PAGE_SIZE: usize = 200;

/// CouchDB-backed [`ContentStore`] talking to the HTTP document API.
#[derive(Clone)]
pub struct CouchContentStore {
    client: Client,
    database_url: Url,
    database: Arc<str>,
    auth: Option<(Arc<str>, Arc<str>)>,
}

#[derive(Debug, Deserialize)]
struct Revision {
    #[serde(rename = "_rev")]
    rev: Option<String>,
}

impl CouchContentStore {
    /// Build the client and database URL without touching the network.
    pub fn new(config: CouchConfig) -> CouchResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CouchDaoError::ClientBuilder { source })?;

        let invalid = || CouchDaoError::InvalidBaseUrl {
            url: config.base_url.clone(),
        };
        let mut database_url = Url::parse(&config.base_url).map_err(|_| invalid())?;
        if !matches!(database_url.scheme(), "http" | "https") {
            return Err(invalid());
        }
        database_url
            .path_segments_mut()
            .map_err(|()| invalid())?
            .pop_if_empty()
            .push(&config.database);

        let auth = config
            .username
            .zip(config.password)
            .map(|(u, p)| (Arc::<str>::from(u), Arc::<str>::from(p)));

        Ok(Self {
            client,
            database_url,
            database: Arc::from(config.database),
            auth,
        })
    }

    /// Build the store, then make sure the database and its query indexes exist.
    pub async fn connect(config: CouchConfig) -> CouchResult<Self> {
        let store = Self::new(config)?;
        store.ensure_database().await?;
        store.ensure_indexes().await?;
        Ok(store)
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.auth {
            Some((ref user, ref pass)) => builder.basic_auth(user.as_ref(), Some(pass.as_ref())),
            None => builder,
        }
    }

    /// URL of one document or endpoint; `segment` is percent-encoded as a single path segment.
    fn url(&self, segment: &str) -> Url {
        let mut url = self.database_url.clone();
        // `new` rejects cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(segment);
        }
        url
    }

    fn request(&self, method: Method, segment: &str) -> reqwest::RequestBuilder {
        self.with_auth(self.client.request(method, self.url(segment)))
    }

    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        path: &str,
    ) -> CouchResult<Response> {
        builder
            .send()
            .await
            .map_err(|source| CouchDaoError::RequestSend {
                path: path.to_string(),
                source,
            })
    }

    async fn ensure_database(&self) -> CouchResult<()> {
        let database = self.database.to_string();
        let url = self.database_url.clone();

        let response = self
            .send(self.with_auth(self.client.get(url.clone())), &database)
            .await?;

        match response.status() {
            StatusCode::OK => Ok(()),
            StatusCode::NOT_FOUND => {
                let create = self
                    .send(self.with_auth(self.client.put(url)), &database)
                    .await?;
                if create.status().is_success() {
                    Ok(())
                } else {
                    Err(CouchDaoError::Database {
                        database,
                        status: create.status(),
                    })
                }
            }
            other => Err(CouchDaoError::Database {
                database,
                status: other,
            }),
        }
    }

    /// Create the Mango indexes backing slug lookups and snippet pool queries.
    /// CouchDB answers 200 when an index already exists.
    async fn ensure_indexes(&self) -> CouchResult<()> {
        for index in INDEXES {
            let body = json!({
                "index": { "fields": index.fields },
                "name": index.name,
                "type": "json",
            });
            let response = self
                .send(self.request(Method::POST, INDEX).json(&body), INDEX)
                .await?;
            if !response.status().is_success() {
                return Err(CouchDaoError::EnsureIndex {
                    index: index.name,
                    status: response.status(),
                });
            }
        }
        Ok(())
    }

    async fn get_document<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        let response = self.send(self.request(Method::GET, doc_id), doc_id).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => read_json(doc_id, response).await.map(Some),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    async fn get_body<T>(&self, doc_id: &str) -> CouchResult<Option<T>>
    where
        T: DeserializeOwned,
    {
        Ok(self
            .get_document::<CouchDocument<T>>(doc_id)
            .await?
            .map(|document| document.body))
    }

    /// Insert or replace the document, carrying over the current revision.
    async fn upsert<T>(&self, doc_id: String, body: T) -> CouchResult<()>
    where
        T: Serialize,
    {
        let mut document = CouchDocument::new(doc_id, body);
        if let Some(existing) = self.get_document::<Revision>(&document.id).await? {
            document.rev = existing.rev;
        }

        let response = self
            .send(
                self.request(Method::PUT, &document.id).json(&document),
                &document.id,
            )
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(CouchDaoError::RequestStatus {
                path: document.id,
                status: response.status(),
            })
        }
    }

    async fn delete_document(&self, doc_id: &str) -> CouchResult<bool> {
        let Some(Revision { rev: Some(rev) }) = self.get_document::<Revision>(doc_id).await? else {
            return Ok(false);
        };

        let response = self
            .send(
                self.request(Method::DELETE, doc_id).query(&[("rev", rev)]),
                doc_id,
            )
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            other => Err(CouchDaoError::RequestStatus {
                path: doc_id.to_string(),
                status: other,
            }),
        }
    }

    /// Every document whose id starts with `prefix`, in id order.
    async fn list_documents<T>(&self, prefix: &str) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let query = [
            ("include_docs", "true".to_string()),
            ("startkey", format!("\"{}\"", prefix)),
            ("endkey", format!("\"{}{}\"", prefix, END_SUFFIX)),
        ];

        let response = self
            .send(self.request(Method::GET, ALL_DOCS).query(&query), ALL_DOCS)
            .await?;
        if !response.status().is_success() {
            return Err(CouchDaoError::RequestStatus {
                path: ALL_DOCS.to_string(),
                status: response.status(),
            });
        }

        let payload: AllDocsResponse = read_json(ALL_DOCS, response).await?;
        payload
            .rows
            .into_iter()
            .filter_map(|row| row.doc)
            .map(|doc| decode_value::<CouchDocument<T>>(ALL_DOCS, doc).map(|parsed| parsed.body))
            .collect()
    }

    /// Run a Mango query, following bookmarks until every match is read.
    async fn find_documents<T>(&self, selector: Value) -> CouchResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut documents = Vec::new();
        let mut bookmark: Option<String> = None;

        loop {
            let mut body = json!({ "selector": selector, "limit": FIND_PAGE_SIZE });
            if let Some(bookmark) = &bookmark {
                body["bookmark"] = json!(bookmark);
            }

            let response = self
                .send(self.request(Method::POST, FIND).json(&body), FIND)
                .await?;
            if !response.status().is_success() {
                return Err(CouchDaoError::RequestStatus {
                    path: FIND.to_string(),
                    status: response.status(),
                });
            }

            let page: FindResponse = read_json(FIND, response).await?;
            let fetched = page.docs.len();
            for doc in page.docs {
                documents.push(decode_value::<CouchDocument<T>>(FIND, doc)?.body);
            }

            match page.bookmark {
                Some(next) if fetched == FIND_PAGE_SIZE => bookmark = Some(next),
                _ => break,
            }
        }

        Ok(documents)
    }
}

/// Read the whole body first so a broken connection and a malformed document stay distinct.
async fn read_json<T>(path: &str, response: Response) -> CouchResult<T>
where
    T: DeserializeOwned,
{
    let bytes = response
        .bytes()
        .await
        .map_err(|source| CouchDaoError::ReadBody {
            path: path.to_string(),
            source,
        })?;
    decode_body(path, &bytes)
}

fn decode_body<T>(path: &str, bytes: &[u8]) -> CouchResult<T>
where
    T: DeserializeOwned,
{
    serde_json::from_slice(bytes).map_err(|source| CouchDaoError::DecodeDocument {
        path: path.to_string(),
        source,
    })
}

fn decode_value<T>(path: &str, value: Value) -> CouchResult<T>
where
    T: DeserializeOwned,
{
    serde_json::from_value(value).map_err(|source| CouchDaoError::DecodeDocument {
        path: path.to_string(),
        source,
    })
}

fn snippet_selector(filter: &SnippetFilter) -> Value {
    let mut selector = prefix_selector(SNIPPET_PREFIX);
    if let Some(language) = &filter.language {
        selector["language"] = json!(language);
    }
    if let Some(volume) = filter.volume {
        selector["volume"] = json!(volume);
    }
    if let Some(difficulty) = filter.difficulty {
        selector["difficulty"] = json!(difficulty);
    }
    selector
}

impl ContentStore for CouchContentStore {
    fn save_snippet(&self, snippet: SnippetEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(snippet_doc_id(snippet.id), snippet)
                .await
                .map_err(Into::into)
        })
    }

    fn find_snippet(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SnippetEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .get_body(&snippet_doc_id(id))
                .await
                .map_err(Into::into)
        })
    }

    fn delete_snippet(&self, id: Uuid) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_document(&snippet_doc_id(id))
                .await
                .map_err(Into::into)
        })
    }

    fn list_snippets(
        &self,
        filter: SnippetFilter,
    ) -> BoxFuture<'static, StorageResult<Vec<SnippetEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut snippets = store
                .find_documents::<SnippetEntity>(snippet_selector(&filter))
                .await?;
            snippets.sort_by_key(|snippet| snippet.created_at);
            Ok(snippets)
        })
    }

    fn save_language(
        &self,
        language: LanguageVolumeEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(language_doc_id(&language.language), language)
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
            store
                .get_body(&language_doc_id(&language))
                .await
                .map_err(Into::into)
        })
    }

    fn list_languages(&self) -> BoxFuture<'static, StorageResult<Vec<LanguageVolumeEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .list_documents(LANGUAGE_PREFIX)
                .await
                .map_err(Into::into)
        })
    }

    fn save_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(session_doc_id(session.id), session)
                .await
                .map_err(Into::into)
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .get_body(&session_doc_id(id))
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
            let mut selector = prefix_selector(SESSION_PREFIX);
            selector["share_slug"] = json!(slug);
            let sessions = store.find_documents::<SessionEntity>(selector).await?;
            Ok(sessions.into_iter().next())
        })
    }

    fn save_user_stats(&self, stats: UserStatsEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(user_stats_doc_id(&stats.user_id, &stats.language), stats)
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
            store
                .get_body(&user_stats_doc_id(&user_id, &language))
                .await
                .map_err(Into::into)
        })
    }

    fn list_user_stats(
        &self,
        language: Option<String>,
    ) -> BoxFuture<'static, StorageResult<Vec<UserStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut selector = prefix_selector(USER_STATS_PREFIX);
            if let Some(language) = language {
                selector["language"] = json!(language);
            }
            store
                .find_documents::<UserStatsEntity>(selector)
                .await
                .map_err(Into::into)
        })
    }

    fn list_user_stats_for_user(
        &self,
        user_id: String,
    ) -> BoxFuture<'static, StorageResult<Vec<UserStatsEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let prefix = format!("{USER_STATS_PREFIX}{user_id}:");
            let mut stats = store.list_documents::<UserStatsEntity>(&prefix).await?;
            stats.retain(|row| row.user_id == user_id);
            Ok(stats)
        })
    }

    fn save_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .upsert(user_doc_id(&user.id), user)
                .await
                .map_err(Into::into)
        })
    }

    fn find_user(&self, id: String) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.get_body(&user_doc_id(&id)).await.map_err(Into::into) })
    }

    fn list_users(&self) -> BoxFuture<'static, StorageResult<Vec<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_documents(USER_PREFIX).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let url = store.database_url.clone();
            let response = store
                .send(store.with_auth(store.client.get(url.clone())), url.as_str())
                .await?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(CouchDaoError::RequestStatus {
                    path: url.to_string(),
                    status: response.status(),
                }
                .into())
            }
        })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.ensure_database().await?;
            store.ensure_indexes().await.map_err(Into::into)
        })
    }
}
