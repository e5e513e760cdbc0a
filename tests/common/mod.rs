#![allow(dead_code)]

use std::{sync::Arc, time::SystemTime};

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use futures::future::{BoxFuture, ready};
use http_body_util::BodyExt;
use merge_or_reject::{
    build_router,
    config::AppConfig,
    dao::{
        content_store::{ContentStore, memory::MemoryContentStore},
        models::{Difficulty, LanguageStatus, LanguageVolumeEntity, Role, SnippetEntity, UserEntity},
    },
    services::completion::{CompletionClient, CompletionError},
    state::{AppState, SharedState},
};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

pub struct CannedCompletion(pub String);

impl CompletionClient for CannedCompletion {
    fn complete(
        &self,
        _system: String,
        _user: String,
    ) -> BoxFuture<'static, Result<String, CompletionError>> {
        Box::pin(ready(Ok(self.0.clone())))
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: SharedState,
    pub store: MemoryContentStore,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_completion(None).await
    }

    pub async fn with_completion(completion: Option<Arc<dyn CompletionClient>>) -> Self {
        let store = MemoryContentStore::new();
        let state = AppState::new(AppConfig::default(), completion);
        state.set_content_store(Arc::new(store.clone())).await;
        Self {
            router: build_router(state.clone()),
            state,
            store,
        }
    }

    /// Send a request and return the status with the decoded JSON body (`Null` when empty).
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        user: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body {}", String::from_utf8_lossy(&bytes))
            })
        };
        (status, json)
    }

    pub async fn add_language(&self, language: &str) {
        self.store
            .save_language(LanguageVolumeEntity {
                language: language.into(),
                current_volume: 1,
                snippet_count: 0,
                ai_generated_count: 0,
                last_generated_at: None,
                status: LanguageStatus::Active,
            })
            .await
            .unwrap();
    }

    pub async fn add_snippet(&self, language: &str, difficulty: Difficulty, is_valid: bool) -> Uuid {
        let now = SystemTime::now();
        let id = Uuid::new_v4();
        self.store
            .save_snippet(SnippetEntity {
                id,
                language: language.into(),
                volume: 1,
                difficulty,
                code: "console.log(1)".into(),
                is_valid,
                explanation: "because".into(),
                tags: vec!["io".into()],
                ai_generated: false,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();
        id
    }

    pub async fn add_user(&self, id: &str, role: Role) {
        self.store
            .save_user(UserEntity {
                id: id.into(),
                display_name: format!("{id} name"),
                role,
                total_games: 0,
                average_score: 0.0,
                created_at: SystemTime::now(),
            })
            .await
            .unwrap();
    }

    pub async fn answer_key(&self, session_id: Uuid) -> Vec<bool> {
        self.store
            .find_session(session_id)
            .await
            .unwrap()
            .unwrap()
            .answer_key
    }
}
