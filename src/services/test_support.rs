//! Fixtures shared by service tests.

use std::{
    sync::{Arc, Mutex},
    time::SystemTime,
};

use futures::future::{BoxFuture, ready};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{
        content_store::{ContentStore, memory::MemoryContentStore},
        models::{
            Difficulty, LanguageStatus, LanguageVolumeEntity, Role, SnippetEntity, UserEntity,
        },
    },
    services::completion::{CompletionClient, CompletionError},
    state::{AppState, SharedState},
};

/// Completion client replaying a canned answer and recording the prompts it saw.
#[derive(Clone, Default)]
pub struct StubCompletion {
    pub reply: Option<String>,
    pub prompts: Arc<Mutex<Vec<(String, String)>>>,
}

impl StubCompletion {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            prompts: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<(String, String)> {
        self.prompts.lock().unwrap().clone()
    }
}

impl CompletionClient for StubCompletion {
    fn complete(
        &self,
        system: String,
        user: String,
    ) -> BoxFuture<'static, Result<String, CompletionError>> {
        self.prompts.lock().unwrap().push((system, user));
        Box::pin(ready(self.reply.clone().ok_or(CompletionError::Empty)))
    }
}

pub async fn state_with(
    completion: Option<StubCompletion>,
) -> (SharedState, MemoryContentStore) {
    let store = MemoryContentStore::new();
    let completion = completion.map(|stub| Arc::new(stub) as Arc<dyn CompletionClient>);
    let state = AppState::new(AppConfig::default(), completion);
    state.set_content_store(Arc::new(store.clone())).await;
    (state, store)
}

pub async fn add_language(store: &MemoryContentStore, language: &str, status: LanguageStatus) {
    store
        .save_language(LanguageVolumeEntity {
            language: language.into(),
            current_volume: 1,
            snippet_count: 0,
            ai_generated_count: 0,
            last_generated_at: None,
            status,
        })
        .await
        .unwrap();
}

pub async fn add_snippet(
    store: &MemoryContentStore,
    language: &str,
    volume: u32,
    difficulty: Difficulty,
    is_valid: bool,
) -> SnippetEntity {
    let now = SystemTime::now();
    let snippet = SnippetEntity {
        id: Uuid::new_v4(),
        language: language.into(),
        volume,
        difficulty,
        code: format!("// {language} snippet"),
        is_valid,
        explanation: if is_valid { "fine" } else { "off by one" }.into(),
        tags: vec![],
        ai_generated: false,
        created_at: now,
        updated_at: now,
    };
    store.save_snippet(snippet.clone()).await.unwrap();
    snippet
}

pub async fn add_user(store: &MemoryContentStore, id: &str, role: Role) {
    store
        .save_user(UserEntity {
            id: id.into(),
            display_name: id.to_uppercase(),
            role,
            total_games: 0,
            average_score: 0.0,
            created_at: SystemTime::now(),
        })
        .await
        .unwrap();
}
