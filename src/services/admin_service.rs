//! Business logic powering the admin REST routes: snippet curation, the
//! language catalogue and user roles. Callers have already been checked for
//! the admin role by the route middleware.

use std::{sync::Arc, time::SystemTime};

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        content_store::ContentStore,
        models::{LanguageStatus, LanguageVolumeEntity, SnippetEntity, SnippetFilter},
    },
    dto::{
        admin::{
            CreateLanguageRequest, CreateSnippetRequest, LanguageResponse, SetLanguageStatusRequest,
            SetRoleRequest, SnippetQuery, SnippetResponse, UpdateSnippetRequest,
        },
        public::UserSummary,
    },
    error::ServiceError,
    state::SharedState,
};

async fn load_language(
    store: &Arc<dyn ContentStore>,
    language: &str,
) -> Result<LanguageVolumeEntity, ServiceError> {
    store
        .find_language(language.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("language `{language}`")))
}

async fn load_snippet(
    store: &Arc<dyn ContentStore>,
    id: Uuid,
) -> Result<SnippetEntity, ServiceError> {
    store
        .find_snippet(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("snippet `{id}`")))
}

/// List snippets matching the optional filters.
pub async fn list_snippets(
    state: &SharedState,
    query: SnippetQuery,
) -> Result<Vec<SnippetResponse>, ServiceError> {
    let store = state.require_store().await?;
    let snippets = store
        .list_snippets(SnippetFilter {
            language: query.language,
            volume: query.volume,
            difficulty: query.difficulty,
        })
        .await?;
    Ok(snippets.into_iter().map(SnippetResponse::from).collect())
}

pub async fn get_snippet(state: &SharedState, id: Uuid) -> Result<SnippetResponse, ServiceError> {
    let store = state.require_store().await?;
    Ok(load_snippet(&store, id).await?.into())
}

/// Store a hand-written snippet. Inserting into the current volume bumps its counter.
pub async fn create_snippet(
    state: &SharedState,
    request: CreateSnippetRequest,
) -> Result<SnippetResponse, ServiceError> {
    let store = state.require_store().await?;
    let mut language = load_language(&store, &request.language).await?;
    let volume = request.volume.unwrap_or(language.current_volume);
    if volume > language.current_volume {
        return Err(ServiceError::InvalidInput(format!(
            "volume {volume} is ahead of current volume {}",
            language.current_volume
        )));
    }

    let now = SystemTime::now();
    let snippet = SnippetEntity {
        id: Uuid::new_v4(),
        language: language.language.clone(),
        volume,
        difficulty: request.difficulty,
        code: request.code,
        is_valid: request.is_valid,
        explanation: request.explanation,
        tags: request.tags,
        ai_generated: false,
        created_at: now,
        updated_at: now,
    };
    store.save_snippet(snippet.clone()).await?;

    if volume == language.current_volume {
        language.snippet_count += 1;
        store.save_language(language).await?;
    }

    info!(snippet_id = %snippet.id, language = %snippet.language, volume, "snippet created");
    Ok(snippet.into())
}

/// Apply a partial update. Sessions already started keep their captured answer key.
pub async fn update_snippet(
    state: &SharedState,
    id: Uuid,
    request: UpdateSnippetRequest,
) -> Result<SnippetResponse, ServiceError> {
    let store = state.require_store().await?;
    let mut snippet = load_snippet(&store, id).await?;

    if let Some(code) = request.code {
        snippet.code = code;
    }
    if let Some(is_valid) = request.is_valid {
        snippet.is_valid = is_valid;
    }
    if let Some(explanation) = request.explanation {
        snippet.explanation = explanation;
    }
    if let Some(tags) = request.tags {
        snippet.tags = tags;
    }
    if let Some(difficulty) = request.difficulty {
        snippet.difficulty = difficulty;
    }
    snippet.updated_at = SystemTime::now();

    store.save_snippet(snippet.clone()).await?;
    debug!(snippet_id = %id, "snippet updated");
    Ok(snippet.into())
}

/// Delete a snippet, decrementing the counters of its language when it belongs to the current volume.
pub async fn delete_snippet(state: &SharedState, id: Uuid) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let snippet = load_snippet(&store, id).await?;

    if !store.delete_snippet(id).await? {
        return Err(ServiceError::NotFound(format!("snippet `{id}`")));
    }

    if let Some(mut language) = store.find_language(snippet.language.clone()).await?
        && language.current_volume == snippet.volume
    {
        language.snippet_count = language.snippet_count.saturating_sub(1);
        if snippet.ai_generated {
            language.ai_generated_count = language.ai_generated_count.saturating_sub(1);
        }
        store.save_language(language).await?;
    }

    info!(snippet_id = %id, language = %snippet.language, "snippet deleted");
    Ok(())
}

pub async fn list_languages(state: &SharedState) -> Result<Vec<LanguageResponse>, ServiceError> {
    let store = state.require_store().await?;
    let languages = store.list_languages().await?;
    Ok(languages.into_iter().map(LanguageResponse::from).collect())
}

/// Register a language at volume 1, active.
pub async fn create_language(
    state: &SharedState,
    request: CreateLanguageRequest,
) -> Result<LanguageResponse, ServiceError> {
    let store = state.require_store().await?;
    if store.find_language(request.language.clone()).await?.is_some() {
        return Err(ServiceError::InvalidState(format!(
            "language `{}` already exists",
            request.language
        )));
    }

    let language = LanguageVolumeEntity {
        language: request.language,
        current_volume: 1,
        snippet_count: 0,
        ai_generated_count: 0,
        last_generated_at: None,
        status: LanguageStatus::Active,
    };
    store.save_language(language.clone()).await?;
    info!(language = %language.language, "language created");
    Ok(language.into())
}

pub async fn set_language_status(
    state: &SharedState,
    language: String,
    request: SetLanguageStatusRequest,
) -> Result<LanguageResponse, ServiceError> {
    let store = state.require_store().await?;
    let mut entity = load_language(&store, &language).await?;
    entity.status = request.status;
    store.save_language(entity.clone()).await?;
    info!(language = %language, status = ?request.status, "language status changed");
    Ok(entity.into())
}

/// Move the language to a fresh volume with zeroed counters.
pub async fn bump_volume(
    state: &SharedState,
    language: String,
) -> Result<LanguageResponse, ServiceError> {
    let store = state.require_store().await?;
    let mut entity = load_language(&store, &language).await?;
    entity.current_volume += 1;
    entity.snippet_count = 0;
    entity.ai_generated_count = 0;
    store.save_language(entity.clone()).await?;
    info!(language = %language, volume = entity.current_volume, "volume bumped");
    Ok(entity.into())
}

/// Recompute the counters from the snippets of the current volume.
pub async fn recount_language(
    state: &SharedState,
    language: String,
) -> Result<LanguageResponse, ServiceError> {
    let store = state.require_store().await?;
    let mut entity = load_language(&store, &language).await?;
    let snippets = store
        .list_snippets(SnippetFilter {
            language: Some(entity.language.clone()),
            volume: Some(entity.current_volume),
            difficulty: None,
        })
        .await?;

    entity.snippet_count = snippets.len() as u32;
    entity.ai_generated_count = snippets
        .iter()
        .filter(|snippet| snippet.ai_generated)
        .count() as u32;
    store.save_language(entity.clone()).await?;
    info!(
        language = %language,
        snippet_count = entity.snippet_count,
        ai_generated_count = entity.ai_generated_count,
        "language counters recomputed"
    );
    Ok(entity.into())
}

pub async fn list_users(state: &SharedState) -> Result<Vec<UserSummary>, ServiceError> {
    let store = state.require_store().await?;
    let users = store.list_users().await?;
    Ok(users.into_iter().map(UserSummary::from).collect())
}

pub async fn set_user_role(
    state: &SharedState,
    user_id: String,
    request: SetRoleRequest,
) -> Result<UserSummary, ServiceError> {
    let store = state.require_store().await?;
    let mut user = store
        .find_user(user_id.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("user `{user_id}`")))?;
    user.role = request.role;
    store.save_user(user.clone()).await?;
    info!(user_id = %user_id, role = ?request.role, "user role changed");
    Ok(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::{Difficulty, Role},
        services::test_support::{add_language, add_snippet, add_user, state_with},
    };

    fn manual_snippet(language: &str) -> CreateSnippetRequest {
        CreateSnippetRequest {
            language: language.into(),
            volume: None,
            difficulty: Difficulty::Hard,
            code: "fn f() {}".into(),
            is_valid: true,
            explanation: "ok".into(),
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn snippet_crud_tracks_counters() {
        let (state, store) = state_with(None).await;
        add_language(&store, "rust", LanguageStatus::Active).await;

        let created = create_snippet(&state, manual_snippet("rust")).await.unwrap();
        assert!(!created.ai_generated);
        assert_eq!(created.volume, 1);
        assert_eq!(
            store
                .find_language("rust".into())
                .await
                .unwrap()
                .unwrap()
                .snippet_count,
            1
        );

        let updated = update_snippet(
            &state,
            created.id,
            UpdateSnippetRequest {
                is_valid: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!updated.is_valid);
        assert_eq!(updated.code, "fn f() {}");

        delete_snippet(&state, created.id).await.unwrap();
        assert!(matches!(
            get_snippet(&state, created.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert_eq!(
            store
                .find_language("rust".into())
                .await
                .unwrap()
                .unwrap()
                .snippet_count,
            0
        );
    }

    #[tokio::test]
    async fn unknown_language_rejects_manual_snippets() {
        let (state, _store) = state_with(None).await;
        let result = create_snippet(&state, manual_snippet("cobol")).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn language_lifecycle() {
        let (state, store) = state_with(None).await;
        let created = create_language(
            &state,
            CreateLanguageRequest {
                language: "kotlin".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.current_volume, 1);
        assert_eq!(created.status, LanguageStatus::Active);

        let duplicate = create_language(
            &state,
            CreateLanguageRequest {
                language: "kotlin".into(),
            },
        )
        .await;
        assert!(matches!(duplicate, Err(ServiceError::InvalidState(_))));

        add_snippet(&store, "kotlin", 1, Difficulty::Easy, true).await;
        add_snippet(&store, "kotlin", 1, Difficulty::Hard, false).await;
        let recounted = recount_language(&state, "kotlin".into()).await.unwrap();
        assert_eq!(recounted.snippet_count, 2);
        assert_eq!(recounted.ai_generated_count, 0);

        let bumped = bump_volume(&state, "kotlin".into()).await.unwrap();
        assert_eq!(bumped.current_volume, 2);
        assert_eq!(bumped.snippet_count, 0);

        let paused = set_language_status(
            &state,
            "kotlin".into(),
            SetLanguageStatusRequest {
                status: LanguageStatus::Paused,
            },
        )
        .await
        .unwrap();
        assert_eq!(paused.status, LanguageStatus::Paused);
    }

    #[tokio::test]
    async fn roles_can_be_changed() {
        let (state, store) = state_with(None).await;
        add_user(&store, "ada", Role::User).await;

        let promoted = set_user_role(&state, "ada".into(), SetRoleRequest { role: Role::Admin })
            .await
            .unwrap();
        assert_eq!(promoted.role, Role::Admin);
        assert_eq!(list_users(&state).await.unwrap().len(), 1);

        let missing = set_user_role(&state, "ghost".into(), SetRoleRequest { role: Role::User }).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
