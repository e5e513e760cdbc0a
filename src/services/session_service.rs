use std::{sync::Arc, time::SystemTime};

use rand::seq::SliceRandom;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::{
        content_store::ContentStore,
        models::{Difficulty, LanguageStatus, SessionEntity, SnippetFilter},
    },
    dto::session::{
        FinalizeSessionResponse, SessionStateResponse, SharedResultResponse, SnippetCard,
        StartSessionRequest, StartSessionResponse, SubmitAnswerRequest, SubmitAnswerResponse,
    },
    error::ServiceError,
    services::{identity, stats_service},
    state::SharedState,
};

const MAX_SLUG_ATTEMPTS: usize = 5;

/// Start a session: draw the configured number of snippets at random for the
/// requested language, volume and level.
///
/// Nothing is written when the pool is too small.
pub async fn start_session(
    state: &SharedState,
    caller: Option<String>,
    request: StartSessionRequest,
) -> Result<StartSessionResponse, ServiceError> {
    let difficulty = Difficulty::from_level(request.level).ok_or_else(|| {
        ServiceError::InvalidInput(format!("level must be 1, 2 or 3 (got {})", request.level))
    })?;
    let store = state.require_store().await?;
    let user = identity::resolve_caller(&store, caller).await?;

    let language = store
        .find_language(request.language.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("language `{}`", request.language)))?;
    if language.status != LanguageStatus::Active {
        return Err(ServiceError::InvalidState(format!(
            "language `{}` is not active",
            language.language
        )));
    }

    let volume = request.volume.unwrap_or(language.current_volume);
    let level = state.config().level(difficulty);
    let wanted = level.snippet_count as usize;

    let mut candidates = store
        .list_snippets(SnippetFilter {
            language: Some(language.language.clone()),
            volume: Some(volume),
            difficulty: Some(difficulty),
        })
        .await?;
    if candidates.len() < wanted {
        return Err(ServiceError::InvalidState(format!(
            "not enough {} snippets for `{}` volume {volume}: need {wanted}, found {}",
            difficulty.as_str(),
            language.language,
            candidates.len()
        )));
    }

    candidates.shuffle(&mut rand::rng());
    candidates.truncate(wanted);

    let session = SessionEntity {
        id: Uuid::new_v4(),
        user_id: user.map(|user| user.id),
        language: language.language,
        level: difficulty.level(),
        difficulty,
        volume,
        snippet_ids: candidates.iter().map(|snippet| snippet.id).collect(),
        answer_key: candidates.iter().map(|snippet| snippet.is_valid).collect(),
        answers: Vec::new(),
        score: 0,
        time_limit_secs: level.time_limit_secs,
        created_at: SystemTime::now(),
        completed_at: None,
        share_slug: None,
        finalized_at: None,
    };
    store.save_session(session.clone()).await?;

    info!(
        session_id = %session.id,
        language = %session.language,
        level = session.level,
        volume,
        anonymous = session.user_id.is_none(),
        "session started"
    );

    Ok(StartSessionResponse {
        session_id: session.id,
        level: session.level,
        difficulty,
        volume,
        time_limit_secs: session.time_limit_secs,
        total: session.total(),
        snippets: candidates.iter().map(SnippetCard::from).collect(),
    })
}

async fn load_session(
    store: &Arc<dyn ContentStore>,
    session_id: Uuid,
) -> Result<SessionEntity, ServiceError> {
    store
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}`")))
}

/// Score a claim about the session's current snippet.
///
/// Completing the session updates the player's statistics before returning.
pub async fn submit_answer(
    state: &SharedState,
    session_id: Uuid,
    request: SubmitAnswerRequest,
) -> Result<SubmitAnswerResponse, ServiceError> {
    let store = state.require_store().await?;
    let mut session = load_session(&store, session_id).await?;

    let Some(snippet_id) = session.current_snippet() else {
        return Err(ServiceError::InvalidState("session is already over".into()));
    };
    let snippet = store
        .find_snippet(snippet_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("snippet `{snippet_id}`")))?;

    let recorded = session
        .record_answer(request.claim, SystemTime::now())
        .ok_or_else(|| ServiceError::InvalidState("session is already over".into()))?;
    store.save_session(session.clone()).await?;

    if recorded.completed {
        info!(
            session_id = %session.id,
            score = session.score,
            total = session.total(),
            "session completed"
        );
        stats_service::record_completed_session(&store, &session).await?;
    }

    Ok(SubmitAnswerResponse {
        snippet_id,
        correct: recorded.correct,
        is_valid: session.answer_key[recorded.index],
        explanation: snippet.explanation,
        score: session.score,
        answered: session.answers.len(),
        total: session.total(),
        game_over: recorded.completed,
    })
}

/// Current view of a session: the next card, or the final score once over.
pub async fn session_state(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionStateResponse, ServiceError> {
    let store = state.require_store().await?;
    let session = load_session(&store, session_id).await?;

    let Some(snippet_id) = session.current_snippet() else {
        return Ok(SessionStateResponse::Over {
            score: session.score,
            total: session.total(),
        });
    };
    let snippet = store
        .find_snippet(snippet_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("snippet `{snippet_id}`")))?;

    Ok(SessionStateResponse::InProgress {
        index: session.answers.len(),
        total: session.total(),
        score: session.score,
        snippet: SnippetCard::from(&snippet),
    })
}

/// Freeze the final score and assign a share slug. Idempotent once finalized.
pub async fn finalize_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<FinalizeSessionResponse, ServiceError> {
    let store = state.require_store().await?;
    let mut session = load_session(&store, session_id).await?;

    if !session.is_over() {
        return Err(ServiceError::InvalidState(format!(
            "session has {} of {} answers",
            session.answers.len(),
            session.total()
        )));
    }

    if let Some(slug) = session.share_slug.clone() {
        return Ok(FinalizeSessionResponse::from_session(&session, slug));
    }

    let score = session.recomputed_score();
    if score != session.score {
        warn!(
            session_id = %session.id,
            stored = session.score,
            recomputed = score,
            "stored score disagreed with answers; using recomputed score"
        );
        session.score = score;
    }

    let slug = unused_slug(&store, &session).await?;
    session.share_slug = Some(slug.clone());
    session.finalized_at = Some(SystemTime::now());
    store.save_session(session.clone()).await?;

    info!(session_id = %session.id, slug = %slug, score, "session finalized");
    Ok(FinalizeSessionResponse::from_session(&session, slug))
}

async fn unused_slug(
    store: &Arc<dyn ContentStore>,
    session: &SessionEntity,
) -> Result<String, ServiceError> {
    for _ in 0..MAX_SLUG_ATTEMPTS {
        let candidate = session.share_slug(&mut rand::rng());
        if store.find_session_by_slug(candidate.clone()).await?.is_none() {
            return Ok(candidate);
        }
    }
    warn!(session_id = %session.id, "share slug collisions exhausted retries");
    Err(ServiceError::InvalidState(
        "could not allocate a unique share slug".into(),
    ))
}

/// Public view of a finalized session.
pub async fn shared_result(
    state: &SharedState,
    slug: String,
) -> Result<SharedResultResponse, ServiceError> {
    let store = state.require_store().await?;
    let session = store
        .find_session_by_slug(slug.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("result `{slug}`")))?;

    let player = match session.user_id.clone() {
        Some(user_id) => store
            .find_user(user_id)
            .await?
            .map(|user| user.display_name),
        None => None,
    };

    Ok(SharedResultResponse::from_session(&session, slug, player))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dao::models::Role,
        services::test_support::{add_language, add_snippet, add_user, state_with},
    };

    fn start(language: &str, level: u8) -> StartSessionRequest {
        StartSessionRequest {
            language: language.into(),
            level,
            volume: None,
        }
    }

    #[tokio::test]
    async fn typescript_level_one_plays_to_completion() {
        let (state, store) = state_with(None).await;
        add_language(&store, "typescript", LanguageStatus::Active).await;
        add_user(&store, "ada", Role::User).await;
        for is_valid in [true, false, true] {
            add_snippet(&store, "typescript", 1, Difficulty::Easy, is_valid).await;
        }

        let started = start_session(&state, Some("ada".into()), start("typescript", 1))
            .await
            .unwrap();
        assert_eq!(started.total, 3);
        assert_eq!(started.difficulty, Difficulty::Easy);
        assert_eq!(started.time_limit_secs, 60);

        let session = store
            .find_session(started.session_id)
            .await
            .unwrap()
            .unwrap();
        // correct, incorrect, correct
        let claims = [
            session.answer_key[0],
            !session.answer_key[1],
            session.answer_key[2],
        ];

        let mut last = None;
        for (step, claim) in claims.into_iter().enumerate() {
            let response = submit_answer(&state, started.session_id, SubmitAnswerRequest { claim })
                .await
                .unwrap();
            assert_eq!(response.correct, step != 1);
            assert_eq!(response.game_over, step == 2);
            last = Some(response);
        }
        assert_eq!(last.unwrap().score, 2);

        let over = submit_answer(
            &state,
            started.session_id,
            SubmitAnswerRequest { claim: true },
        )
        .await;
        assert!(matches!(over, Err(ServiceError::InvalidState(_))));

        let stats = store
            .find_user_stats("ada".into(), "typescript".into())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.games_played, 1);
        assert_eq!(stats.highest_score, 2);
    }

    #[tokio::test]
    async fn insufficient_pool_writes_nothing() {
        let (state, store) = state_with(None).await;
        add_language(&store, "rust", LanguageStatus::Active).await;
        add_snippet(&store, "rust", 1, Difficulty::Medium, true).await;
        add_snippet(&store, "rust", 1, Difficulty::Easy, true).await;

        let result = start_session(&state, None, start("rust", 2)).await;
        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
        assert_eq!(store.session_count(), 0);
    }

    #[tokio::test]
    async fn paused_language_and_unknown_caller_are_rejected() {
        let (state, store) = state_with(None).await;
        add_language(&store, "ruby", LanguageStatus::Paused).await;
        add_language(&store, "go", LanguageStatus::Active).await;

        let paused = start_session(&state, None, start("ruby", 1)).await;
        assert!(matches!(paused, Err(ServiceError::InvalidState(_))));

        let unknown = start_session(&state, Some("ghost".into()), start("go", 1)).await;
        assert!(matches!(unknown, Err(ServiceError::Unauthorized(_))));

        let missing = start_session(&state, None, start("cobol", 1)).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn deleted_snippet_fails_the_next_answer() {
        let (state, store) = state_with(None).await;
        add_language(&store, "go", LanguageStatus::Active).await;
        for _ in 0..3 {
            add_snippet(&store, "go", 1, Difficulty::Easy, true).await;
        }

        let started = start_session(&state, None, start("go", 1)).await.unwrap();
        store
            .delete_snippet(started.snippets[0].id)
            .await
            .unwrap();

        let result = submit_answer(
            &state,
            started.session_id,
            SubmitAnswerRequest { claim: true },
        )
        .await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        let session = store
            .find_session(started.session_id)
            .await
            .unwrap()
            .unwrap();
        assert!(session.answers.is_empty());
    }

    #[tokio::test]
    async fn finalize_recomputes_score_and_is_idempotent() {
        let (state, store) = state_with(None).await;
        add_language(&store, "python", LanguageStatus::Active).await;
        for _ in 0..3 {
            add_snippet(&store, "python", 1, Difficulty::Easy, false).await;
        }

        let started = start_session(&state, None, start("python", 1)).await.unwrap();
        let early = finalize_session(&state, started.session_id).await;
        assert!(matches!(early, Err(ServiceError::InvalidState(_))));

        for claim in [false, true, false] {
            submit_answer(&state, started.session_id, SubmitAnswerRequest { claim })
                .await
                .unwrap();
        }

        // Tamper with the stored score; finalize must not trust it.
        let mut session = store
            .find_session(started.session_id)
            .await
            .unwrap()
            .unwrap();
        session.score = 3;
        store.save_session(session.clone()).await.unwrap();

        let finalized = finalize_session(&state, started.session_id).await.unwrap();
        assert_eq!(finalized.score, 2);
        let parts: Vec<&str> = finalized.share_slug.split('-').collect();
        assert_eq!(parts[0], "python");
        assert_eq!(parts[1], "easy");
        assert!((1000..=9999).contains(&parts[2].parse::<u16>().unwrap()));
        assert!(started.session_id.simple().to_string().ends_with(parts[3]));

        let again = finalize_session(&state, started.session_id).await.unwrap();
        assert_eq!(again.share_slug, finalized.share_slug);

        let shared = shared_result(&state, finalized.share_slug.clone())
            .await
            .unwrap();
        assert_eq!(shared.score, 2);
        assert_eq!(shared.total, 3);
        assert!(shared.player.is_none());
    }

    #[tokio::test]
    async fn state_shows_next_card_then_final_score() {
        let (state, store) = state_with(None).await;
        add_language(&store, "go", LanguageStatus::Active).await;
        for _ in 0..3 {
            add_snippet(&store, "go", 1, Difficulty::Easy, true).await;
        }
        let started = start_session(&state, None, start("go", 1)).await.unwrap();

        match session_state(&state, started.session_id).await.unwrap() {
            SessionStateResponse::InProgress { index, snippet, .. } => {
                assert_eq!(index, 0);
                assert_eq!(snippet.id, started.snippets[0].id);
            }
            other => panic!("unexpected state {other:?}"),
        }

        for _ in 0..3 {
            submit_answer(
                &state,
                started.session_id,
                SubmitAnswerRequest { claim: true },
            )
            .await
            .unwrap();
        }
        assert!(matches!(
            session_state(&state, started.session_id).await.unwrap(),
            SessionStateResponse::Over { score: 3, total: 3 }
        ));
    }
}
