//! DTO definitions for the game session API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{Difficulty, SessionEntity, SnippetEntity},
    dto::{format_system_time, validation::validate_language_key},
};

/// Request to start a new session.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartSessionRequest {
    #[validate(custom(function = "validate_language_key"))]
    pub language: String,
    /// Game level: 1 (easy), 2 (medium) or 3 (hard).
    #[validate(range(min = 1, max = 3))]
    pub level: u8,
    /// Volume to draw snippets from. Defaults to the language's current volume.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub volume: Option<u32>,
}

/// Snippet as shown to a player. Validity and explanation are never part of it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SnippetCard {
    pub id: Uuid,
    pub code: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
}

impl From<&SnippetEntity> for SnippetCard {
    fn from(snippet: &SnippetEntity) -> Self {
        Self {
            id: snippet.id,
            code: snippet.code.clone(),
            language: snippet.language.clone(),
            difficulty: snippet.difficulty,
            tags: snippet.tags.clone(),
        }
    }
}

/// Response returned once a session has been created.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub level: u8,
    pub difficulty: Difficulty,
    pub volume: u32,
    pub time_limit_secs: u32,
    pub total: usize,
    /// Cards in play order.
    pub snippets: Vec<SnippetCard>,
}

/// Player claim about the current snippet.
#[derive(Debug, Deserialize, ToSchema)]
pub struct SubmitAnswerRequest {
    /// `true` to merge (snippet is valid), `false` to reject.
    pub claim: bool,
}

/// Feedback on a submitted claim.
#[derive(Debug, Serialize, ToSchema)]
pub struct SubmitAnswerResponse {
    pub snippet_id: Uuid,
    pub correct: bool,
    /// Actual validity of the snippet.
    pub is_valid: bool,
    pub explanation: String,
    pub score: u32,
    pub answered: usize,
    pub total: usize,
    pub game_over: bool,
}

/// Current view of a session.
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStateResponse {
    /// The next snippet awaits an answer.
    InProgress {
        index: usize,
        total: usize,
        score: u32,
        snippet: SnippetCard,
    },
    /// Every snippet has been answered.
    Over { score: u32, total: usize },
}

/// Result of finalizing a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct FinalizeSessionResponse {
    pub session_id: Uuid,
    /// Score recomputed from the stored answers.
    pub score: u32,
    pub total: usize,
    pub share_slug: String,
    pub finalized_at: String,
}

/// Public view of a finalized session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SharedResultResponse {
    pub slug: String,
    pub language: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub total: usize,
    pub completed_at: Option<String>,
    /// Display name of the player, absent for anonymous sessions.
    pub player: Option<String>,
}

impl FinalizeSessionResponse {
    /// Build the response from a finalized session.
    pub fn from_session(session: &SessionEntity, share_slug: String) -> Self {
        Self {
            session_id: session.id,
            score: session.score,
            total: session.total(),
            share_slug,
            finalized_at: session
                .finalized_at
                .map(format_system_time)
                .unwrap_or_default(),
        }
    }
}

impl SharedResultResponse {
    pub fn from_session(session: &SessionEntity, slug: String, player: Option<String>) -> Self {
        Self {
            slug,
            language: session.language.clone(),
            difficulty: session.difficulty,
            score: session.score,
            total: session.total(),
            completed_at: session.completed_at.map(format_system_time),
            player,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    #[test]
    fn cards_do_not_leak_validity() {
        let now = SystemTime::now();
        let snippet = SnippetEntity {
            id: Uuid::new_v4(),
            language: "rust".into(),
            volume: 1,
            difficulty: Difficulty::Easy,
            code: "fn main() {}".into(),
            is_valid: false,
            explanation: "secret".into(),
            tags: vec!["basics".into()],
            ai_generated: true,
            created_at: now,
            updated_at: now,
        };

        let value = serde_json::to_value(SnippetCard::from(&snippet)).unwrap();
        assert!(value.get("is_valid").is_none());
        assert!(value.get("explanation").is_none());
        assert_eq!(value["difficulty"], "easy");
    }

    #[test]
    fn state_is_tagged_by_status() {
        let value = serde_json::to_value(SessionStateResponse::Over { score: 2, total: 3 }).unwrap();
        assert_eq!(value["status"], "over");
        assert_eq!(value["score"], 2);
    }

    #[test]
    fn start_request_rejects_unknown_level() {
        let request = StartSessionRequest {
            language: "typescript".into(),
            level: 4,
            volume: None,
        };
        assert!(request.validate().is_err());
    }
}
