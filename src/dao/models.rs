use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Difficulty tier of a snippet, mapped one-to-one onto game levels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Map a game level (1..=3) onto its difficulty.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::Easy),
            2 => Some(Self::Medium),
            3 => Some(Self::Hard),
            _ => None,
        }
    }

    /// Game level matching this difficulty.
    pub fn level(self) -> u8 {
        match self {
            Self::Easy => 1,
            Self::Medium => 2,
            Self::Hard => 3,
        }
    }

    /// Lowercase label used in prompts, slugs and storage filters.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

/// Lifecycle of a language in the catalogue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LanguageStatus {
    Active,
    Paused,
    Removed,
}

/// Authorization role attached to a user record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

/// Reviewable code snippet persisted in the snippet store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnippetEntity {
    /// Stable identifier for the snippet.
    pub id: Uuid,
    /// Language key (e.g. `typescript`).
    pub language: String,
    /// Volume the snippet belongs to.
    pub volume: u32,
    pub difficulty: Difficulty,
    /// Source code shown to players.
    pub code: String,
    /// Whether the snippet should be merged.
    pub is_valid: bool,
    /// Explanation revealed once the snippet has been answered.
    pub explanation: String,
    pub tags: Vec<String>,
    /// Whether the snippet came out of the generation pipeline.
    pub ai_generated: bool,
    pub created_at: SystemTime,
    pub updated_at: SystemTime,
}

/// Per-language catalogue row tracking the active volume and its counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LanguageVolumeEntity {
    /// Language key, also the primary key of the row.
    pub language: String,
    /// Volume new snippets are added to and games draw from by default.
    pub current_volume: u32,
    /// Number of snippets in the current volume.
    pub snippet_count: u32,
    /// Number of generated snippets in the current volume.
    pub ai_generated_count: u32,
    /// Last time the generation pipeline added snippets.
    pub last_generated_at: Option<SystemTime>,
    pub status: LanguageStatus,
}

/// Persisted game session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionEntity {
    pub id: Uuid,
    /// Player identity, absent for anonymous games.
    pub user_id: Option<String>,
    pub language: String,
    pub level: u8,
    pub difficulty: Difficulty,
    pub volume: u32,
    /// Ordered snippets played in this session.
    pub snippet_ids: Vec<Uuid>,
    /// Validity flags of `snippet_ids` captured when the session started.
    pub answer_key: Vec<bool>,
    /// Claims submitted so far, in order.
    pub answers: Vec<bool>,
    pub score: u32,
    pub time_limit_secs: u32,
    pub created_at: SystemTime,
    pub completed_at: Option<SystemTime>,
    /// Public identifier assigned when the session is finalized.
    pub share_slug: Option<String>,
    pub finalized_at: Option<SystemTime>,
}

/// Aggregated statistics for a (user, language) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStatsEntity {
    pub user_id: String,
    pub language: String,
    pub games_played: u32,
    pub average_score: f64,
    pub highest_score: u32,
    pub last_played_at: SystemTime,
    /// Volumes the user has played at least once, in first-played order.
    pub volumes_played: Vec<u32>,
}

/// Registered player or administrator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserEntity {
    /// External identity string resolved by the identity provider.
    pub id: String,
    pub display_name: String,
    pub role: Role,
    /// Games completed across every language.
    pub total_games: u32,
    /// Running average score across every language.
    pub average_score: f64,
    pub created_at: SystemTime,
}

/// Criteria used to select snippets from the store. `None` fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnippetFilter {
    pub language: Option<String>,
    pub volume: Option<u32>,
    pub difficulty: Option<Difficulty>,
}

impl SnippetFilter {
    /// Whether the snippet satisfies every criterion of the filter.
    pub fn matches(&self, snippet: &SnippetEntity) -> bool {
        self.language
            .as_deref()
            .is_none_or(|language| snippet.language == language)
            && self.volume.is_none_or(|volume| snippet.volume == volume)
            && self
                .difficulty
                .is_none_or(|difficulty| snippet.difficulty == difficulty)
    }
}

/// Key used by stores that keep user statistics in a single keyed collection.
pub fn user_stats_key(user_id: &str, language: &str) -> String {
    format!("{user_id}:{language}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(language: &str, volume: u32, difficulty: Difficulty) -> SnippetEntity {
        let now = SystemTime::now();
        SnippetEntity {
            id: Uuid::new_v4(),
            language: language.into(),
            volume,
            difficulty,
            code: "let x = 1;".into(),
            is_valid: true,
            explanation: String::new(),
            tags: vec![],
            ai_generated: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn levels_map_onto_difficulties() {
        assert_eq!(Difficulty::from_level(1), Some(Difficulty::Easy));
        assert_eq!(Difficulty::from_level(2), Some(Difficulty::Medium));
        assert_eq!(Difficulty::from_level(3), Some(Difficulty::Hard));
        assert_eq!(Difficulty::from_level(0), None);
        assert_eq!(Difficulty::from_level(4), None);
        assert_eq!(Difficulty::Hard.level(), 3);
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = SnippetFilter::default();
        assert!(filter.matches(&snippet("rust", 4, Difficulty::Hard)));
    }

    #[test]
    fn filter_checks_every_field() {
        let filter = SnippetFilter {
            language: Some("typescript".into()),
            volume: Some(1),
            difficulty: Some(Difficulty::Easy),
        };
        assert!(filter.matches(&snippet("typescript", 1, Difficulty::Easy)));
        assert!(!filter.matches(&snippet("rust", 1, Difficulty::Easy)));
        assert!(!filter.matches(&snippet("typescript", 2, Difficulty::Easy)));
        assert!(!filter.matches(&snippet("typescript", 1, Difficulty::Medium)));
    }
}
