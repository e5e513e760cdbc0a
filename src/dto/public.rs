use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    dao::models::{LanguageVolumeEntity, Role, UserEntity, UserStatsEntity},
    dto::format_system_time,
};

/// Language available for play.
#[derive(Debug, Serialize, ToSchema)]
pub struct LanguageSummary {
    pub language: String,
    pub current_volume: u32,
    pub snippet_count: u32,
}

impl From<LanguageVolumeEntity> for LanguageSummary {
    fn from(value: LanguageVolumeEntity) -> Self {
        Self {
            language: value.language,
            current_volume: value.current_volume,
            snippet_count: value.snippet_count,
        }
    }
}

/// Query string accepted by leaderboard routes.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LeaderboardQuery {
    /// Number of rows to return, capped by the server.
    pub limit: Option<usize>,
}

/// Row of a per-language leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LanguageLeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub display_name: Option<String>,
    pub highest_score: u32,
    pub average_score: f64,
    pub games_played: u32,
}

/// Row of the global leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct GlobalLeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub average_score: f64,
    pub total_games: u32,
}

/// Register or rename the calling user.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub display_name: String,
}

/// Public projection of a user record.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserSummary {
    pub id: String,
    pub display_name: String,
    pub role: Role,
    pub total_games: u32,
    pub average_score: f64,
    pub created_at: String,
}

impl From<UserEntity> for UserSummary {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            role: value.role,
            total_games: value.total_games,
            average_score: value.average_score,
            created_at: format_system_time(value.created_at),
        }
    }
}

/// Statistics of the caller for one language.
#[derive(Debug, Serialize, ToSchema)]
pub struct LanguageStatsSummary {
    pub language: String,
    pub games_played: u32,
    pub average_score: f64,
    pub highest_score: u32,
    pub last_played_at: String,
    pub volumes_played: Vec<u32>,
}

impl From<UserStatsEntity> for LanguageStatsSummary {
    fn from(value: UserStatsEntity) -> Self {
        Self {
            language: value.language,
            games_played: value.games_played,
            average_score: value.average_score,
            highest_score: value.highest_score,
            last_played_at: format_system_time(value.last_played_at),
            volumes_played: value.volumes_played,
        }
    }
}

/// The caller's profile with per-language statistics.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserProfileResponse {
    pub user: UserSummary,
    pub stats: Vec<LanguageStatsSummary>,
}
