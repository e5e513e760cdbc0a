use mongodb::bson::{DateTime, Document, doc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::MongoDaoError;
use crate::dao::models::{
    Difficulty, LanguageStatus, LanguageVolumeEntity, Role, SessionEntity, SnippetEntity,
    UserEntity, UserStatsEntity, user_stats_key,
};

pub const SNIPPET_COLLECTION_NAME: &str = "snippets";
pub const LANGUAGE_COLLECTION_NAME: &str = "language_volumes";
pub const SESSION_COLLECTION_NAME: &str = "sessions";
pub const USER_STATS_COLLECTION_NAME: &str = "user_stats";
pub const USER_COLLECTION_NAME: &str = "users";

pub fn doc_id(id: impl Into<String>) -> Document {
    doc! {"_id": id.into()}
}

fn parse_uuid(collection: &'static str, raw: &str) -> Result<Uuid, MongoDaoError> {
    Uuid::parse_str(raw).map_err(|_| MongoDaoError::InvalidId {
        collection,
        id: raw.to_owned(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSnippetDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub language: String,
    pub volume: u32,
    pub difficulty: Difficulty,
    pub code: String,
    pub is_valid: bool,
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub ai_generated: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl From<SnippetEntity> for MongoSnippetDocument {
    fn from(value: SnippetEntity) -> Self {
        Self {
            id: value.id.to_string(),
            language: value.language,
            volume: value.volume,
            difficulty: value.difficulty,
            code: value.code,
            is_valid: value.is_valid,
            explanation: value.explanation,
            tags: value.tags,
            ai_generated: value.ai_generated,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl TryFrom<MongoSnippetDocument> for SnippetEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSnippetDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_uuid(SNIPPET_COLLECTION_NAME, &value.id)?,
            language: value.language,
            volume: value.volume,
            difficulty: value.difficulty,
            code: value.code,
            is_valid: value.is_valid,
            explanation: value.explanation,
            tags: value.tags,
            ai_generated: value.ai_generated,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoLanguageDocument {
    #[serde(rename = "_id")]
    pub language: String,
    pub current_volume: u32,
    pub snippet_count: u32,
    pub ai_generated_count: u32,
    pub last_generated_at: Option<DateTime>,
    pub status: LanguageStatus,
}

impl From<LanguageVolumeEntity> for MongoLanguageDocument {
    fn from(value: LanguageVolumeEntity) -> Self {
        Self {
            language: value.language,
            current_volume: value.current_volume,
            snippet_count: value.snippet_count,
            ai_generated_count: value.ai_generated_count,
            last_generated_at: value.last_generated_at.map(DateTime::from_system_time),
            status: value.status,
        }
    }
}

impl From<MongoLanguageDocument> for LanguageVolumeEntity {
    fn from(value: MongoLanguageDocument) -> Self {
        Self {
            language: value.language,
            current_volume: value.current_volume,
            snippet_count: value.snippet_count,
            ai_generated_count: value.ai_generated_count,
            last_generated_at: value.last_generated_at.map(DateTime::to_system_time),
            status: value.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: Option<String>,
    pub language: String,
    pub level: u8,
    pub difficulty: Difficulty,
    pub volume: u32,
    pub snippet_ids: Vec<String>,
    pub answer_key: Vec<bool>,
    pub answers: Vec<bool>,
    pub score: u32,
    pub time_limit_secs: u32,
    pub created_at: DateTime,
    pub completed_at: Option<DateTime>,
    pub share_slug: Option<String>,
    pub finalized_at: Option<DateTime>,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            user_id: value.user_id,
            language: value.language,
            level: value.level,
            difficulty: value.difficulty,
            volume: value.volume,
            snippet_ids: value.snippet_ids.iter().map(Uuid::to_string).collect(),
            answer_key: value.answer_key,
            answers: value.answers,
            score: value.score,
            time_limit_secs: value.time_limit_secs,
            created_at: DateTime::from_system_time(value.created_at),
            completed_at: value.completed_at.map(DateTime::from_system_time),
            share_slug: value.share_slug,
            finalized_at: value.finalized_at.map(DateTime::from_system_time),
        }
    }
}

impl TryFrom<MongoSessionDocument> for SessionEntity {
    type Error = MongoDaoError;

    fn try_from(value: MongoSessionDocument) -> Result<Self, Self::Error> {
        let snippet_ids = value
            .snippet_ids
            .iter()
            .map(|raw| parse_uuid(SESSION_COLLECTION_NAME, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            id: parse_uuid(SESSION_COLLECTION_NAME, &value.id)?,
            user_id: value.user_id,
            language: value.language,
            level: value.level,
            difficulty: value.difficulty,
            volume: value.volume,
            snippet_ids,
            answer_key: value.answer_key,
            answers: value.answers,
            score: value.score,
            time_limit_secs: value.time_limit_secs,
            created_at: value.created_at.to_system_time(),
            completed_at: value.completed_at.map(DateTime::to_system_time),
            share_slug: value.share_slug,
            finalized_at: value.finalized_at.map(DateTime::to_system_time),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserStatsDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub language: String,
    pub games_played: u32,
    pub average_score: f64,
    pub highest_score: u32,
    pub last_played_at: DateTime,
    #[serde(default)]
    pub volumes_played: Vec<u32>,
}

impl From<UserStatsEntity> for MongoUserStatsDocument {
    fn from(value: UserStatsEntity) -> Self {
        Self {
            id: user_stats_key(&value.user_id, &value.language),
            user_id: value.user_id,
            language: value.language,
            games_played: value.games_played,
            average_score: value.average_score,
            highest_score: value.highest_score,
            last_played_at: DateTime::from_system_time(value.last_played_at),
            volumes_played: value.volumes_played,
        }
    }
}

impl From<MongoUserStatsDocument> for UserStatsEntity {
    fn from(value: MongoUserStatsDocument) -> Self {
        Self {
            user_id: value.user_id,
            language: value.language,
            games_played: value.games_played,
            average_score: value.average_score,
            highest_score: value.highest_score,
            last_played_at: value.last_played_at.to_system_time(),
            volumes_played: value.volumes_played,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub display_name: String,
    pub role: Role,
    pub total_games: u32,
    pub average_score: f64,
    pub created_at: DateTime,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            role: value.role,
            total_games: value.total_games,
            average_score: value.average_score,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            id: value.id,
            display_name: value.display_name,
            role: value.role,
            total_games: value.total_games,
            average_score: value.average_score,
            created_at: value.created_at.to_system_time(),
        }
    }
}
