//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{Difficulty, LanguageStatus, LanguageVolumeEntity, Role, SnippetEntity},
    dto::{format_system_time, validation::validate_language_key},
};

/// Filters accepted when listing snippets.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SnippetQuery {
    pub language: Option<String>,
    pub volume: Option<u32>,
    pub difficulty: Option<Difficulty>,
}

/// Full snippet view, answer included.
#[derive(Debug, Serialize, ToSchema)]
pub struct SnippetResponse {
    pub id: Uuid,
    pub language: String,
    pub volume: u32,
    pub difficulty: Difficulty,
    pub code: String,
    pub is_valid: bool,
    pub explanation: String,
    pub tags: Vec<String>,
    pub ai_generated: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<SnippetEntity> for SnippetResponse {
    fn from(value: SnippetEntity) -> Self {
        Self {
            id: value.id,
            language: value.language,
            volume: value.volume,
            difficulty: value.difficulty,
            code: value.code,
            is_valid: value.is_valid,
            explanation: value.explanation,
            tags: value.tags,
            ai_generated: value.ai_generated,
            created_at: format_system_time(value.created_at),
            updated_at: format_system_time(value.updated_at),
        }
    }
}

/// Manually authored snippet.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateSnippetRequest {
    #[validate(custom(function = "validate_language_key"))]
    pub language: String,
    /// Target volume. Defaults to the language's current volume.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub volume: Option<u32>,
    pub difficulty: Difficulty,
    #[validate(length(min = 1))]
    pub code: String,
    pub is_valid: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Partial snippet update. Omitted fields are left untouched.
#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateSnippetRequest {
    #[validate(length(min = 1))]
    pub code: Option<String>,
    pub is_valid: Option<bool>,
    pub explanation: Option<String>,
    pub tags: Option<Vec<String>>,
    pub difficulty: Option<Difficulty>,
}

/// Catalogue row as seen by administrators.
#[derive(Debug, Serialize, ToSchema)]
pub struct LanguageResponse {
    pub language: String,
    pub current_volume: u32,
    pub snippet_count: u32,
    pub ai_generated_count: u32,
    pub last_generated_at: Option<String>,
    pub status: LanguageStatus,
}

impl From<LanguageVolumeEntity> for LanguageResponse {
    fn from(value: LanguageVolumeEntity) -> Self {
        Self {
            language: value.language,
            current_volume: value.current_volume,
            snippet_count: value.snippet_count,
            ai_generated_count: value.ai_generated_count,
            last_generated_at: value.last_generated_at.map(format_system_time),
            status: value.status,
        }
    }
}

/// Register a new language, starting at volume 1.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateLanguageRequest {
    #[validate(custom(function = "validate_language_key"))]
    pub language: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetLanguageStatusRequest {
    pub status: LanguageStatus,
}

/// Ask the completion service for a batch of snippets.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct GenerateSnippetsRequest {
    #[validate(custom(function = "validate_language_key"))]
    pub language: String,
    pub difficulty: Difficulty,
    #[validate(range(min = 1))]
    pub count: u32,
    /// Share of valid snippets in `[0, 1]`. Defaults to the configured ratio.
    #[serde(default)]
    #[validate(range(min = 0.0, max = 1.0))]
    pub valid_ratio: Option<f64>,
}

/// Outcome of a generation run.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateSnippetsResponse {
    pub language: String,
    pub volume: u32,
    pub valid_requested: u32,
    pub invalid_requested: u32,
    pub inserted: usize,
    pub snippets: Vec<SnippetResponse>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetRoleRequest {
    pub role: Role,
}
