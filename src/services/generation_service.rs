//! Snippet generation: prompt the completion service, parse its JSON answer and
//! store the batch in the language's current volume.

use std::time::SystemTime;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    config::GenerationConfig,
    dao::models::{Difficulty, LanguageStatus, SnippetEntity},
    dto::admin::{GenerateSnippetsRequest, GenerateSnippetsResponse, SnippetResponse},
    error::ServiceError,
    state::SharedState,
};

/// Reasons a completion answer cannot be turned into snippets.
#[derive(Debug, Error)]
pub enum GenerationParseError {
    #[error("completion answer contains no JSON object")]
    NoJsonObject,
    #[error("completion answer is not a valid snippet batch")]
    InvalidJson(#[source] serde_json::Error),
    #[error("completion answer contains no usable snippet")]
    Empty,
}

impl From<GenerationParseError> for ServiceError {
    fn from(err: GenerationParseError) -> Self {
        ServiceError::Upstream(err.to_string())
    }
}

/// One snippet as produced by the completion service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeneratedSnippet {
    pub code: String,
    #[serde(rename = "isValid")]
    pub is_valid: bool,
    #[serde(default)]
    pub explanation: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedBatch {
    snippets: Vec<GeneratedSnippet>,
}

/// Split `count` into (valid, invalid) using half-up rounding of `count * ratio`.
pub fn split_counts(count: u32, ratio: f64) -> (u32, u32) {
    let valid = ((f64::from(count) * ratio) + 0.5).floor() as u32;
    let valid = valid.min(count);
    (valid, count - valid)
}

/// Fill the user prompt template.
pub fn render_user_prompt(
    config: &GenerationConfig,
    language: &str,
    difficulty: Difficulty,
    valid: u32,
    invalid: u32,
    ratio: f64,
) -> String {
    config
        .user_prompt_template
        .replace("{language}", language)
        .replace("{difficulty}", difficulty.as_str())
        .replace("{count}", &(valid + invalid).to_string())
        .replace("{valid_count}", &valid.to_string())
        .replace("{invalid_count}", &invalid.to_string())
        .replace("{valid_ratio}", &format!("{ratio:.2}"))
}

/// Parse a completion answer, tolerating prose or code fences around the outermost object.
pub fn parse_generated(text: &str) -> Result<Vec<GeneratedSnippet>, GenerationParseError> {
    let start = text.find('{').ok_or(GenerationParseError::NoJsonObject)?;
    let end = text.rfind('}').ok_or(GenerationParseError::NoJsonObject)?;
    if end < start {
        return Err(GenerationParseError::NoJsonObject);
    }

    let batch: GeneratedBatch =
        serde_json::from_str(&text[start..=end]).map_err(GenerationParseError::InvalidJson)?;

    let snippets: Vec<GeneratedSnippet> = batch
        .snippets
        .into_iter()
        .filter(|snippet| !snippet.code.trim().is_empty())
        .collect();
    if snippets.is_empty() {
        return Err(GenerationParseError::Empty);
    }
    Ok(snippets)
}

/// Run one generation round for a language and difficulty.
///
/// Transport and parse failures are terminal: nothing is stored and no retry happens.
pub async fn generate_snippets(
    state: &SharedState,
    request: GenerateSnippetsRequest,
) -> Result<GenerateSnippetsResponse, ServiceError> {
    let config = state.config().generation();
    if request.count == 0 || request.count > config.max_count {
        return Err(ServiceError::InvalidInput(format!(
            "count must be within 1..={}",
            config.max_count
        )));
    }
    let ratio = request.valid_ratio.unwrap_or(config.default_valid_ratio);
    if !(0.0..=1.0).contains(&ratio) {
        return Err(ServiceError::InvalidInput(
            "valid_ratio must be within [0, 1]".into(),
        ));
    }

    let store = state.require_store().await?;
    let mut language = store
        .find_language(request.language.clone())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("language `{}`", request.language)))?;
    if language.status == LanguageStatus::Removed {
        return Err(ServiceError::InvalidState(format!(
            "language `{}` has been removed",
            language.language
        )));
    }

    let completion = state.completion()?;
    let (valid, invalid) = split_counts(request.count, ratio);
    let user_prompt = render_user_prompt(
        config,
        &language.language,
        request.difficulty,
        valid,
        invalid,
        ratio,
    );

    let text = completion
        .complete(config.system_prompt.clone(), user_prompt)
        .await
        .inspect_err(|err| {
            warn!(language = %language.language, error = %err, "snippet generation request failed")
        })?;
    let generated = parse_generated(&text).inspect_err(|err| {
        warn!(
            language = %language.language,
            error = %err,
            response_len = text.len(),
            "failed to parse generated snippets"
        )
    })?;

    let returned_valid = generated.iter().filter(|snippet| snippet.is_valid).count();
    if generated.len() != request.count as usize || returned_valid != valid as usize {
        warn!(
            language = %language.language,
            requested = request.count,
            returned = generated.len(),
            requested_valid = valid,
            returned_valid,
            "generated batch differs from the requested split"
        );
    }

    let now = SystemTime::now();
    let mut stored = Vec::with_capacity(generated.len());
    for item in generated {
        let snippet = SnippetEntity {
            id: Uuid::new_v4(),
            language: language.language.clone(),
            volume: language.current_volume,
            difficulty: request.difficulty,
            code: item.code,
            is_valid: item.is_valid,
            explanation: item.explanation,
            tags: item.tags,
            ai_generated: true,
            created_at: now,
            updated_at: now,
        };
        store.save_snippet(snippet.clone()).await?;
        stored.push(snippet);
    }

    let inserted = stored.len() as u32;
    language.snippet_count += inserted;
    language.ai_generated_count += inserted;
    language.last_generated_at = Some(now);
    store.save_language(language.clone()).await?;

    info!(
        language = %language.language,
        volume = language.current_volume,
        difficulty = request.difficulty.as_str(),
        inserted,
        "stored generated snippets"
    );

    Ok(GenerateSnippetsResponse {
        language: language.language,
        volume: language.current_volume,
        valid_requested: valid,
        invalid_requested: invalid,
        inserted: stored.len(),
        snippets: stored.into_iter().map(SnippetResponse::from).collect(),
    })
}
