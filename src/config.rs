//! Application-level configuration loading: level tuning, generation prompts,
//! leaderboard limits and bootstrap administrators.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::dao::models::Difficulty;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MERGE_OR_REJECT_CONFIG_PATH";

const DEFAULT_SYSTEM_PROMPT: &str = "You write short code snippets for a code review game. \
Some snippets are correct and idiomatic, others contain one subtle bug. \
Answer with a single JSON object and nothing else.";

const DEFAULT_USER_PROMPT: &str = "Write {count} {language} snippets of {difficulty} difficulty. \
Exactly {valid_count} must be valid and {invalid_count} must contain a subtle bug \
(target valid ratio {valid_ratio}). Respond with JSON shaped as \
{\"snippets\": [{\"code\": string, \"isValid\": bool, \"explanation\": string, \"tags\": [string]}]}.";

/// Number of snippets and time budget of one game level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LevelConfig {
    /// Snippets drawn for a session at this level.
    pub snippet_count: u32,
    /// Time limit reported to clients, in seconds.
    pub time_limit_secs: u32,
}

/// Per-difficulty level tuning.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LevelsConfig {
    pub easy: LevelConfig,
    pub medium: LevelConfig,
    pub hard: LevelConfig,
}

impl Default for LevelsConfig {
    fn default() -> Self {
        Self {
            easy: LevelConfig {
                snippet_count: 3,
                time_limit_secs: 60,
            },
            medium: LevelConfig {
                snippet_count: 5,
                time_limit_secs: 90,
            },
            hard: LevelConfig {
                snippet_count: 7,
                time_limit_secs: 120,
            },
        }
    }
}

/// Settings of the snippet generation pipeline.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Upper bound of snippets requested in one generation call.
    pub max_count: u32,
    /// Valid ratio used when the caller does not provide one.
    pub default_valid_ratio: f64,
    pub system_prompt: String,
    /// Template with `{language}`, `{difficulty}`, `{count}`, `{valid_count}`,
    /// `{invalid_count}` and `{valid_ratio}` placeholders.
    pub user_prompt_template: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_count: 20,
            default_valid_ratio: 0.5,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_owned(),
            user_prompt_template: DEFAULT_USER_PROMPT.to_owned(),
        }
    }
}

/// Leaderboard pagination limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

impl LeaderboardConfig {
    /// Resolve a requested limit against the configured default and cap.
    pub fn clamp(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}

/// User seeded with the admin role whenever a storage backend is installed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BootstrapAdmin {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    levels: LevelsConfig,
    generation: GenerationConfig,
    leaderboard: LeaderboardConfig,
    bootstrap_admins: Vec<BootstrapAdmin>,
}

/// Reasons a parsed configuration is rejected.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file is not valid JSON for [`AppConfig`].
    #[error("invalid configuration JSON")]
    Parse(#[from] serde_json::Error),
    /// A value is out of its allowed range.
    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(app_config) => {
                    info!(
                        path = %path.display(),
                        bootstrap_admins = app_config.bootstrap_admins.len(),
                        "loaded application config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Parse and validate a JSON configuration document. Missing sections keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for level in [&self.levels.easy, &self.levels.medium, &self.levels.hard] {
            if level.snippet_count == 0 {
                return Err(ConfigError::Invalid {
                    field: "levels.snippet_count",
                    reason: "must be at least 1",
                });
            }
        }
        if self.generation.max_count == 0 {
            return Err(ConfigError::Invalid {
                field: "generation.max_count",
                reason: "must be at least 1",
            });
        }
        if !(0.0..=1.0).contains(&self.generation.default_valid_ratio) {
            return Err(ConfigError::Invalid {
                field: "generation.default_valid_ratio",
                reason: "must be within [0, 1]",
            });
        }
        if self.leaderboard.default_limit > self.leaderboard.max_limit {
            return Err(ConfigError::Invalid {
                field: "leaderboard.default_limit",
                reason: "must not exceed leaderboard.max_limit",
            });
        }
        Ok(())
    }

    /// Level tuning for the given difficulty.
    pub fn level(&self, difficulty: Difficulty) -> LevelConfig {
        match difficulty {
            Difficulty::Easy => self.levels.easy,
            Difficulty::Medium => self.levels.medium,
            Difficulty::Hard => self.levels.hard,
        }
    }

    pub fn generation(&self) -> &GenerationConfig {
        &self.generation
    }

    pub fn leaderboard(&self) -> LeaderboardConfig {
        self.leaderboard
    }

    pub fn bootstrap_admins(&self) -> &[BootstrapAdmin] {
        &self.bootstrap_admins
    }

    /// Replace the bootstrap admin list.
    pub fn with_bootstrap_admins(mut self, admins: Vec<BootstrapAdmin>) -> Self {
        self.bootstrap_admins = admins;
        self
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
