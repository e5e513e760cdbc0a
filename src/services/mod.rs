/// Admin service for snippet, language and user management.
pub mod admin_service;
/// Client for the external text-completion service.
pub mod completion;
/// OpenAPI documentation generation.
pub mod documentation;
/// Snippet generation pipeline.
pub mod generation_service;
/// Health check service.
pub mod health_service;
/// Caller identity resolution and role checks.
pub mod identity;
/// Public read models: languages and leaderboards.
pub mod public_service;
/// Game session lifecycle.
pub mod session_service;
/// Running-average statistics updates.
pub mod stats_service;
/// Storage connection supervisor with reconnect backoff.
pub mod storage_supervisor;
/// Player profiles and bootstrap administrators.
pub mod user_service;

#[cfg(test)]
pub(crate) mod test_support;
