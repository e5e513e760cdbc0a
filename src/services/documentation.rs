use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI document for the Merge or Reject backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sessions::start_session,
        crate::routes::sessions::get_session,
        crate::routes::sessions::submit_answer,
        crate::routes::sessions::finalize_session,
        crate::routes::sessions::shared_result,
        crate::routes::public::list_languages,
        crate::routes::public::global_leaderboard,
        crate::routes::public::language_leaderboard,
        crate::routes::users::register,
        crate::routes::users::me,
        crate::routes::admin::list_snippets,
        crate::routes::admin::get_snippet,
        crate::routes::admin::create_snippet,
        crate::routes::admin::update_snippet,
        crate::routes::admin::delete_snippet,
        crate::routes::admin::list_languages,
        crate::routes::admin::create_language,
        crate::routes::admin::set_language_status,
        crate::routes::admin::bump_volume,
        crate::routes::admin::recount_language,
        crate::routes::admin::generate_snippets,
        crate::routes::admin::list_users,
        crate::routes::admin::set_user_role,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::health::HealthStatus,
            crate::dao::models::Difficulty,
            crate::dao::models::LanguageStatus,
            crate::dao::models::Role,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sessions", description = "Game sessions and shared results"),
        (name = "public", description = "Languages and leaderboards"),
        (name = "users", description = "Player profiles"),
        (name = "admin", description = "Snippet, language and user administration"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route_group() {
        let doc = ApiDoc::openapi();
        for path in [
            "/healthcheck",
            "/sessions/{id}/finalize",
            "/leaderboard/{language}",
            "/users/me",
            "/admin/generate",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
