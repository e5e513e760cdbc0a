use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use tracing::debug;
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            CreateLanguageRequest, CreateSnippetRequest, GenerateSnippetsRequest,
            GenerateSnippetsResponse, LanguageResponse, SetLanguageStatusRequest, SetRoleRequest,
            SnippetQuery, SnippetResponse, UpdateSnippetRequest,
        },
        public::UserSummary,
    },
    error::AppError,
    routes::{AppJson, ValidJson},
    services::{admin_service, generation_service, identity},
    state::SharedState,
};

/// Admin-only endpoints for curating snippets, languages and users.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/snippets", get(list_snippets).post(create_snippet))
        .route(
            "/admin/snippets/{id}",
            get(get_snippet).put(update_snippet).delete(delete_snippet),
        )
        .route(
            "/admin/languages",
            get(list_languages).post(create_language),
        )
        .route(
            "/admin/languages/{language}/status",
            put(set_language_status),
        )
        .route("/admin/languages/{language}/volume", post(bump_volume))
        .route("/admin/languages/{language}/recount", post(recount_language))
        .route("/admin/generate", post(generate_snippets))
        .route("/admin/users", get(list_users))
        .route("/admin/users/{id}/role", put(set_user_role))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

/// List snippets, optionally filtered.
#[utoipa::path(
    get,
    path = "/admin/snippets",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity"), SnippetQuery),
    responses((status = 200, description = "Matching snippets", body = [SnippetResponse]))
)]
pub async fn list_snippets(
    State(state): State<SharedState>,
    Query(query): Query<SnippetQuery>,
) -> Result<Json<Vec<SnippetResponse>>, AppError> {
    Ok(Json(admin_service::list_snippets(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/admin/snippets/{id}",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity"),
    ("id" = Uuid, Path, description = "Snippet identifier")),
    responses((status = 200, description = "Snippet", body = SnippetResponse))
)]
pub async fn get_snippet(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SnippetResponse>, AppError> {
    Ok(Json(admin_service::get_snippet(&state, id).await?))
}

/// Add a hand-written snippet.
#[utoipa::path(
    post,
    path = "/admin/snippets",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity")),
    request_body = CreateSnippetRequest,
    responses((status = 200, description = "Snippet created", body = SnippetResponse))
)]
pub async fn create_snippet(
    State(state): State<SharedState>,
    ValidJson(payload): ValidJson<CreateSnippetRequest>,
) -> Result<Json<SnippetResponse>, AppError> {
    Ok(Json(admin_service::create_snippet(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/admin/snippets/{id}",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity"),
    ("id" = Uuid, Path, description = "Snippet identifier")),
    request_body = UpdateSnippetRequest,
    responses((status = 200, description = "Snippet updated", body = SnippetResponse))
)]
pub async fn update_snippet(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    ValidJson(payload): ValidJson<UpdateSnippetRequest>,
) -> Result<Json<SnippetResponse>, AppError> {
    Ok(Json(
        admin_service::update_snippet(&state, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/admin/snippets/{id}",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity"),
    ("id" = Uuid, Path, description = "Snippet identifier")),
    responses((status = 204, description = "Snippet deleted"))
)]
pub async fn delete_snippet(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_snippet(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/admin/languages",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity")),
    responses((status = 200, description = "Language catalogue", body = [LanguageResponse]))
)]
pub async fn list_languages(
    State(state): State<SharedState>,
) -> Result<Json<Vec<LanguageResponse>>, AppError> {
    Ok(Json(admin_service::list_languages(&state).await?))
}

#[utoipa::path(
    post,
    path = "/admin/languages",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity")),
    request_body = CreateLanguageRequest,
    responses(
        (status = 200, description = "Language created", body = LanguageResponse),
        (status = 409, description = "Language already exists")
    )
)]
pub async fn create_language(
    State(state): State<SharedState>,
    ValidJson(payload): ValidJson<CreateLanguageRequest>,
) -> Result<Json<LanguageResponse>, AppError> {
    Ok(Json(admin_service::create_language(&state, payload).await?))
}

/// Activate, pause or remove a language.
#[utoipa::path(
    put,
    path = "/admin/languages/{language}/status",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity"),
    ("language" = String, Path, description = "Language key")),
    request_body = SetLanguageStatusRequest,
    responses((status = 200, description = "Status updated", body = LanguageResponse))
)]
pub async fn set_language_status(
    State(state): State<SharedState>,
    Path(language): Path<String>,
    AppJson(payload): AppJson<SetLanguageStatusRequest>,
) -> Result<Json<LanguageResponse>, AppError> {
    Ok(Json(
        admin_service::set_language_status(&state, language, payload).await?,
    ))
}

/// Rotate the language to a new, empty volume.
#[utoipa::path(
    post,
    path = "/admin/languages/{language}/volume",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity"),
    ("language" = String, Path, description = "Language key")),
    responses((status = 200, description = "Volume bumped", body = LanguageResponse))
)]
pub async fn bump_volume(
    State(state): State<SharedState>,
    Path(language): Path<String>,
) -> Result<Json<LanguageResponse>, AppError> {
    Ok(Json(admin_service::bump_volume(&state, language).await?))
}

#[utoipa::path(
    post,
    path = "/admin/languages/{language}/recount",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity"),
    ("language" = String, Path, description = "Language key")),
    responses((status = 200, description = "Counters recomputed", body = LanguageResponse))
)]
pub async fn recount_language(
    State(state): State<SharedState>,
    Path(language): Path<String>,
) -> Result<Json<LanguageResponse>, AppError> {
    Ok(Json(
        admin_service::recount_language(&state, language).await?,
    ))
}

/// Generate a batch of snippets through the completion service.
#[utoipa::path(
    post,
    path = "/admin/generate",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity")),
    request_body = GenerateSnippetsRequest,
    responses(
        (status = 200, description = "Snippets generated", body = GenerateSnippetsResponse),
        (status = 502, description = "Completion service failed or answered garbage")
    )
)]
pub async fn generate_snippets(
    State(state): State<SharedState>,
    ValidJson(payload): ValidJson<GenerateSnippetsRequest>,
) -> Result<Json<GenerateSnippetsResponse>, AppError> {
    Ok(Json(
        generation_service::generate_snippets(&state, payload).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity")),
    responses((status = 200, description = "Registered users", body = [UserSummary]))
)]
pub async fn list_users(
    State(state): State<SharedState>,
) -> Result<Json<Vec<UserSummary>>, AppError> {
    Ok(Json(admin_service::list_users(&state).await?))
}

#[utoipa::path(
    put,
    path = "/admin/users/{id}/role",
    tag = "admin",
    params(("x-user-id" = String, Header, description = "Admin identity"),
    ("id" = String, Path, description = "User identifier")),
    request_body = SetRoleRequest,
    responses((status = 200, description = "Role updated", body = UserSummary))
)]
pub async fn set_user_role(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    AppJson(payload): AppJson<SetRoleRequest>,
) -> Result<Json<UserSummary>, AppError> {
    Ok(Json(
        admin_service::set_user_role(&state, id, payload).await?,
    ))
}

async fn require_admin(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let store = state.require_store().await?;
    let caller = identity::caller_id(req.headers());
    let admin = identity::require_admin(&store, caller).await?;
    debug!(user_id = %admin.id, path = %req.uri().path(), "admin request");
    Ok(next.run(req).await)
}
