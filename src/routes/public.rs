use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::public::{
        GlobalLeaderboardEntry, LanguageLeaderboardEntry, LanguageSummary, LeaderboardQuery,
    },
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Read-only routes available without identity.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/languages", get(list_languages))
        .route("/leaderboard", get(global_leaderboard))
        .route("/leaderboard/{language}", get(language_leaderboard))
}

/// Languages open for play.
#[utoipa::path(
    get,
    path = "/languages",
    tag = "public",
    responses((status = 200, description = "Active languages", body = [LanguageSummary]))
)]
pub async fn list_languages(
    State(state): State<SharedState>,
) -> Result<Json<Vec<LanguageSummary>>, AppError> {
    Ok(Json(public_service::active_languages(&state).await?))
}

#[utoipa::path(
    get,
    path = "/leaderboard",
    tag = "public",
    params(LeaderboardQuery),
    responses((status = 200, description = "Global leaderboard", body = [GlobalLeaderboardEntry]))
)]
pub async fn global_leaderboard(
    State(state): State<SharedState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<GlobalLeaderboardEntry>>, AppError> {
    Ok(Json(
        public_service::global_leaderboard(&state, query.limit).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/leaderboard/{language}",
    tag = "public",
    params(
        ("language" = String, Path, description = "Language key"),
        LeaderboardQuery
    ),
    responses((status = 200, description = "Language leaderboard", body = [LanguageLeaderboardEntry]))
)]
pub async fn language_leaderboard(
    State(state): State<SharedState>,
    Path(language): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LanguageLeaderboardEntry>>, AppError> {
    Ok(Json(
        public_service::language_leaderboard(&state, language, query.limit).await?,
    ))
}
