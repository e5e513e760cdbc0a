use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::session::{
        FinalizeSessionResponse, SessionStateResponse, SharedResultResponse, StartSessionRequest,
        StartSessionResponse, SubmitAnswerRequest, SubmitAnswerResponse,
    },
    error::AppError,
    routes::{AppJson, CallerId, ValidJson},
    services::session_service,
    state::SharedState,
};

/// Game session routes plus the public shared-result lookup.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(start_session))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/answers", post(submit_answer))
        .route("/sessions/{id}/finalize", post(finalize_session))
        .route("/results/{slug}", get(shared_result))
}

/// Start a session for the requested language and level.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    params(("x-user-id" = Option<String>, Header, description = "Caller identity; omit to play anonymously")),
    request_body = StartSessionRequest,
    responses(
        (status = 200, description = "Session started", body = StartSessionResponse),
        (status = 404, description = "Unknown language"),
        (status = 409, description = "Language inactive or not enough snippets")
    )
)]
pub async fn start_session(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
    ValidJson(payload): ValidJson<StartSessionRequest>,
) -> Result<Json<StartSessionResponse>, AppError> {
    Ok(Json(
        session_service::start_session(&state, caller, payload).await?,
    ))
}

/// Current state of a session.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses((status = 200, description = "Session state", body = SessionStateResponse))
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionStateResponse>, AppError> {
    Ok(Json(session_service::session_state(&state, id).await?))
}

/// Submit a merge/reject claim for the current snippet.
#[utoipa::path(
    post,
    path = "/sessions/{id}/answers",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = SubmitAnswerRequest,
    responses(
        (status = 200, description = "Claim scored", body = SubmitAnswerResponse),
        (status = 404, description = "Unknown session or snippet"),
        (status = 409, description = "Session already over")
    )
)]
pub async fn submit_answer(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<SubmitAnswerRequest>,
) -> Result<Json<SubmitAnswerResponse>, AppError> {
    Ok(Json(
        session_service::submit_answer(&state, id, payload).await?,
    ))
}

/// Freeze the final score and obtain a share slug.
#[utoipa::path(
    post,
    path = "/sessions/{id}/finalize",
    tag = "sessions",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session finalized", body = FinalizeSessionResponse),
        (status = 409, description = "Session not over yet")
    )
)]
pub async fn finalize_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FinalizeSessionResponse>, AppError> {
    Ok(Json(session_service::finalize_session(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/results/{slug}",
    tag = "sessions",
    params(("slug" = String, Path, description = "Share slug returned by finalize")),
    responses((status = 200, description = "Shared result", body = SharedResultResponse))
)]
pub async fn shared_result(
    State(state): State<SharedState>,
    Path(slug): Path<String>,
) -> Result<Json<SharedResultResponse>, AppError> {
    Ok(Json(session_service::shared_result(&state, slug).await?))
}
