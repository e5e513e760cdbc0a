use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::public::{RegisterUserRequest, UserProfileResponse, UserSummary},
    error::AppError,
    routes::{CallerId, ValidJson},
    services::user_service,
    state::SharedState,
};

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/users", post(register))
        .route("/users/me", get(me))
}

/// Register the caller or update their display name.
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    params(("x-user-id" = String, Header, description = "Caller identity")),
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Profile stored", body = UserSummary),
        (status = 401, description = "Missing identity header")
    )
)]
pub async fn register(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
    ValidJson(payload): ValidJson<RegisterUserRequest>,
) -> Result<Json<UserSummary>, AppError> {
    Ok(Json(user_service::register(&state, caller, payload).await?))
}

/// Profile and per-language statistics of the caller.
#[utoipa::path(
    get,
    path = "/users/me",
    tag = "users",
    params(("x-user-id" = String, Header, description = "Caller identity")),
    responses(
        (status = 200, description = "Caller profile", body = UserProfileResponse),
        (status = 401, description = "Missing or unknown identity")
    )
)]
pub async fn me(
    State(state): State<SharedState>,
    CallerId(caller): CallerId,
) -> Result<Json<UserProfileResponse>, AppError> {
    Ok(Json(user_service::profile(&state, caller).await?))
}
