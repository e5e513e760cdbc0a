use std::convert::Infallible;

use axum::{
    Json, Router,
    extract::{FromRequest, FromRequestParts, Request, rejection::JsonRejection},
    http::request::Parts,
};
use axum_valid::{Valid, ValidRejection};
use tracing::debug;

use crate::{error::AppError, services::identity, state::SharedState};

pub mod admin;
pub mod docs;
pub mod health;
pub mod public;
pub mod sessions;
pub mod users;

/// Optional caller identity read from the `x-user-id` header.
#[derive(Debug, Clone)]
pub struct CallerId(pub Option<String>);

impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(identity::caller_id(&parts.headers)))
    }
}

/// JSON body whose parse failures answer with the API's JSON error shape.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(json_rejection(rejection)),
        }
    }
}

/// JSON body checked with its `validator` rules before reaching the handler.
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    Valid<Json<T>>: FromRequest<S, Rejection = ValidRejection<JsonRejection>>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Valid::<Json<T>>::from_request(req, state).await {
            Ok(Valid(Json(value))) => Ok(Self(value)),
            Err(ValidRejection::Valid(errors)) => Err(errors.into()),
            Err(ValidRejection::Inner(rejection)) => Err(json_rejection(rejection)),
        }
    }
}

fn json_rejection(rejection: JsonRejection) -> AppError {
    debug!(status = %rejection.status(), "rejected request body");
    AppError::BadRequest(rejection.body_text())
}

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sessions::router())
        .merge(public::router())
        .merge(users::router())
        .merge(admin::router(state.clone()))
        .merge(docs::router());

    api_router.with_state(state)
}
