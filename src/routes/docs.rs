use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{services::documentation::ApiDoc, state::SharedState};

/// Where the raw OpenAPI document is served.
pub const OPENAPI_JSON_PATH: &str = "/api-doc/openapi.json";

/// Swagger UI at `/docs`, reading the document from [`OPENAPI_JSON_PATH`].
pub fn router() -> Router<SharedState> {
    Router::new().merge(SwaggerUi::new("/docs").url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
}
