//! HTTP mapping for registrar errors (non-metric handlers).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use registrar_core::error::{ErrorClass, RegistrarError};

/// Response wrapper so handlers can return `Result<_, ApiError>`.
#[derive(Debug)]
pub struct ApiError(pub RegistrarError);

impl From<RegistrarError> for ApiError {
    fn from(e: RegistrarError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let class = self.0.class();
        let status = match class {
            ErrorClass::Dependency => StatusCode::SERVICE_UNAVAILABLE,
            ErrorClass::Request => StatusCode::BAD_REQUEST,
            ErrorClass::Configuration | ErrorClass::Scrape | ErrorClass::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = Json(json!({
            "error": class.as_str(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
