use actix_web::{
    error::{InternalError, JsonPayloadError, PathError},
    http::StatusCode,
    Error, HttpRequest, HttpResponse,
};

use crate::core::AppError;

/// Helper function to create standardized error responses
pub fn error_response(status_code: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status_code).json(serde_json::json!({
        "error": {
            "code": status_code.as_u16(),
            "message": message.into(),
        }
    }))
}

/// Malformed JSON bodies answer with the same error shape as `AppError`
pub fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> Error {
    tracing::warn!(path = %req.path(), error = %err, "Rejected request body");
    let response = error_response(StatusCode::BAD_REQUEST, format!("Invalid request body: {}", err));
    InternalError::from_response(err, response).into()
}

/// Unparseable path segments (e.g. a non-numeric line index)
pub fn path_error_handler(err: PathError, req: &HttpRequest) -> Error {
    tracing::warn!(path = %req.path(), error = %err, "Rejected request path");
    AppError::validation(format!("Invalid path: {}", err)).into()
}
