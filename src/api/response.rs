//! JSON envelope shared by every route

use actix_web::http::StatusCode;
use actix_web::HttpResponse;
use serde::Serialize;

use crate::core::ShuffleError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub status_code: u16,
    pub success: bool,
    pub message: String,
    pub data: T,
}

/// Successful response carrying `data`
pub fn success<T: Serialize>(status: StatusCode, data: T, message: &str) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse {
        status_code: status.as_u16(),
        success: status.is_success(),
        message: message.to_string(),
        data,
    })
}

/// Failed response with no payload
pub fn failure(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(ApiResponse {
        status_code: status.as_u16(),
        success: false,
        message: message.into(),
        data: serde_json::Value::Null,
    })
}

/// Map a core error onto its HTTP status. Internal failures are logged and
/// reported without details.
pub fn error_response(err: &ShuffleError) -> HttpResponse {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    if err.is_internal() {
        tracing::error!("Request failed: {:#}", err);
        return failure(status, "Something went wrong");
    }

    failure(status, err.to_string())
}
