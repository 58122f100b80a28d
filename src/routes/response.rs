//! Response helpers shared by all routes

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::types::ServiceError;

pub type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Uniform error body: `{status, error, message}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: u16,
    pub error: Option<String>,
    pub message: String,
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

pub fn empty_body() -> BoxBody {
    Full::new(Bytes::new())
        .map_err(|never| match never {})
        .boxed()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization, X-File-Name")
        .body(full_body(json))
        .unwrap()
}

pub fn error_response(
    status: StatusCode,
    error: Option<&str>,
    message: impl Into<String>,
) -> Response<BoxBody> {
    json_response(
        status,
        &ErrorResponse {
            status: status.as_u16(),
            error: error.map(str::to_string),
            message: message.into(),
        },
    )
}

/// Render a service error without exposing internal detail
pub fn service_error_response(err: ServiceError) -> Response<BoxBody> {
    let status = err.status_code();
    match err {
        ServiceError::BadRequest(message) => error_response(status, None, message),
        ServiceError::Forbidden(message) | ServiceError::Auth(message) => {
            error_response(status, Some("forbidden"), message)
        }
        ServiceError::NotFound(message) => error_response(status, Some("not_found"), message),
        ServiceError::Conflict(message) => error_response(status, Some("conflict"), message),
        ServiceError::PayloadTooLarge(message) => {
            error_response(status, Some("payload_too_large"), message)
        }
        ServiceError::Database(detail)
        | ServiceError::Internal(detail)
        | ServiceError::Config(detail) => {
            error!("Request failed: {}", detail);
            error_response(status, Some("internal"), "Internal server error")
        }
    }
}

pub fn not_found_response(path: &str) -> Response<BoxBody> {
    error_response(
        StatusCode::NOT_FOUND,
        Some("not_found"),
        format!("No route for {}", path),
    )
}

pub fn method_not_allowed() -> Response<BoxBody> {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        Some("method_not_allowed"),
        "Method not allowed",
    )
}

pub fn cors_preflight() -> Response<BoxBody> {
    Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, DELETE, OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type, Authorization, X-File-Name")
        .header("Access-Control-Max-Age", "86400")
        .body(empty_body())
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_shape() {
        let response = error_response(StatusCode::FORBIDDEN, None, "No token given");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "status": 403, "error": null, "message": "No token given" })
        );
    }

    #[tokio::test]
    async fn test_internal_detail_hidden() {
        let response =
            service_error_response(ServiceError::Database("disk I/O error at /var/db".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let json = body_json(response).await;
        assert_eq!(json["message"], "Internal server error");
        assert!(!json.to_string().contains("/var/db"));
    }
}
