//! File blob routes (all behind the access gate)
//!
//! Uploads carry the raw file as the request body:
//! - `X-File-Name` header: file name (required)
//! - `Content-Type` header: stored and echoed on download
//!
//! The body size cap is enforced by the server before dispatch.

use bytes::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::db::NewFile;
use crate::routes::response::{error_response, full_body, json_response, service_error_response, BoxBody};
use crate::server::AppState;
use crate::types::ServiceError;

pub const FILE_NAME_HEADER: &str = "X-File-Name";
pub const CONTENT_SHA256_HEADER: &str = "X-Content-Sha256";

#[derive(Debug, Serialize)]
struct FilesResponse {
    #[serde(rename = "ID")]
    id: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
struct DeletedFilesResponse {
    deleted: usize,
}

fn parse_id(raw: &str) -> Result<Uuid, Response<BoxBody>> {
    Uuid::parse_str(raw).map_err(|_| error_response(StatusCode::BAD_REQUEST, None, "Invalid id"))
}

/// POST /rap/file/{parent_id}
pub async fn handle_add_file(
    req: Request<Bytes>,
    parent_id: &str,
    state: Arc<AppState>,
) -> Response<BoxBody> {
    if parent_id.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, None, "Parent id is not defined");
    }

    let name = match req
        .headers()
        .get(FILE_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
    {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            return error_response(
                StatusCode::BAD_REQUEST,
                None,
                format!("Missing {} header", FILE_NAME_HEADER),
            )
        }
    };

    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let data = req.into_body();
    if data.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, None, "File body is empty");
    }
    if data.len() > state.args.max_upload_bytes {
        return service_error_response(ServiceError::PayloadTooLarge(format!(
            "File exceeds {} bytes",
            state.args.max_upload_bytes
        )));
    }

    let size = data.len();
    let file = NewFile {
        name,
        content_type,
        data: data.to_vec(),
    };

    match state.db.insert_files(parent_id, vec![file]) {
        Ok(ids) => {
            info!(parent_id = %parent_id, size, "File uploaded");
            json_response(StatusCode::OK, &FilesResponse { id: ids })
        }
        Err(e) => service_error_response(e.into()),
    }
}

/// GET /rap/file/{id}
///
/// Returns the stored bytes with their content type.
pub async fn handle_find_file(raw_id: &str, state: Arc<AppState>) -> Response<BoxBody> {
    let id = match parse_id(raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    let file = match state.db.find_file(&id) {
        Ok(Some(file)) => file,
        Ok(None) => {
            return service_error_response(ServiceError::NotFound(format!(
                "File [{}] not found",
                id
            )))
        }
        Err(e) => return service_error_response(e.into()),
    };

    let content_type = HeaderValue::from_str(&file.meta.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, content_type)
        .header("Content-Length", file.data.len())
        .header(CONTENT_SHA256_HEADER, file.meta.sha256.as_str())
        .header("Access-Control-Allow-Origin", "*");

    if let Ok(name) = HeaderValue::from_str(&file.meta.name) {
        builder = builder.header(FILE_NAME_HEADER, name);
    }

    builder
        .body(full_body(file.data))
        .unwrap_or_else(|e| service_error_response(ServiceError::Internal(e.to_string())))
}

/// GET /rap/files/{parent_id}
pub async fn handle_find_files(parent_id: &str, state: Arc<AppState>) -> Response<BoxBody> {
    match state.db.list_files(parent_id) {
        Ok(files) => json_response(StatusCode::OK, &files),
        Err(e) => service_error_response(e.into()),
    }
}

/// DELETE /rap/file/{id}
pub async fn handle_delete_file(raw_id: &str, state: Arc<AppState>) -> Response<BoxBody> {
    let id = match parse_id(raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.delete_file(&id) {
        Ok(()) => json_response(StatusCode::OK, &DeletedFilesResponse { deleted: 1 }),
        Err(e) => service_error_response(e.into()),
    }
}

/// DELETE /rap/files/{parent_id}
pub async fn handle_delete_files(parent_id: &str, state: Arc<AppState>) -> Response<BoxBody> {
    match state.db.delete_files(parent_id) {
        Ok(deleted) => json_response(StatusCode::OK, &DeletedFilesResponse { deleted }),
        Err(e) => service_error_response(e.into()),
    }
}
