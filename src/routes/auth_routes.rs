//! HTTP routes for authentication
//!
//! - POST /register - Create an account (password stored as an Argon2 hash)
//! - POST /login    - Check credentials and return `{"Token": "<jwt>"}`

use bytes::Bytes;
use hyper::{Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::routes::response::{json_response, service_error_response, BoxBody};
use crate::server::AppState;
use crate::types::{LoginRequest, RegisterRequest, ServiceError};

fn parse_json_body<T: DeserializeOwned>(req: &Request<Bytes>) -> Result<T, ServiceError> {
    serde_json::from_slice(req.body())
        .map_err(|e| ServiceError::BadRequest(format!("Invalid JSON body: {}", e)))
}

/// Run CPU-heavy password work off the async workers
async fn run_blocking<T, F>(f: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ServiceError::Internal(format!("Password task failed: {}", e)))?
}

/// POST /register
pub async fn handle_register(req: Request<Bytes>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: RegisterRequest = match parse_json_body(&req) {
        Ok(b) => b,
        Err(e) => return service_error_response(e),
    };

    let auth = state.auth.clone();
    match run_blocking(move || auth.register(body)).await {
        Ok(user) => json_response(StatusCode::OK, &user),
        Err(e) => service_error_response(e),
    }
}

/// POST /login
pub async fn handle_login(req: Request<Bytes>, state: Arc<AppState>) -> Response<BoxBody> {
    let body: LoginRequest = match parse_json_body(&req) {
        Ok(b) => b,
        Err(e) => return service_error_response(e),
    };

    let auth = state.auth.clone();
    match run_blocking(move || auth.login(body)).await {
        Ok(token) => json_response(StatusCode::OK, &token),
        Err(e) => service_error_response(e),
    }
}
