//! Account routes (all behind the access gate)

use bytes::Bytes;
use hyper::{Request, Response, StatusCode};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::Identity;
use crate::routes::response::{error_response, json_response, service_error_response, BoxBody};
use crate::server::AppState;
use crate::types::ServiceError;

#[derive(Debug, Serialize)]
struct DeletedResponse {
    deleted: String,
}

fn parse_id(raw: &str) -> Result<Uuid, Response<BoxBody>> {
    Uuid::parse_str(raw).map_err(|_| error_response(StatusCode::BAD_REQUEST, None, "Invalid id"))
}

/// GET /rap/users
pub async fn handle_list_users(state: Arc<AppState>) -> Response<BoxBody> {
    match state.db.list_users() {
        Ok(users) => json_response(StatusCode::OK, &users),
        Err(e) => service_error_response(e.into()),
    }
}

/// GET /rap/me
///
/// Reads the caller from the identity the access gate attached.
pub async fn handle_me(req: Request<Bytes>, state: Arc<AppState>) -> Response<BoxBody> {
    let Some(identity) = req.extensions().get::<Identity>() else {
        return service_error_response(ServiceError::Forbidden("No token given".into()));
    };

    match state.db.find_user_by_email(&identity.subject) {
        Ok(Some(user)) => json_response(StatusCode::OK, &user),
        Ok(None) => service_error_response(ServiceError::NotFound("user not found".into())),
        Err(e) => service_error_response(e.into()),
    }
}

/// GET /rap/{id}
pub async fn handle_find_user_by_id(raw_id: &str, state: Arc<AppState>) -> Response<BoxBody> {
    let id = match parse_id(raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.find_user_by_id(&id) {
        Ok(Some(user)) => json_response(StatusCode::OK, &user),
        Ok(None) => service_error_response(ServiceError::NotFound(format!("User [{}] not found", id))),
        Err(e) => service_error_response(e.into()),
    }
}

/// GET /rap/email/{email}
pub async fn handle_find_user_by_email(raw_email: &str, state: Arc<AppState>) -> Response<BoxBody> {
    let email = match urlencoding::decode(raw_email) {
        Ok(email) if !email.trim().is_empty() => email.into_owned(),
        _ => return error_response(StatusCode::BAD_REQUEST, None, "Invalid email"),
    };

    match state.db.find_user_by_email(&email) {
        Ok(Some(user)) => json_response(StatusCode::OK, &user),
        Ok(None) => service_error_response(ServiceError::NotFound("user not found".into())),
        Err(e) => service_error_response(e.into()),
    }
}

/// DELETE /rap/user/{id}
pub async fn handle_delete_user(raw_id: &str, state: Arc<AppState>) -> Response<BoxBody> {
    let id = match parse_id(raw_id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match state.db.delete_user(&id) {
        Ok(()) => json_response(
            StatusCode::OK,
            &DeletedResponse {
                deleted: id.to_string(),
            },
        ),
        Err(e) => service_error_response(e.into()),
    }
}
