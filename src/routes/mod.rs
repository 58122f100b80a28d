//! HTTP routes for turnstile
//!
//! Public: `/health`, `/version`, `/login`, `/register`.
//! Everything under `/rap` passes through the access gate first.

pub mod auth_routes;
pub mod files;
pub mod health;
pub mod response;
pub mod users;

use bytes::Bytes;
use hyper::{Method, Request, Response, StatusCode};
use std::sync::Arc;

use crate::server::AppState;

pub use auth_routes::{handle_login, handle_register};
pub use health::{health_check, version_info};
pub use response::{
    error_response, json_response, method_not_allowed, not_found_response, service_error_response,
    BoxBody, ErrorResponse,
};

/// Route a request whose body has already been collected
pub async fn dispatch(state: Arc<AppState>, mut req: Request<Bytes>) -> Response<BoxBody> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if method == Method::OPTIONS {
        return response::cors_preflight();
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        ["health"] => match method {
            Method::GET => health_check(state),
            _ => method_not_allowed(),
        },
        ["version"] => match method {
            Method::GET => version_info(),
            _ => method_not_allowed(),
        },
        ["login"] => match method {
            Method::POST => handle_login(req, state).await,
            _ => method_not_allowed(),
        },
        ["register"] => match method {
            Method::POST => handle_register(req, state).await,
            _ => method_not_allowed(),
        },
        ["rap", rest @ ..] => {
            if let Err(denial) = state.gate.authorize(&mut req, state.clock.now()) {
                return error_response(StatusCode::FORBIDDEN, None, denial.message());
            }
            protected(state, req, &method, rest).await
        }
        _ => not_found_response(&path),
    }
}

async fn protected(
    state: Arc<AppState>,
    req: Request<Bytes>,
    method: &Method,
    rest: &[&str],
) -> Response<BoxBody> {
    match (method, rest) {
        (&Method::GET, ["users"]) => users::handle_list_users(state).await,
        (&Method::GET, ["me"]) => users::handle_me(req, state).await,
        (&Method::GET, ["email", email]) => users::handle_find_user_by_email(email, state).await,
        (&Method::DELETE, ["user", id]) => users::handle_delete_user(id, state).await,

        (&Method::POST, ["file", parent_id]) => files::handle_add_file(req, parent_id, state).await,
        (&Method::GET, ["file", id]) => files::handle_find_file(id, state).await,
        (&Method::DELETE, ["file", id]) => files::handle_delete_file(id, state).await,
        (&Method::GET, ["files", parent_id]) => files::handle_find_files(parent_id, state).await,
        (&Method::DELETE, ["files", parent_id]) => {
            files::handle_delete_files(parent_id, state).await
        }

        (&Method::GET, [id]) if !matches!(*id, "users" | "me") => {
            users::handle_find_user_by_id(id, state).await
        }

        (_, ["users"])
        | (_, ["me"])
        | (_, ["email", _])
        | (_, ["user", _])
        | (_, ["file", _])
        | (_, ["files", _])
        | (_, [_]) => method_not_allowed(),

        _ => not_found_response(req.uri().path()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ManualClock;
    use crate::config::test_args;
    use crate::db::Database;
    use http_body_util::BodyExt;
    use hyper::header::{AUTHORIZATION, CONTENT_TYPE};

    const T0: u64 = 1_700_000_000;

    fn test_state() -> (Arc<AppState>, Arc<ManualClock>) {
        let args = test_args(&[
            ("--token-secret", "routes-test-secret"),
            ("--max-upload-bytes", "16"),
        ]);
        let clock = Arc::new(ManualClock::new(T0));
        let db = Arc::new(Database::open_in_memory().unwrap());
        let state = AppState::new(args, db, clock.clone()).unwrap();
        (Arc::new(state), clock)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: &str) -> Request<Bytes> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        builder.body(Bytes::from(body.to_string())).unwrap()
    }

    async fn body_json(response: Response<BoxBody>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register_and_login(state: &Arc<AppState>) -> String {
        let resp = dispatch(
            Arc::clone(state),
            request(
                Method::POST,
                "/register",
                None,
                r#"{"first_name":"Ada","last_name":"Lovelace","email":"a@x.com","password":"pw1"}"#,
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = dispatch(
            Arc::clone(state),
            request(
                Method::POST,
                "/login",
                None,
                r#"{"email":"a@x.com","password":"pw1"}"#,
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        body_json(resp).await["Token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_public_routes() {
        let (state, _) = test_state();

        let resp = dispatch(Arc::clone(&state), request(Method::GET, "/health", None, "")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["database"], "up");

        let resp = dispatch(Arc::clone(&state), request(Method::GET, "/version", None, "")).await;
        assert_eq!(body_json(resp).await["service"], "turnstile");

        let resp = dispatch(Arc::clone(&state), request(Method::GET, "/login", None, "")).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);

        let resp = dispatch(state, request(Method::GET, "/nope", None, "")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_gate_messages() {
        let (state, _) = test_state();

        let resp = dispatch(Arc::clone(&state), request(Method::GET, "/rap/users", None, "")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json = body_json(resp).await;
        assert_eq!(json["status"], 403);
        assert_eq!(json["error"], serde_json::Value::Null);
        assert_eq!(json["message"], "No token given");

        let mut req = request(Method::GET, "/rap/users", None, "");
        req.headers_mut()
            .insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        let resp = dispatch(Arc::clone(&state), req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(resp).await["message"], "Bad token");

        let resp = dispatch(state, request(Method::GET, "/rap/users", Some("garbage"), "")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(resp).await["message"], "Invalid login token or expired");
    }

    #[tokio::test]
    async fn test_user_routes() {
        let (state, _) = test_state();
        let token = register_and_login(&state).await;

        let resp = dispatch(
            Arc::clone(&state),
            request(Method::GET, "/rap/users", Some(&token), ""),
        )
        .await;
        let users = body_json(resp).await;
        assert_eq!(users.as_array().unwrap().len(), 1);
        assert!(users[0].get("password").is_none());
        let id = users[0]["id"].as_str().unwrap().to_string();

        let resp = dispatch(Arc::clone(&state), request(Method::GET, "/rap/me", Some(&token), "")).await;
        assert_eq!(body_json(resp).await["email"], "a@x.com");

        let resp = dispatch(
            Arc::clone(&state),
            request(Method::GET, &format!("/rap/{}", id), Some(&token), ""),
        )
        .await;
        assert_eq!(body_json(resp).await["first_name"], "Ada");

        let resp = dispatch(
            Arc::clone(&state),
            request(Method::GET, "/rap/email/a%40x.com", Some(&token), ""),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = dispatch(
            Arc::clone(&state),
            request(Method::GET, "/rap/not-a-uuid", Some(&token), ""),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = dispatch(
            Arc::clone(&state),
            request(Method::DELETE, &format!("/rap/user/{}", id), Some(&token), ""),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = dispatch(
            state,
            request(Method::GET, &format!("/rap/{}", id), Some(&token), ""),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_file_routes() {
        let (state, _) = test_state();
        let token = register_and_login(&state).await;

        let mut upload = request(Method::POST, "/rap/file/parent-1", Some(&token), "hello");
        upload
            .headers_mut()
            .insert(CONTENT_TYPE, "text/plain".parse().unwrap());
        upload
            .headers_mut()
            .insert(files::FILE_NAME_HEADER, "hello.txt".parse().unwrap());
        let resp = dispatch(Arc::clone(&state), upload).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let file_id = body_json(resp).await["ID"][0].as_str().unwrap().to_string();

        let resp = dispatch(
            Arc::clone(&state),
            request(Method::GET, &format!("/rap/file/{}", file_id), Some(&token), ""),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[CONTENT_TYPE], "text/plain");
        assert_eq!(resp.headers()[files::FILE_NAME_HEADER], "hello.txt");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"hello");

        let resp = dispatch(
            Arc::clone(&state),
            request(Method::GET, "/rap/files/parent-1", Some(&token), ""),
        )
        .await;
        assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

        // Missing name header
        let resp = dispatch(
            Arc::clone(&state),
            request(Method::POST, "/rap/file/parent-1", Some(&token), "data"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        // Over the 16 byte test cap
        let mut big = request(
            Method::POST,
            "/rap/file/parent-1",
            Some(&token),
            "this body is longer than sixteen bytes",
        );
        big.headers_mut()
            .insert(files::FILE_NAME_HEADER, "big.bin".parse().unwrap());
        let resp = dispatch(Arc::clone(&state), big).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let resp = dispatch(
            Arc::clone(&state),
            request(Method::DELETE, "/rap/files/parent-1", Some(&token), ""),
        )
        .await;
        assert_eq!(body_json(resp).await["deleted"], 1);

        let resp = dispatch(
            state,
            request(Method::GET, &format!("/rap/file/{}", file_id), Some(&token), ""),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
