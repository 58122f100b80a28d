//! HTTP server implementation
//!
//! Accept loop on hyper 1 with one task per connection. Each request body is
//! collected under the upload cap, then handed to [`routes::dispatch`] under
//! the request timeout.

use bytes::Bytes;
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::auth::{
    AccessGate, AuthService, Clock, PasswordHasher, SigningKey, TokenIssuer, TokenVerifier,
};
use crate::config::Args;
use crate::db::Database;
use crate::routes::{self, error_response, service_error_response, BoxBody};
use crate::types::ServiceError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    pub db: Arc<Database>,
    pub auth: AuthService,
    pub gate: AccessGate,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire the auth core to the database and clock
    ///
    /// The issuer and the verifier share one signing key.
    pub fn new(args: Args, db: Arc<Database>, clock: Arc<dyn Clock>) -> Result<Self, ServiceError> {
        let key = Arc::new(SigningKey::new(
            args.token_secret().map_err(ServiceError::Config)?,
        )?);
        let params = args.hash_params().map_err(ServiceError::Config)?;

        let issuer = TokenIssuer::new(Arc::clone(&key), args.token_ttl());
        let gate = AccessGate::new(TokenVerifier::new(key));
        let auth = AuthService::new(
            PasswordHasher::new(params),
            issuer,
            db.clone(),
            Arc::clone(&clock),
        )?;

        Ok(Self {
            args,
            db,
            auth,
            gate,
            clock,
        })
    }
}

/// Start the HTTP server and run until a shutdown signal arrives
pub async fn run(state: Arc<AppState>) -> Result<(), ServiceError> {
    let listener = TcpListener::bind(state.args.listen).await?;
    info!("Turnstile listening on {}", state.args.listen);

    serve(listener, state, shutdown_signal()).await
}

/// Serve connections from `listener` until `shutdown` resolves
///
/// In-flight connections are asked to finish gracefully and are given
/// `shutdown_timeout` before being dropped.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<(), ServiceError>
where
    F: std::future::Future<Output = ()>,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    let mut connections = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown signal received, draining {} connection(s)", connections.len());
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let state = Arc::clone(&state);
                    let mut stop_rx = stop_rx.clone();
                    connections.spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { handle_request(state, addr, req).await }
                        });

                        let conn = http1::Builder::new()
                            .preserve_header_case(true)
                            .title_case_headers(true)
                            .serve_connection(io, service);
                        tokio::pin!(conn);

                        let result = tokio::select! {
                            res = conn.as_mut() => res,
                            _ = stop_rx.changed() => {
                                conn.as_mut().graceful_shutdown();
                                conn.as_mut().await
                            }
                        };

                        if let Err(err) = result {
                            debug!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            },
            // Reap finished connection tasks
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    let _ = stop_tx.send(true);

    let drain = async { while connections.join_next().await.is_some() {} };
    if tokio::time::timeout(state.args.shutdown_timeout(), drain)
        .await
        .is_err()
    {
        warn!(
            "Shutdown timeout after {:?}, aborting {} connection(s)",
            state.args.shutdown_timeout(),
            connections.len()
        );
        connections.abort_all();
    }

    info!("Turnstile stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Collect the body, then route under the request timeout
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let response = match tokio::time::timeout(
        state.args.request_timeout(),
        process(Arc::clone(&state), req),
    )
    .await
    {
        Ok(response) => response,
        Err(_) => {
            warn!("[{}] {} {} timed out", addr, method, path);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                Some("timeout"),
                "Request timed out",
            )
        }
    };

    info!(
        addr = %addr,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request"
    );

    Ok(response)
}

async fn process(state: Arc<AppState>, req: Request<Incoming>) -> Response<BoxBody> {
    let req = match collect_body(req, state.args.max_upload_bytes).await {
        Ok(req) => req,
        Err(resp) => return resp,
    };
    routes::dispatch(state, req).await
}

/// Buffer the request body, refusing anything over `limit` bytes
async fn collect_body(
    req: Request<Incoming>,
    limit: usize,
) -> Result<Request<Bytes>, Response<BoxBody>> {
    let too_large = || {
        service_error_response(ServiceError::PayloadTooLarge(format!(
            "Request body exceeds {} bytes",
            limit
        )))
    };

    let declared = req
        .headers()
        .get(hyper::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(too_large());
    }

    let (parts, body) = req.into_parts();
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(Request::from_parts(parts, collected.to_bytes())),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => Err(too_large()),
        Err(e) => {
            debug!("Failed to read request body: {}", e);
            Err(error_response(
                StatusCode::BAD_REQUEST,
                None,
                "Failed to read request body",
            ))
        }
    }
}
