//! Turnstile - bearer-token gated account and file service
//!
//! Accounts register with a password (stored as an Argon2 hash), log in to
//! receive a short-lived HS256 access token and present it as
//! `Authorization: Bearer <token>` on every `/rap` route.
//!
//! ## Layout
//!
//! - **auth**: Password hashing, token issue/verify, access gate, login flows
//! - **db**: SQLite storage for accounts and file blobs
//! - **routes**: HTTP handlers and dispatch
//! - **server**: hyper accept loop and graceful shutdown

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{Result, ServiceError};
