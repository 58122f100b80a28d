//! Shared types for turnstile

pub mod account;
pub mod error;

pub use account::{LoginRequest, RegisterRequest, TokenResponse, UserResponse};
pub use error::{Result, ServiceError, StoreError};
