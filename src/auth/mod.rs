//! Authentication and access control
//!
//! Provides:
//! - Password hashing with Argon2
//! - Access token issuance and verification (HS256 JWT)
//! - The bearer-token access gate for protected routes
//! - Registration and login flows over a credential store

pub mod clock;
pub mod credentials;
pub mod gate;
pub mod password;
pub mod service;
pub mod token;

pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{CredentialRecord, CredentialStore, MemoryCredentialStore, NewAccount};
pub use gate::{extract_bearer, AccessGate, Denial, BEARER_PREFIX};
pub use password::PasswordHasher;
pub use service::{AuthService, INVALID_CREDENTIALS};
pub use token::{Claims, Identity, RejectReason, Rejected, SigningKey, TokenIssuer, TokenVerifier};
