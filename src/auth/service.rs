//! Registration and login flows
//!
//! Registration: validate -> hash -> store.
//! Login: store lookup -> hash compare -> issue token.

use std::sync::Arc;
use tracing::{debug, error, info};

use crate::auth::clock::Clock;
use crate::auth::credentials::{CredentialStore, NewAccount};
use crate::auth::password::PasswordHasher;
use crate::auth::token::TokenIssuer;
use crate::types::{
    LoginRequest, RegisterRequest, ServiceError, StoreError, TokenResponse, UserResponse,
};

/// Message returned for every failed login, whatever the cause
pub const INVALID_CREDENTIALS: &str = "Invalid Username/Password";

/// Checked against when the identity is unknown so that login always pays
/// one hash verification
const DECOY_PASSWORD: &str = "turnstile-decoy-password";

/// Credential-and-token core used by the login and register routes
#[derive(Clone)]
pub struct AuthService {
    hasher: PasswordHasher,
    issuer: TokenIssuer,
    store: Arc<dyn CredentialStore>,
    clock: Arc<dyn Clock>,
    decoy_hash: Arc<str>,
}

impl AuthService {
    /// Build the service, hashing the decoy password under the configured cost
    pub fn new(
        hasher: PasswordHasher,
        issuer: TokenIssuer,
        store: Arc<dyn CredentialStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ServiceError> {
        let decoy_hash: Arc<str> = hasher.hash(DECOY_PASSWORD)?.into();

        Ok(Self {
            hasher,
            issuer,
            store,
            clock,
            decoy_hash,
        })
    }

    /// Create an account, storing only the password hash
    pub fn register(&self, request: RegisterRequest) -> Result<UserResponse, ServiceError> {
        if let Some(field) = request.missing_field() {
            return Err(ServiceError::BadRequest(format!("{} is required", field)));
        }

        debug!("Registering user");

        match self.store.find_by_identity(&request.email) {
            Ok(Some(_)) => return Err(ServiceError::Conflict("Conflict Email".into())),
            Ok(None) => {}
            Err(e) => return Err(storage_failure(e)),
        }

        let password_hash = self.hasher.hash(&request.password)?;

        let id = self
            .store
            .insert(NewAccount {
                first_name: request.first_name.clone(),
                last_name: request.last_name.clone(),
                email: request.email.clone(),
                password_hash,
                second_factor: request.second_factor,
            })
            .map_err(|e| match e {
                StoreError::Duplicate(_) => ServiceError::Conflict("Conflict Email".into()),
                other => storage_failure(other),
            })?;

        info!(email = %request.email, user_id = %id, "User registered");

        Ok(UserResponse {
            id: id.to_string(),
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            second_factor: request.second_factor,
        })
    }

    /// Check credentials and issue an access token
    pub fn login(&self, request: LoginRequest) -> Result<TokenResponse, ServiceError> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(ServiceError::BadRequest(
                "Missing required fields: email, password".into(),
            ));
        }

        info!(email = %request.email, "Login attempt");

        let record = match self.store.find_by_identity(&request.email) {
            Ok(Some(record)) => record,
            Ok(None) => {
                // Same hash work as a wrong password
                let _ = self.hasher.verify(&self.decoy_hash, &request.password);
                debug!(email = %request.email, "Login failed - user not found");
                return Err(ServiceError::Auth(INVALID_CREDENTIALS.into()));
            }
            Err(e) => return Err(storage_failure(e)),
        };

        if !self.hasher.verify(&record.password_hash, &request.password) {
            debug!(email = %request.email, "Login failed - password mismatch");
            return Err(ServiceError::Auth(INVALID_CREDENTIALS.into()));
        }

        let token = self
            .issuer
            .issue(&record.identity, record.second_factor, self.clock.now())?;

        Ok(TokenResponse { token })
    }
}

fn storage_failure(err: StoreError) -> ServiceError {
    error!("Credential store failure: {}", err);
    ServiceError::Database(err.to_string())
}
