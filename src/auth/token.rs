//! Access token issuance and verification
//!
//! Tokens are HS256 JWTs signed with a single process-wide secret. They are
//! stateless: validity depends only on the signature and the expiry claim at
//! the moment of verification.
//!
//! Security notes:
//! - The issuer and verifier must share one `SigningKey`; rotating it
//!   invalidates every token issued before the rotation
//! - Verification failures collapse into one caller-visible `Rejected`;
//!   the specific reason only goes to the debug log

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::types::ServiceError;

/// Shared HMAC secret for signing and verifying tokens
#[derive(Clone)]
pub struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    /// Build a key from the configured secret
    ///
    /// An empty or blank secret is a configuration error.
    pub fn new(secret: &str) -> Result<Self, ServiceError> {
        if secret.trim().is_empty() {
            return Err(ServiceError::Config("token signing secret is empty".into()));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Payload stored in an access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Account identity (email)
    pub sub: String,
    /// Whether the account requires a second factor
    #[serde(rename = "2fa")]
    pub second_factor: bool,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
    /// Not before (Unix timestamp)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<u64>,
}

/// Verified caller identity, attached to the request by the access gate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub second_factor: bool,
    pub expires_at: u64,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            second_factor: claims.second_factor,
            expires_at: claims.exp,
        }
    }
}

/// Caller-visible verification failure. Carries no reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("token rejected")]
pub struct Rejected;

/// Internal reason a token failed verification (log only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Malformed,
    BadSignature,
    Expired,
    NotYetValid,
    MissingClaim,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::Malformed => "malformed token",
            Self::BadSignature => "invalid signature",
            Self::Expired => "token expired",
            Self::NotYetValid => "token not yet valid",
            Self::MissingClaim => "required claim missing",
        };
        f.write_str(reason)
    }
}

/// Signs new access tokens
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: Arc<SigningKey>,
    ttl_seconds: u64,
}

impl TokenIssuer {
    pub fn new(key: Arc<SigningKey>, ttl: Duration) -> Self {
        Self {
            key,
            ttl_seconds: ttl.as_secs(),
        }
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    /// Issue a token for `identity`, valid for `[now, now + ttl)`
    pub fn issue(
        &self,
        identity: &str,
        second_factor: bool,
        now: u64,
    ) -> Result<String, ServiceError> {
        let claims = Claims {
            sub: identity.to_string(),
            second_factor,
            iat: now,
            exp: now.saturating_add(self.ttl_seconds),
            nbf: None,
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, ServiceError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.key.encoding)
            .map_err(|e| ServiceError::Internal(format!("Failed to generate token: {}", e)))
    }
}

/// Checks signature and validity window of access tokens
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    key: Arc<SigningKey>,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(key: Arc<SigningKey>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Time claims are checked against the caller-supplied clock below.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self { key, validation }
    }

    /// Verify a token, reporting the specific failure reason
    pub fn inspect(&self, token: &str, now: u64) -> Result<Claims, RejectReason> {
        let data = decode::<Claims>(token, &self.key.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => RejectReason::BadSignature,
                ErrorKind::MissingRequiredClaim(_) => RejectReason::MissingClaim,
                ErrorKind::ExpiredSignature => RejectReason::Expired,
                ErrorKind::ImmatureSignature => RejectReason::NotYetValid,
                _ => RejectReason::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.sub.is_empty() {
            return Err(RejectReason::MissingClaim);
        }
        if now >= claims.exp {
            return Err(RejectReason::Expired);
        }
        if let Some(nbf) = claims.nbf {
            if now < nbf {
                return Err(RejectReason::NotYetValid);
            }
        }

        Ok(claims)
    }

    /// Verify a token, yielding the embedded identity or a uniform rejection
    pub fn verify(&self, token: &str, now: u64) -> Result<Identity, Rejected> {
        self.inspect(token, now).map(Identity::from).map_err(|reason| {
            debug!(%reason, "Access token rejected");
            Rejected
        })
    }
}
