//! Access gate for protected routes
//!
//! Each request passes through the gate once. The gate reads the
//! `Authorization` header, hands the bearer token to the verifier and either
//! attaches the verified [`Identity`] to the request extensions or produces a
//! [`Denial`]. Handlers behind the gate read the caller from
//! `req.extensions().get::<Identity>()`.

use hyper::header::AUTHORIZATION;
use hyper::Request;
use tracing::debug;

use crate::auth::token::{Identity, TokenVerifier};

/// Expected authorization scheme prefix
pub const BEARER_PREFIX: &str = "Bearer ";

/// Why the gate turned a request away
///
/// Every variant renders the same response shape; only the message differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    NoHeader,
    MalformedScheme,
    EmptyToken,
    InvalidToken,
}

impl Denial {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoHeader => "No token given",
            Self::MalformedScheme => "Bad token",
            Self::EmptyToken => "Invalid authorization token",
            Self::InvalidToken => "Invalid login token or expired",
        }
    }
}

/// Pull the bearer token out of a raw header value
pub fn extract_bearer(header: Option<&str>) -> Result<&str, Denial> {
    let header = match header {
        Some(h) if !h.trim().is_empty() => h,
        _ => return Err(Denial::NoHeader),
    };

    let token = header
        .strip_prefix(BEARER_PREFIX)
        .ok_or(Denial::MalformedScheme)?
        .trim();

    if token.is_empty() {
        return Err(Denial::EmptyToken);
    }

    Ok(token)
}

/// Bearer-token gate in front of protected handlers
#[derive(Debug, Clone)]
pub struct AccessGate {
    verifier: TokenVerifier,
}

impl AccessGate {
    pub fn new(verifier: TokenVerifier) -> Self {
        Self { verifier }
    }

    /// Check a header value without touching a request
    pub fn check(&self, header: Option<&str>, now: u64) -> Result<Identity, Denial> {
        let token = extract_bearer(header)?;
        self.verifier
            .verify(token, now)
            .map_err(|_| Denial::InvalidToken)
    }

    /// Authorize a request, attaching the verified identity on success
    pub fn authorize<B>(&self, req: &mut Request<B>, now: u64) -> Result<Identity, Denial> {
        let header = match req.headers().get(AUTHORIZATION) {
            Some(value) => match value.to_str() {
                Ok(s) => Some(s),
                Err(_) => return self.deny(req, Denial::MalformedScheme),
            },
            None => None,
        };

        match self.check(header, now) {
            Ok(identity) => {
                req.extensions_mut().insert(identity.clone());
                Ok(identity)
            }
            Err(denial) => self.deny(req, denial),
        }
    }

    fn deny<B>(&self, req: &Request<B>, denial: Denial) -> Result<Identity, Denial> {
        debug!(
            path = %req.uri().path(),
            reason = ?denial,
            "Access gate rejected request"
        );
        Err(denial)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::token::{SigningKey, TokenIssuer};
    use std::sync::Arc;
    use std::time::Duration;

    const T0: u64 = 1_700_000_000;

    fn setup() -> (TokenIssuer, AccessGate) {
        let key = Arc::new(SigningKey::new("gate-test-secret").unwrap());
        (
            TokenIssuer::new(Arc::clone(&key), Duration::from_secs(300)),
            AccessGate::new(TokenVerifier::new(key)),
        )
    }

    fn request(auth: Option<&str>) -> Request<()> {
        let mut builder = Request::builder().uri("/rap/users");
        if let Some(value) = auth {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc123")), Ok("abc123"));
        assert_eq!(extract_bearer(None), Err(Denial::NoHeader));
        assert_eq!(extract_bearer(Some("")), Err(Denial::NoHeader));
        assert_eq!(extract_bearer(Some("Bearer ")), Err(Denial::EmptyToken));
        assert_eq!(extract_bearer(Some("Bearer    ")), Err(Denial::EmptyToken));
        assert_eq!(extract_bearer(Some("Basic abc123")), Err(Denial::MalformedScheme));
        assert_eq!(extract_bearer(Some("abc123")), Err(Denial::MalformedScheme));
        // Scheme must be a prefix, not merely present
        assert_eq!(extract_bearer(Some("xBearer abc")), Err(Denial::MalformedScheme));
    }

    #[test]
    fn test_rejections() {
        let (issuer, gate) = setup();
        let token = issuer.issue("a@x.com", false, T0).unwrap();
        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });

        assert_eq!(gate.authorize(&mut request(None), T0), Err(Denial::NoHeader));
        assert_eq!(gate.authorize(&mut request(Some("")), T0), Err(Denial::NoHeader));
        assert_eq!(gate.authorize(&mut request(Some("Bearer ")), T0), Err(Denial::EmptyToken));
        assert_eq!(
            gate.authorize(&mut request(Some(&format!("Bearer {}", tampered))), T0),
            Err(Denial::InvalidToken)
        );
        assert_eq!(
            gate.authorize(&mut request(Some(&format!("Token {}", token))), T0),
            Err(Denial::MalformedScheme)
        );
    }

    #[test]
    fn test_accepts_and_attaches_identity() {
        let (issuer, gate) = setup();
        let token = issuer.issue("a@x.com", true, T0).unwrap();
        let mut req = request(Some(&format!("Bearer {}", token)));

        let identity = gate.authorize(&mut req, T0 + 10).unwrap();
        assert_eq!(identity.subject, "a@x.com");
        assert_eq!(req.extensions().get::<Identity>(), Some(&identity));
        assert_eq!(req.uri().path(), "/rap/users");
    }

    #[test]
    fn test_rejects_after_expiry() {
        let (issuer, gate) = setup();
        let token = issuer.issue("a@x.com", false, T0).unwrap();
        let header = format!("Bearer {}", token);

        assert!(gate.check(Some(&header), T0 + 299).is_ok());
        assert_eq!(gate.check(Some(&header), T0 + 301), Err(Denial::InvalidToken));
    }

    #[test]
    fn test_rejected_request_has_no_identity() {
        let (_, gate) = setup();
        let mut req = request(Some("Bearer nope"));
        assert!(gate.authorize(&mut req, T0).is_err());
        assert!(req.extensions().get::<Identity>().is_none());
    }
}
