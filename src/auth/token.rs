use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hkdf::Hkdf;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

/// Purpose tag for password reset links.
pub const RESET_PASSWORD: &str = "reset-password";

const HKDF_INFO: &[u8] = b"passreset-token-v1";

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
}

#[derive(Debug, PartialEq)]
pub enum TokenError {
    /// Bad signature, wrong purpose, malformed token or claims.
    Invalid,
    Expired,
    Signing(String),
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenError::Invalid => write!(f, "token is invalid"),
            TokenError::Expired => write!(f, "token has expired"),
            TokenError::Signing(msg) => write!(f, "token signing failed: {msg}"),
        }
    }
}

impl std::error::Error for TokenError {}

/// Issues and verifies stateless, time-stamped tokens that bind an email
/// address to a purpose.
#[derive(Clone)]
pub struct TokenSigner {
    secret: String,
}

impl TokenSigner {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn purpose_key(&self, purpose: &str) -> [u8; 32] {
        let hk = Hkdf::<Sha256>::new(Some(purpose.as_bytes()), self.secret.as_bytes());
        let mut okm = [0u8; 32];
        hk.expand(HKDF_INFO, &mut okm)
            .expect("32 bytes is a valid HKDF-SHA256 output length");
        okm
    }

    pub fn issue(&self, email: &str, purpose: &str) -> Result<String, TokenError> {
        self.issue_at(email, purpose, Utc::now())
    }

    pub fn issue_at(
        &self,
        email: &str,
        purpose: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            sub: email.to_string(),
            iat: issued_at.timestamp(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(&self.purpose_key(purpose)),
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Returns the email the token was issued for, if the signature matches
    /// `purpose` and the token is no older than `ttl`.
    pub fn verify(&self, token: &str, purpose: &str, ttl: Duration) -> Result<String, TokenError> {
        self.verify_at(token, purpose, ttl, Utc::now())
    }

    pub fn verify_at(
        &self,
        token: &str,
        purpose: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        // Expiry is judged against `ttl` below, not an `exp` claim.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(&self.purpose_key(purpose)),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("Token rejected: {e}");
            TokenError::Invalid
        })?;

        let max_age = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX);
        if now.timestamp().saturating_sub(claims.iat) > max_age {
            return Err(TokenError::Expired);
        }

        Ok(claims.sub)
    }
}
