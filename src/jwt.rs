//! JWT token signing and verification.
//!
//! Two token classes share the same payload shape but never a key:
//! - Access tokens: short-lived (15 min), signed with the access secret
//! - Refresh tokens: long-lived (7 days), signed with the refresh secret
//!
//! The payload is the caller's claims, embedded verbatim, plus `iat` and `exp`.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identity attributes carried by a token. Open-ended: whatever was submitted at login.
pub type Claims = Map<String, Value>;

/// Access token duration: 15 minutes
pub const ACCESS_TOKEN_DURATION_SECS: u64 = 15 * 60;

/// Refresh token duration: 7 days
pub const REFRESH_TOKEN_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Claim names owned by the codec. Caller values under these names are replaced.
const REGISTERED_CLAIMS: [&str; 2] = ["iat", "exp"];

/// Token class, used for logging and to pick the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SignedClaims {
    #[serde(flatten)]
    claims: Claims,
    iat: u64,
    exp: u64,
}

/// Result of signing a token.
#[derive(Debug, Clone)]
pub struct SignedToken {
    /// The JWT token string
    pub token: String,
    /// Token duration in seconds
    pub duration: u64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: u64,
}

/// Signs and verifies one class of token with its own secret and lifetime.
#[derive(Clone)]
pub struct TokenCodec {
    kind: TokenKind,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    duration: u64,
}

impl TokenCodec {
    pub fn new(kind: TokenKind, secret: &[u8], duration: u64) -> Self {
        Self {
            kind,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            duration,
        }
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn duration(&self) -> u64 {
        self.duration
    }

    /// Sign `claims` with an expiry of `duration` seconds from now.
    pub fn sign(&self, claims: &Claims) -> Result<SignedToken, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|_| JwtError::TimeError)?
            .as_secs();
        self.sign_at(claims, now)
    }

    /// Sign `claims` as if issued at `issued_at` (Unix seconds).
    pub fn sign_at(&self, claims: &Claims, issued_at: u64) -> Result<SignedToken, JwtError> {
        let mut claims = claims.clone();
        for name in REGISTERED_CLAIMS {
            claims.remove(name);
        }

        let exp = issued_at + self.duration;
        let payload = SignedClaims {
            claims,
            iat: issued_at,
            exp,
        };

        let token = jsonwebtoken::encode(&Header::default(), &payload, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(SignedToken {
            token,
            duration: self.duration,
            expires_at: exp,
        })
    }

    /// Check signature and expiry, returning the embedded claims without `iat`/`exp`.
    pub fn verify(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // `aud` and friends are ordinary caller claims here; only `exp` is enforced.
        validation.validate_aud = false;

        let token_data = jsonwebtoken::decode::<SignedClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::Expired,
                _ => JwtError::Invalid(e),
            })?;

        Ok(token_data.claims.claims)
    }
}

/// The access/refresh codec pair. The two secrets are independent.
#[derive(Clone)]
pub struct JwtConfig {
    access: TokenCodec,
    refresh: TokenCodec,
}

impl JwtConfig {
    pub fn new(access_secret: &[u8], refresh_secret: &[u8]) -> Self {
        Self {
            access: TokenCodec::new(TokenKind::Access, access_secret, ACCESS_TOKEN_DURATION_SECS),
            refresh: TokenCodec::new(
                TokenKind::Refresh,
                refresh_secret,
                REFRESH_TOKEN_DURATION_SECS,
            ),
        }
    }

    pub fn access(&self) -> &TokenCodec {
        &self.access
    }

    pub fn refresh(&self) -> &TokenCodec {
        &self.refresh
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Token is past its expiry
    Expired,
    /// Bad signature, wrong key, or malformed token
    Invalid(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::Invalid(e) => write!(f, "Invalid token: {}", e),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
