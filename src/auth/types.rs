//! Authentication identity types.

use crate::jwt::Claims;

/// Claims decoded from a verified access token, scoped to one request.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub claims: Claims,
}

impl Identity {
    pub fn new(claims: Claims) -> Self {
        Self { claims }
    }

    /// The `email` claim. Present in every token minted by this service
    /// whose login claims carried one, including refreshed access tokens.
    pub fn email(&self) -> Option<&str> {
        self.claims.get("email").and_then(|v| v.as_str())
    }

    /// The `uid` claim. Only present on tokens issued at login: refreshed
    /// access tokens carry `email` alone.
    pub fn uid(&self) -> Option<&str> {
        self.claims.get("uid").and_then(|v| v.as_str())
    }
}
