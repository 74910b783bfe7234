//! Session API endpoints.
//!
//! - POST `/jwt` - Issue access and refresh cookies from the submitted claims
//! - POST `/refresh` - Exchange the refresh cookie for a new access cookie
//! - POST `/logout` - Clear both cookies
//! - GET `/me` - Return the identity carried by the access cookie

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use std::sync::Arc;
use tracing::{debug, error};

use super::error::ApiError;
use crate::auth::{
    Auth, AuthError, CookiePolicy, RefreshRotation, issue_session, refresh_session,
    terminate_session,
};
use crate::impl_has_auth_backend;
use crate::jwt::{Claims, JwtConfig};

#[derive(Clone)]
pub struct SessionState {
    pub jwt: Arc<JwtConfig>,
    pub cookies: CookiePolicy,
    pub rotation: RefreshRotation,
}

impl_has_auth_backend!(SessionState);

pub fn router(state: SessionState) -> Router {
    Router::new()
        .route("/jwt", post(issue_tokens))
        .route("/refresh", post(refresh_token))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

fn success() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true }))
}

/// Login: sign the submitted claims into both tokens and set them as cookies.
/// Claims are taken as-is; whoever calls this decides what identity to embed.
async fn issue_tokens(
    State(state): State<SessionState>,
    Json(claims): Json<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let cookies = issue_session(&state.jwt, &state.cookies, &claims).map_err(|e| {
        error!(error = %e, "Failed to issue session tokens");
        ApiError::internal("Failed to issue token")
    })?;

    debug!(claims = claims.len(), "Session issued");

    Ok((
        StatusCode::OK,
        AppendHeaders(cookies.map(|cookie| (SET_COOKIE, cookie))),
        success(),
    ))
}

/// Mint a new access token from the refresh cookie.
/// The refreshed access token carries only the `email` claim.
async fn refresh_token(
    State(state): State<SessionState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AuthError> {
    let cookies = refresh_session(&state.jwt, &state.cookies, &headers, state.rotation)?;

    Ok((
        StatusCode::OK,
        AppendHeaders(cookies.into_iter().map(|cookie| (SET_COOKIE, cookie))),
        success(),
    ))
}

/// Logout: clear both cookies with the attributes they were set with.
/// The tokens themselves stay valid until they expire.
async fn logout(State(state): State<SessionState>) -> impl IntoResponse {
    let cookies = terminate_session(&state.cookies);

    (
        StatusCode::OK,
        AppendHeaders(cookies.map(|cookie| (SET_COOKIE, cookie))),
        success(),
    )
}

async fn me(Auth(identity): Auth) -> Json<Claims> {
    Json(identity.claims)
}
