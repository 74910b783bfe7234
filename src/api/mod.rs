mod error;
mod health;
mod items;
mod orders;
mod profiles;
mod session;

use axum::Router;
use serde::Deserialize;
use std::sync::Arc;

use crate::auth::{CookiePolicy, RefreshRotation};
use crate::db::StoreGate;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

pub use error::ApiError;
pub use session::SessionState;

/// State for routes backed by the document store.
#[derive(Clone)]
pub struct StoreState {
    pub jwt: Arc<JwtConfig>,
    pub cookies: CookiePolicy,
    pub store: StoreGate,
}

impl_has_auth_backend!(StoreState);

/// `?email=` on owner-scoped listings.
#[derive(Deserialize)]
struct OwnerQuery {
    email: String,
}

/// Create the API router.
pub fn create_api_router(
    store: StoreGate,
    jwt: Arc<JwtConfig>,
    cookies: CookiePolicy,
    rotation: RefreshRotation,
) -> Router {
    let session_state = SessionState {
        jwt: jwt.clone(),
        cookies: cookies.clone(),
        rotation,
    };

    let store_state = StoreState {
        jwt,
        cookies,
        store,
    };

    Router::new()
        .merge(health::router(store_state.clone()))
        .merge(session::router(session_state))
        .merge(items::router(store_state.clone()))
        .merge(orders::router(store_state.clone()))
        .merge(profiles::router(store_state))
}
