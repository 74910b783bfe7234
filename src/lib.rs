pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;

use api::create_api_router;
use auth::{CookiePolicy, RefreshRotation};
use axum::{Router, http::HeaderValue};
use db::StoreGate;
use jwt::JwtConfig;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;

pub struct ServerConfig {
    /// Document store, possibly not yet installed
    pub store: StoreGate,
    /// Secret for signing access tokens
    pub access_secret: Vec<u8>,
    /// Secret for signing refresh tokens, independent of the access secret
    pub refresh_secret: Vec<u8>,
    /// Production deployments get cross-site, Secure cookies
    pub is_production: bool,
    /// Origins allowed to make credentialed cross-origin requests.
    /// Empty means permissive CORS without credentials.
    pub allowed_origins: Vec<String>,
    /// Whether `/refresh` also reissues the refresh cookie
    pub refresh_rotation: RefreshRotation,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(
        &config.access_secret,
        &config.refresh_secret,
    ));
    let cookies = CookiePolicy::new(config.is_production);

    create_api_router(
        config.store.clone(),
        jwt,
        cookies,
        config.refresh_rotation,
    )
    .layer(cors_layer(&config.allowed_origins))
    .layer(TraceLayer::new_for_http())
}

/// Cookies only travel cross-origin when CORS allows credentials, which in
/// turn requires an explicit origin list.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    axum::serve(listener, app).await
}
