//! Liveness banner and store readiness probe.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};
use serde_json::json;
use tracing::error;

use super::StoreState;
use super::error::ApiError;

pub fn router(state: StoreState) -> Router {
    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .with_state(state)
}

async fn banner() -> &'static str {
    "Food Hive Server is Running..."
}

/// 200 once the store is installed and answering, 503 otherwise.
async fn health(State(state): State<StoreState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.store.get()?;
    if let Err(e) = db.ping().await {
        error!(error = %e, "Store ping failed");
        return Err(ApiError::ServiceUnavailable("Service Unavailable".into()));
    }

    Ok(Json(json!({ "status": "ready" })))
}
