//! Profile API: phone and address per user, keyed by email.

use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;

use super::StoreState;
use super::error::{ApiError, ResultExt, ensure_owner};
use crate::auth::Auth;
use crate::db::{Document, Filter, Update};

pub fn router(state: StoreState) -> Router {
    Router::new()
        .route("/profiles/{email}", get(get_profile).put(update_profile))
        .with_state(state)
}

#[derive(Deserialize)]
struct UpdateProfileRequest {
    phone: Option<String>,
    address: Option<String>,
}

async fn get_profile(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Path(email): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owner(&identity, Some(email.as_str()))?;

    let profile = state
        .store
        .get()?
        .profiles()
        .find_one(&Filter::new().eq("email", email))
        .await
        .store_err("Failed to get profile")?
        .ok_or_else(|| ApiError::not_found("Profile not found"))?;

    Ok(Json(profile))
}

/// Create or update the caller's profile. Only `phone` and `address` are stored.
async fn update_profile(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Path(email): Path<String>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owner(&identity, Some(email.as_str()))?;

    let mut fields = Document::new();
    if let Some(phone) = payload.phone {
        fields.insert("phone".to_string(), json!(phone));
    }
    if let Some(address) = payload.address {
        fields.insert("address".to_string(), json!(address));
    }

    let profiles = state.store.get()?.profiles();
    let filter = Filter::new().eq("email", email.as_str());

    let updated = profiles
        .update_one(&filter, &Update::new().set_all(fields.clone()))
        .await
        .store_err("Failed to update profile")?;

    if !updated {
        fields.insert("email".to_string(), json!(email));
        profiles
            .insert_one(fields)
            .await
            .store_err("Failed to create profile")?;
    }

    let profile = profiles
        .find_one(&filter)
        .await
        .store_err("Failed to get profile")?
        .ok_or_else(|| ApiError::internal("Profile missing after update"))?;

    Ok(Json(profile))
}
