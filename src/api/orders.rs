//! Orders API. Every endpoint requires an access cookie.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::error::{ApiError, ResultExt, ensure_owner, identity_email};
use super::items::PURCHASE_COUNT_FIELD;
use super::{OwnerQuery, StoreState};
use crate::auth::Auth;
use crate::db::{Document, Filter, Update};

/// Field stamped on every order with the buyer's email.
const BUYER_FIELD: &str = "buyer_email";

pub fn router(state: StoreState) -> Router {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/{id}", delete(delete_order))
        .with_state(state)
}

fn default_quantity() -> i64 {
    1
}

#[derive(Deserialize)]
struct CreateOrderRequest {
    item_id: String,
    #[serde(default = "default_quantity")]
    quantity: i64,
    /// Anything else the client sends (buyer name, notes) is kept on the order.
    #[serde(flatten)]
    extra: Document,
}

async fn create_order(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let buyer = identity_email(&identity)?;

    if payload.quantity < 1 {
        return Err(ApiError::bad_request("Quantity must be at least 1"));
    }

    let db = state.store.get()?;
    let item = db
        .items()
        .find_one(&Filter::by_id(&payload.item_id))
        .await
        .store_err("Failed to get item")?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    let mut order = payload.extra;
    order.insert("item_id".to_string(), json!(payload.item_id));
    order.insert("quantity".to_string(), json!(payload.quantity));
    order.insert(BUYER_FIELD.to_string(), json!(buyer));
    if let Some(name) = item.get("name") {
        order.insert("item_name".to_string(), name.clone());
    }

    let id = db
        .orders()
        .insert_one(order)
        .await
        .store_err("Failed to create order")?;

    // A failed counter bump does not fail the order.
    if let Err(e) = db
        .items()
        .update_one(
            &Filter::by_id(&payload.item_id),
            &Update::new().inc(PURCHASE_COUNT_FIELD, payload.quantity),
        )
        .await
    {
        warn!(item_id = %payload.item_id, error = %e, "Failed to update purchase count");
    }

    Ok((StatusCode::CREATED, Json(json!({ "inserted_id": id }))))
}

/// Orders placed by the caller. `email` must be the caller's own.
async fn list_orders(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Query(query): Query<OwnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owner(&identity, Some(query.email.as_str()))?;

    let orders = state
        .store
        .get()?
        .orders()
        .find(&Filter::new().eq(BUYER_FIELD, query.email), None, 0, -1)
        .await
        .store_err("Failed to list orders")?;

    Ok(Json(orders))
}

async fn delete_order(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let orders = state.store.get()?.orders();

    let order = orders
        .find_one(&Filter::by_id(&id))
        .await
        .store_err("Failed to get order")?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    ensure_owner(&identity, order.get(BUYER_FIELD).and_then(|v| v.as_str()))?;

    let deleted = orders
        .delete_one(&Filter::by_id(&id))
        .await
        .store_err("Failed to delete order")?;

    Ok(Json(json!({ "deleted": deleted })))
}
