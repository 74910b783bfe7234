//! Catalog API for purchasable items.
//!
//! Reads are public. Writes require an access cookie and are limited to the
//! item's owner, identified by the `email` claim.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{OwnerQuery, StoreState};
use super::error::{ApiError, ResultExt, ensure_owner, identity_email};
use crate::auth::{Auth, Identity};
use crate::db::{Document, Filter, Sort, Update};

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;
const TOP_ITEMS: i64 = 6;

/// Field stamped on every item with the creator's email.
pub const OWNER_FIELD: &str = "owner_email";
/// Running total of ordered quantity, bumped by the orders API.
pub const PURCHASE_COUNT_FIELD: &str = "purchase_count";

pub fn router(state: StoreState) -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/top", get(top_items))
        .route(
            "/items/{id}",
            get(get_item).put(update_item).delete(delete_item),
        )
        .route("/my-items", get(my_items))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct ListItemsQuery {
    search: Option<String>,
    category: Option<String>,
    sort: Option<String>,
    page: Option<i64>,
    limit: Option<i64>,
}

#[derive(Serialize)]
struct ItemPage {
    items: Vec<Document>,
    total: i64,
    page: i64,
    limit: i64,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// --- Handlers ---

async fn list_items(
    State(state): State<StoreState>,
    Query(query): Query<ListItemsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let items = state.store.get()?.items();

    let mut filter = Filter::new();
    if let Some(search) = non_empty(&query.search) {
        filter = filter.contains("name", search);
    }
    if let Some(category) = non_empty(&query.category) {
        filter = filter.eq("category", category);
    }
    let sort = non_empty(&query.sort).map(Sort::parse);

    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let skip = (page - 1).saturating_mul(limit);

    let total = items
        .count_documents(&filter)
        .await
        .store_err("Failed to count items")?;
    let docs = items
        .find(&filter, sort.as_ref(), skip, limit)
        .await
        .store_err("Failed to list items")?;

    Ok(Json(ItemPage {
        items: docs,
        total,
        page,
        limit,
    }))
}

async fn top_items(State(state): State<StoreState>) -> Result<impl IntoResponse, ApiError> {
    let docs = state
        .store
        .get()?
        .items()
        .find(
            &Filter::new(),
            Some(&Sort::desc(PURCHASE_COUNT_FIELD)),
            0,
            TOP_ITEMS,
        )
        .await
        .store_err("Failed to list top items")?;

    Ok(Json(docs))
}

async fn get_item(
    State(state): State<StoreState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .store
        .get()?
        .items()
        .find_one(&Filter::by_id(&id))
        .await
        .store_err("Failed to get item")?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    Ok(Json(item))
}

async fn create_item(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Json(mut item): Json<Document>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = identity_email(&identity)?;
    item.insert(OWNER_FIELD.to_string(), json!(owner));
    item.entry(PURCHASE_COUNT_FIELD).or_insert(json!(0));

    let id = state
        .store
        .get()?
        .items()
        .insert_one(item)
        .await
        .store_err("Failed to create item")?;

    Ok((StatusCode::CREATED, Json(json!({ "inserted_id": id }))))
}

/// Items created by the caller. `email` must be the caller's own.
async fn my_items(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Query(query): Query<OwnerQuery>,
) -> Result<impl IntoResponse, ApiError> {
    ensure_owner(&identity, Some(query.email.as_str()))?;

    let docs = state
        .store
        .get()?
        .items()
        .find(&Filter::new().eq(OWNER_FIELD, query.email), None, 0, -1)
        .await
        .store_err("Failed to list items")?;

    Ok(Json(docs))
}

/// Load an item and check the caller owns it.
async fn owned_item(
    state: &StoreState,
    identity: &Identity,
    id: &str,
) -> Result<Document, ApiError> {
    let item = state
        .store
        .get()?
        .items()
        .find_one(&Filter::by_id(id))
        .await
        .store_err("Failed to get item")?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    ensure_owner(identity, item.get(OWNER_FIELD).and_then(|v| v.as_str()))?;
    Ok(item)
}

async fn update_item(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Path(id): Path<String>,
    Json(mut changes): Json<Document>,
) -> Result<impl IntoResponse, ApiError> {
    owned_item(&state, &identity, &id).await?;

    // Ownership and sales figures are not the owner's to edit.
    changes.remove(OWNER_FIELD);
    changes.remove(PURCHASE_COUNT_FIELD);

    let updated = state
        .store
        .get()?
        .items()
        .update_one(&Filter::by_id(&id), &Update::new().set_all(changes))
        .await
        .store_err("Failed to update item")?;

    Ok(Json(json!({ "updated": updated })))
}

async fn delete_item(
    State(state): State<StoreState>,
    Auth(identity): Auth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    owned_item(&state, &identity, &id).await?;

    let deleted = state
        .store
        .get()?
        .items()
        .delete_one(&Filter::by_id(&id))
        .await
        .store_err("Failed to delete item")?;

    Ok(Json(json!({ "deleted": deleted })))
}
