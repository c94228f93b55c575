use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    response::Response,
};
use serde::{Deserialize, Serialize};

use super::{DEFAULT_LIMIT, Items, NewItem};
use crate::db::Row;
use crate::error::ApiError;
use crate::handler::{AppState, created, required, success};

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct ItemPage {
    pub items: Vec<Row>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub deleted_id: i64,
}

pub async fn add_item(
    State(state): State<AppState>,
    payload: Result<Json<AddItemRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let item = NewItem {
        name: required(payload.name, "name")?,
        description: payload.description,
        price: payload.price,
        url: payload.url,
    };

    let items = Items::new(state.db.connection());
    match items.add(item).await {
        Ok(row) => {
            tracing::info!(id = ?row.get("id"), "added wishlist item");
            Ok(created(row))
        }
        Err(e) => Err(state.internal_error("failed to add wishlist item", e)),
    }
}

pub async fn remove_item(
    State(state): State<AppState>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(id) = id?;
    let items = Items::new(state.db.connection());

    match items.remove(id).await {
        Ok(true) => {
            tracing::info!(id, "removed wishlist item");
            Ok(success(Deleted { deleted_id: id }))
        }
        Ok(false) => Err(ApiError::not_found("Item not found")),
        Err(e) => Err(state.internal_error("failed to remove wishlist item", e)),
    }
}

pub async fn list_items(
    State(state): State<AppState>,
    params: Result<Query<PaginationParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(params) = params?;
    let mut limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    if let Some(max) = state.max_page_size {
        limit = limit.min(max);
    }
    let offset = params.offset.unwrap_or(0);

    let items = Items::new(state.db.connection());
    match items.list(limit, offset).await {
        Ok(rows) => {
            tracing::debug!(limit, offset, count = rows.len(), "listed wishlist items");
            Ok(success(ItemPage {
                count: rows.len(),
                items: rows,
            }))
        }
        Err(e) => Err(state.internal_error("failed to list wishlist items", e)),
    }
}
