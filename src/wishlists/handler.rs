use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    response::Response,
};
use serde::{Deserialize, Serialize};

use super::{AddBook, CreateWishlist, MAX_WISHLISTS_PER_USER, RemoveBook, Wishlists};
use crate::error::ApiError;
use crate::handler::{AppState, created, required, success};

#[derive(Debug, Deserialize)]
pub struct CreateWishlistRequest {
    pub user_id: Option<String>,
    pub wishlist_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddBookRequest {
    pub book_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveBookParams {
    #[serde(default)]
    pub add_to_cart: bool,
}

#[derive(Debug, Serialize)]
pub struct RemovedBook {
    pub wishlist_id: i64,
    pub book_id: i64,
    pub added_to_cart: bool,
}

pub async fn create_wishlist(
    State(state): State<AppState>,
    payload: Result<Json<CreateWishlistRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let user_id = required(payload.user_id, "user_id")?;
    let name = required(payload.wishlist_name, "wishlist_name")?;

    let lists = Wishlists::new(state.db.connection());
    match lists.create(&user_id, &name).await {
        Ok(CreateWishlist::Created(row)) => {
            tracing::info!(%user_id, %name, "created wishlist");
            Ok(created(row))
        }
        Ok(CreateWishlist::LimitReached) => Err(ApiError::conflict(format!(
            "User already has the maximum of {MAX_WISHLISTS_PER_USER} wishlists"
        ))),
        Ok(CreateWishlist::DuplicateName) => {
            Err(ApiError::conflict("User already has a wishlist with this name"))
        }
        Err(e) => Err(state.internal_error("failed to create wishlist", e)),
    }
}

pub async fn add_book_to_wishlist(
    State(state): State<AppState>,
    wishlist_id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AddBookRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Path(wishlist_id) = wishlist_id?;
    let Json(payload) = payload?;
    let book_id = payload
        .book_id
        .ok_or_else(|| ApiError::bad_request("book_id is required"))?;

    let lists = Wishlists::new(state.db.connection());
    match lists.add_book(wishlist_id, book_id).await {
        Ok(AddBook::Added(row)) => {
            tracing::info!(wishlist_id, book_id, "added book to wishlist");
            Ok(created(row))
        }
        Ok(AddBook::WishlistNotFound) => Err(ApiError::not_found("Wishlist not found")),
        Ok(AddBook::BookNotFound) => Err(ApiError::not_found("Book not found")),
        Ok(AddBook::AlreadyPresent) => Err(ApiError::conflict("Book is already in this wishlist")),
        Err(e) => Err(state.internal_error("failed to add book to wishlist", e)),
    }
}

pub async fn remove_book_from_wishlist(
    State(state): State<AppState>,
    ids: Result<Path<(i64, i64)>, PathRejection>,
    params: Result<Query<RemoveBookParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Path((wishlist_id, book_id)) = ids?;
    let Query(params) = params?;

    let lists = Wishlists::new(state.db.connection());
    match lists.remove_book(wishlist_id, book_id, params.add_to_cart).await {
        Ok(RemoveBook::Removed { added_to_cart }) => {
            tracing::info!(wishlist_id, book_id, added_to_cart, "removed book from wishlist");
            Ok(success(RemovedBook {
                wishlist_id,
                book_id,
                added_to_cart,
            }))
        }
        Ok(RemoveBook::WishlistNotFound) => Err(ApiError::not_found("Wishlist not found")),
        Ok(RemoveBook::NotInWishlist) => Err(ApiError::not_found("Book not in wishlist")),
        Err(e) => Err(state.internal_error("failed to remove book from wishlist", e)),
    }
}

pub async fn list_books_in_wishlist(
    State(state): State<AppState>,
    wishlist_id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(wishlist_id) = wishlist_id?;
    tracing::debug!(wishlist_id, "listing books in wishlist");

    let lists = Wishlists::new(state.db.connection());
    match lists.list_books(wishlist_id).await {
        Ok(Some(books)) => {
            tracing::debug!(wishlist_id, count = books.len(), "returning books");
            Ok(success(books))
        }
        Ok(None) => Err(ApiError::not_found("Wishlist not found")),
        Err(e) => Err(state.internal_error("failed to list books in wishlist", e)),
    }
}
