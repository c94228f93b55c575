use axum::{
    Router,
    routing::{delete, get, post},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handler::create_wishlist))
        .route(
            "/:wishlist_id/books",
            get(handler::list_books_in_wishlist).post(handler::add_book_to_wishlist),
        )
        .route("/:wishlist_id/books/:book_id", delete(handler::remove_book_from_wishlist))
}
