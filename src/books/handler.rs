use axum::{
    extract::{Path, State},
    response::Response,
};

use super::Books;
use crate::error::ApiError;
use crate::handler::{AppState, success};

pub async fn get_book(State(state): State<AppState>, Path(isbn): Path<String>) -> Result<Response, ApiError> {
    let books = Books::new(state.db.connection());

    match books.find_by_isbn(&isbn).await {
        Ok(Some(book)) => {
            tracing::info!(%isbn, "found book");
            Ok(success(book))
        }
        Ok(None) => Err(ApiError::not_found("Book not found")),
        Err(e) => Err(state.internal_error("failed to look up book", e)),
    }
}
