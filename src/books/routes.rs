use axum::{Router, routing::get};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/:isbn", get(handler::get_book))
}
