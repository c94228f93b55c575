use axum::{
    Router,
    routing::{delete, get},
};

use super::handler;
use crate::handler::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_items).post(handler::add_item))
        .route("/:id", delete(handler::remove_item))
}
