use axum::{Router, http::Method, routing::get};
use std::error::Error;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handler::{AppState, healthcheck};

pub mod books;
pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod items;
pub mod query;
pub mod wishlists;

/// Builds the full HTTP surface over `state`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any);

    Router::new()
        .route("/", get(healthcheck))
        .nest("/books", books::routes())
        .nest("/items", items::routes())
        .nest("/wishlist", wishlists::routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub fn unpack_error(err: &(dyn Error)) -> String {
    let mut parts = Vec::new();
    parts.push(err.to_string());
    let mut current = err.source();
    while let Some(source) = current {
        parts.push(source.to_string());
        current = source.source();
    }
    parts.join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_the_whole_cause_chain() {
        let err = anyhow::anyhow!("connection refused")
            .context("select from books")
            .context("failed to look up book");
        assert_eq!(
            unpack_error(&*err),
            "failed to look up book: select from books: connection refused"
        );
    }
}
