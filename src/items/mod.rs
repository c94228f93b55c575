//! Flat wishlist: saved items in a single `wishlist` table.
//!
//! Items are inserted, listed newest first and deleted by id; they are never
//! updated in place.

mod handler;
mod routes;
mod store;

pub use routes::routes;
pub use store::{DEFAULT_LIMIT, Items, NewItem, WISHLIST_TABLE};
