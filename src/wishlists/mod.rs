//! Relational wishlists.
//!
//! A user owns up to [`MAX_WISHLISTS_PER_USER`] named wishlists; books are
//! linked to a wishlist through the `wishlist_books` junction table. Removing
//! a book can move it into the owner's cart.
//!
//! Every write is a single conditional statement, so the per-user cap, name
//! uniqueness and junction uniqueness hold under concurrent callers.

mod handler;
mod routes;
mod store;

pub use routes::routes;
pub use store::*;
