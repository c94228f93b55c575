//! Book lookup by ISBN.

mod handler;
mod routes;
mod store;

pub use routes::routes;
pub use store::{BOOKS_TABLE, Books};
