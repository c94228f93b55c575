use anyhow::Result;
use libsql::Connection;
use serde_json::Value as JsonValue;

use crate::books::Books;
use crate::db::{Row, fetch_rows, is_unique_violation};
use crate::query::Table;

pub const WISHLISTS_TABLE: &str = "wishlists";
pub const WISHLIST_BOOKS_TABLE: &str = "wishlist_books";
pub const CART_ITEMS_TABLE: &str = "cart_items";
pub const MAX_WISHLISTS_PER_USER: i64 = 3;

#[derive(Debug)]
pub enum CreateWishlist {
    Created(Row),
    LimitReached,
    DuplicateName,
}

#[derive(Debug)]
pub enum AddBook {
    Added(Row),
    WishlistNotFound,
    BookNotFound,
    AlreadyPresent,
}

#[derive(Debug, PartialEq, Eq)]
pub enum RemoveBook {
    Removed { added_to_cart: bool },
    WishlistNotFound,
    NotInWishlist,
}

pub struct Wishlists<'a> {
    conn: &'a Connection,
}

impl<'a> Wishlists<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub async fn get(&self, id: i64) -> Result<Option<Row>> {
        let rows = Table::new(self.conn, WISHLISTS_TABLE)
            .select("*")
            .eq("id", id)
            .limit(1)
            .execute()
            .await?;
        Ok(rows.into_iter().next())
    }

    pub async fn create(&self, user_id: &str, name: &str) -> Result<CreateWishlist> {
        // the count guard and the insert are one statement
        let query = r#"
            INSERT INTO wishlists (user_id, name)
            SELECT ?1, ?2
            WHERE (SELECT COUNT(*) FROM wishlists WHERE user_id = ?1) < ?3
            RETURNING *
        "#;

        let result = fetch_rows(
            self.conn,
            query,
            libsql::params![user_id, name, MAX_WISHLISTS_PER_USER],
        )
        .await;

        match result {
            Ok(rows) => Ok(match rows.into_iter().next() {
                Some(row) => CreateWishlist::Created(row),
                None => CreateWishlist::LimitReached,
            }),
            Err(e) if is_unique_violation(&e) => Ok(CreateWishlist::DuplicateName),
            Err(e) => Err(e),
        }
    }

    pub async fn add_book(&self, wishlist_id: i64, book_id: i64) -> Result<AddBook> {
        let query = r#"
            INSERT INTO wishlist_books (wishlist_id, book_id)
            SELECT ?1, ?2
            WHERE EXISTS (SELECT 1 FROM wishlists WHERE id = ?1)
              AND EXISTS (SELECT 1 FROM books WHERE id = ?2)
            RETURNING *
        "#;

        let rows = match fetch_rows(self.conn, query, libsql::params![wishlist_id, book_id]).await {
            Ok(rows) => rows,
            Err(e) if is_unique_violation(&e) => return Ok(AddBook::AlreadyPresent),
            Err(e) => return Err(e),
        };

        if let Some(row) = rows.into_iter().next() {
            return Ok(AddBook::Added(row));
        }

        // nothing inserted: report which side is missing
        if self.get(wishlist_id).await?.is_none() {
            Ok(AddBook::WishlistNotFound)
        } else {
            Ok(AddBook::BookNotFound)
        }
    }

    pub async fn remove_book(&self, wishlist_id: i64, book_id: i64, add_to_cart: bool) -> Result<RemoveBook> {
        let deleted = Table::new(self.conn, WISHLIST_BOOKS_TABLE)
            .delete()
            .eq("wishlist_id", wishlist_id)
            .eq("book_id", book_id)
            .returning("id")
            .execute()
            .await?;

        if deleted.is_empty() {
            return if self.get(wishlist_id).await?.is_none() {
                Ok(RemoveBook::WishlistNotFound)
            } else {
                Ok(RemoveBook::NotInWishlist)
            };
        }

        let added_to_cart = if add_to_cart {
            self.add_to_owner_cart(wishlist_id, book_id).await?
        } else {
            false
        };

        Ok(RemoveBook::Removed { added_to_cart })
    }

    /// Puts `book_id` in the cart of the wishlist's owner. Returns false when
    /// it was already there.
    async fn add_to_owner_cart(&self, wishlist_id: i64, book_id: i64) -> Result<bool> {
        let query = r#"
            INSERT OR IGNORE INTO cart_items (user_id, book_id)
            SELECT user_id, ?2 FROM wishlists WHERE id = ?1
        "#;
        let inserted = self
            .conn
            .execute(query, libsql::params![wishlist_id, book_id])
            .await?;
        Ok(inserted > 0)
    }

    /// Books linked to the wishlist, or `None` when the wishlist does not exist.
    pub async fn list_books(&self, wishlist_id: i64) -> Result<Option<Vec<Row>>> {
        if self.get(wishlist_id).await?.is_none() {
            tracing::debug!(wishlist_id, "wishlist not found");
            return Ok(None);
        }

        let links = Table::new(self.conn, WISHLIST_BOOKS_TABLE)
            .select("book_id")
            .eq("wishlist_id", wishlist_id)
            .execute()
            .await?;

        if links.is_empty() {
            tracing::debug!(wishlist_id, "no books in wishlist");
            return Ok(Some(Vec::new()));
        }

        let book_ids: Vec<i64> = links
            .iter()
            .filter_map(|link| link.get("book_id").and_then(JsonValue::as_i64))
            .collect();
        tracing::debug!(wishlist_id, ?book_ids, "book ids in wishlist");

        Books::new(self.conn).find_by_ids(&book_ids).await.map(Some)
    }
}
