use anyhow::Result;
use libsql::Connection;

use crate::db::Row;
use crate::query::Table;

pub const BOOKS_TABLE: &str = "books";

pub struct Books<'a> {
    conn: &'a Connection,
}

impl<'a> Books<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub async fn find_by_isbn(&self, isbn: &str) -> Result<Option<Row>> {
        let rows = Table::new(self.conn, BOOKS_TABLE)
            .select("*")
            .eq("isbn", isbn)
            .limit(1)
            .execute()
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Rows for `ids`, in table order. Unknown ids are skipped.
    pub async fn find_by_ids(&self, ids: &[i64]) -> Result<Vec<Row>> {
        Table::new(self.conn, BOOKS_TABLE)
            .select("*")
            .in_("id", ids.iter().copied())
            .execute()
            .await
    }

    pub async fn insert(&self, book: Row) -> Result<Row> {
        Table::new(self.conn, BOOKS_TABLE)
            .insert(book)
            .execute()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Failed to create book"))
    }
}
