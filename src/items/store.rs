use anyhow::Result;
use libsql::Connection;
use serde_json::{Map, Value as JsonValue};

use crate::db::Row;
use crate::query::{Order, Table};

pub const WISHLIST_TABLE: &str = "wishlist";
pub const DEFAULT_LIMIT: u32 = 100;

#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub name: String,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub url: Option<String>,
}

impl NewItem {
    /// Insert payload. Unset optional fields are left out so the table
    /// defaults apply.
    pub fn into_row(self) -> Row {
        let mut row = Map::new();
        row.insert("name".to_string(), JsonValue::from(self.name));
        if let Some(description) = self.description {
            row.insert("description".to_string(), JsonValue::from(description));
        }
        if let Some(price) = self.price {
            row.insert("price".to_string(), JsonValue::from(price));
        }
        if let Some(url) = self.url {
            row.insert("url".to_string(), JsonValue::from(url));
        }
        row
    }
}

pub struct Items<'a> {
    conn: &'a Connection,
}

impl<'a> Items<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub async fn add(&self, item: NewItem) -> Result<Row> {
        Table::new(self.conn, WISHLIST_TABLE)
            .insert(item.into_row())
            .execute()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Failed to create wishlist item"))
    }

    /// Deletes the item and reports whether it existed.
    pub async fn remove(&self, id: i64) -> Result<bool> {
        let deleted = Table::new(self.conn, WISHLIST_TABLE)
            .delete()
            .eq("id", id)
            .returning("id")
            .execute()
            .await?;
        Ok(!deleted.is_empty())
    }

    pub async fn list(&self, limit: u32, offset: u32) -> Result<Vec<Row>> {
        Table::new(self.conn, WISHLIST_TABLE)
            .select("*")
            .order("created_at", Order::Desc)
            .order("id", Order::Desc)
            .limit(limit)
            .offset(offset)
            .execute()
            .await
    }
}
