//! Table-scoped statements over a libsql connection.
//!
//! Every handler reaches the database through these builders:
//!
//! ```rust,ignore
//! let rows = Table::new(conn, "books")
//!     .select("*")
//!     .eq("isbn", isbn)
//!     .limit(1)
//!     .execute()
//!     .await?;
//! ```
//!
//! Values are always bound as parameters. Column names are checked against
//! `[A-Za-z_][A-Za-z0-9_]*` when the statement is rendered.

use anyhow::{Result, bail};
use libsql::{Connection, Value};

use crate::db::{Row, fetch_rows, json_to_value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
enum Filter {
    Eq(String, Value),
    In(String, Vec<Value>),
}

pub struct Table<'a> {
    conn: &'a Connection,
    name: &'static str,
}

impl<'a> Table<'a> {
    pub fn new(conn: &'a Connection, name: &'static str) -> Self {
        Self { conn, name }
    }

    pub fn select(self, columns: &str) -> Select<'a> {
        Select {
            conn: self.conn,
            table: self.name,
            columns: columns.to_string(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Inserts exactly the keys present in `row`; columns it leaves out get
    /// their database defaults.
    pub fn insert(self, row: Row) -> Insert<'a> {
        Insert {
            conn: self.conn,
            table: self.name,
            row,
        }
    }

    pub fn delete(self) -> Delete<'a> {
        Delete {
            conn: self.conn,
            table: self.name,
            filters: Vec::new(),
            returning: "*".to_string(),
        }
    }
}

pub struct Select<'a> {
    conn: &'a Connection,
    table: &'static str,
    columns: String,
    filters: Vec<Filter>,
    order: Vec<(String, Order)>,
    limit: Option<u32>,
    offset: Option<u32>,
}

impl<'a> Select<'a> {
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn in_<V: Into<Value>>(mut self, column: &str, values: impl IntoIterator<Item = V>) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.filters.push(Filter::In(column.to_string(), values));
        self
    }

    pub fn order(mut self, column: &str, order: Order) -> Self {
        self.order.push((column.to_string(), order));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        let mut params = Vec::new();
        let mut sql = format!("SELECT {} FROM {}", column_list(&self.columns)?, self.table);
        push_where(&mut sql, &mut params, &self.filters)?;

        if !self.order.is_empty() {
            let terms = self
                .order
                .iter()
                .map(|(column, order)| -> Result<String> {
                    Ok(format!("{} {}", ident(column)?, order.as_sql()))
                })
                .collect::<Result<Vec<_>>>()?;
            sql.push_str(" ORDER BY ");
            sql.push_str(&terms.join(", "));
        }

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                params.push(Value::Integer(i64::from(limit)));
                params.push(Value::Integer(i64::from(offset.unwrap_or(0))));
            }
            (None, Some(offset)) => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(Value::Integer(i64::from(offset)));
            }
            (None, None) => {}
        }

        Ok((sql, params))
    }

    pub async fn execute(self) -> Result<Vec<Row>> {
        let (sql, params) = self.to_sql()?;
        tracing::debug!(table = self.table, %sql, "select");
        fetch_rows(self.conn, &sql, params).await
    }
}

pub struct Insert<'a> {
    conn: &'a Connection,
    table: &'static str,
    row: Row,
}

impl<'a> Insert<'a> {
    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        if self.row.is_empty() {
            return Ok((format!("INSERT INTO {} DEFAULT VALUES RETURNING *", self.table), Vec::new()));
        }

        let columns = self
            .row
            .keys()
            .map(|column| ident(column))
            .collect::<Result<Vec<_>>>()?;
        let placeholders = vec!["?"; columns.len()].join(", ");
        let params = self.row.values().map(json_to_value).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
            self.table,
            columns.join(", "),
            placeholders
        );
        Ok((sql, params))
    }

    pub async fn execute(self) -> Result<Vec<Row>> {
        let (sql, params) = self.to_sql()?;
        tracing::debug!(table = self.table, %sql, "insert");
        fetch_rows(self.conn, &sql, params).await
    }
}

pub struct Delete<'a> {
    conn: &'a Connection,
    table: &'static str,
    filters: Vec<Filter>,
    returning: String,
}

impl<'a> Delete<'a> {
    pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::Eq(column.to_string(), value.into()));
        self
    }

    pub fn returning(mut self, columns: &str) -> Self {
        self.returning = columns.to_string();
        self
    }

    pub fn to_sql(&self) -> Result<(String, Vec<Value>)> {
        if self.filters.is_empty() {
            bail!("refusing to delete from {} without a filter", self.table);
        }

        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", self.table);
        push_where(&mut sql, &mut params, &self.filters)?;
        sql.push_str(" RETURNING ");
        sql.push_str(&column_list(&self.returning)?);
        Ok((sql, params))
    }

    /// Returns the deleted rows; an empty result means nothing matched.
    pub async fn execute(self) -> Result<Vec<Row>> {
        let (sql, params) = self.to_sql()?;
        tracing::debug!(table = self.table, %sql, "delete");
        fetch_rows(self.conn, &sql, params).await
    }
}

fn push_where(sql: &mut String, params: &mut Vec<Value>, filters: &[Filter]) -> Result<()> {
    if filters.is_empty() {
        return Ok(());
    }

    let mut clauses = Vec::with_capacity(filters.len());
    for filter in filters {
        match filter {
            Filter::Eq(column, value) => {
                clauses.push(format!("{} = ?", ident(column)?));
                params.push(value.clone());
            }
            // matches nothing
            Filter::In(column, values) if values.is_empty() => {
                ident(column)?;
                clauses.push("0".to_string());
            }
            Filter::In(column, values) => {
                let placeholders = vec!["?"; values.len()].join(", ");
                clauses.push(format!("{} IN ({})", ident(column)?, placeholders));
                params.extend(values.iter().cloned());
            }
        }
    }

    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
    Ok(())
}

fn ident(name: &str) -> Result<&str> {
    let mut chars = name.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("invalid column name: {:?}", name);
    }
    Ok(name)
}

fn column_list(columns: &str) -> Result<String> {
    if columns.trim() == "*" {
        return Ok("*".to_string());
    }
    let names = columns
        .split(',')
        .map(|c| ident(c.trim()))
        .collect::<Result<Vec<_>>>()?;
    Ok(names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn select_renders_filters_order_and_range() {
        let db = Database::in_memory().await.unwrap();
        let (sql, params) = Table::new(db.connection(), "wishlist")
            .select("id, name")
            .eq("name", "x")
            .order("created_at", Order::Desc)
            .order("id", Order::Desc)
            .limit(2)
            .offset(4)
            .to_sql()
            .unwrap();

        assert_eq!(
            sql,
            "SELECT id, name FROM wishlist WHERE name = ? ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?"
        );
        assert_eq!(params.len(), 3);
    }

    #[tokio::test]
    async fn insert_only_names_present_columns() {
        let db = Database::in_memory().await.unwrap();
        let (sql, params) = Table::new(db.connection(), "wishlist")
            .insert(row(json!({"name": "X", "price": 9.99})))
            .to_sql()
            .unwrap();

        assert!(sql.starts_with("INSERT INTO wishlist ("));
        assert!(sql.contains("name") && sql.contains("price"));
        assert!(!sql.contains("description") && !sql.contains("url"));
        assert_eq!(params.len(), 2);
    }

    #[tokio::test]
    async fn rejects_unsafe_identifiers() {
        let db = Database::in_memory().await.unwrap();
        let select = Table::new(db.connection(), "books").select("*").eq("isbn; DROP TABLE books", "1");
        assert!(select.to_sql().is_err());

        let insert = Table::new(db.connection(), "books").insert(row(json!({"title)": "t"})));
        assert!(insert.to_sql().is_err());
    }

    #[tokio::test]
    async fn delete_requires_a_filter() {
        let db = Database::in_memory().await.unwrap();
        let err = Table::new(db.connection(), "wishlist").delete().execute().await.unwrap_err();
        assert!(err.to_string().contains("without a filter"));
    }

    #[tokio::test]
    async fn round_trips_rows_through_the_database() {
        let db = Database::in_memory().await.unwrap();
        let conn = db.connection();

        for (isbn, title) in [("111", "Dune"), ("222", "Emma"), ("333", "Ulysses")] {
            Table::new(conn, "books")
                .insert(row(json!({"isbn": isbn, "title": title})))
                .execute()
                .await
                .unwrap();
        }

        let found = Table::new(conn, "books")
            .select("isbn")
            .in_("isbn", ["111", "333"])
            .order("isbn", Order::Asc)
            .execute()
            .await
            .unwrap();
        assert_eq!(found, vec![row(json!({"isbn": "111"})), row(json!({"isbn": "333"}))]);

        let none = Table::new(conn, "books")
            .select("*")
            .in_("id", Vec::<i64>::new())
            .execute()
            .await
            .unwrap();
        assert!(none.is_empty());

        let deleted = Table::new(conn, "books")
            .delete()
            .eq("isbn", "222")
            .returning("title")
            .execute()
            .await
            .unwrap();
        assert_eq!(deleted, vec![row(json!({"title": "Emma"}))]);

        let again = Table::new(conn, "books").delete().eq("isbn", "222").execute().await.unwrap();
        assert!(again.is_empty());
    }
}
