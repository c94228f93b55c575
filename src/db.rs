use crate::config::DatabaseConfig;
use anyhow::Result;
use libsql::{Builder, Connection, Database as LibsqlDatabase, Value, params::IntoParams};
use serde_json::{Map, Number, Value as JsonValue};

/// A database row as an ordered map of column name to JSON value.
pub type Row = Map<String, JsonValue>;

const SYSTEM_MIGRATIONS: &[(&str, &str)] =
    &[("system/000_migrations_table.sql", include_str!("migrations/system/000_migrations_table.sql"))];

const MIGRATIONS: &[(&str, &str)] = &[("001_schema.sql", include_str!("migrations/001_schema.sql"))];

pub struct Database {
    _db: LibsqlDatabase,
    conn: Connection,
}

impl Database {
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Opens the hosted database at `cfg.url` using `cfg.key` as the auth token.
    pub async fn connect(cfg: &DatabaseConfig) -> Result<Self> {
        tracing::info!(url = %cfg.url, "[db] connecting to remote database");
        let db = Builder::new_remote(cfg.url.clone(), cfg.key.clone()).build().await?;
        Self::open(db, cfg.run_migrations).await
    }

    /// Private in-memory database with the schema applied.
    pub async fn in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::open(db, true).await
    }

    async fn open(db: LibsqlDatabase, run_migrations: bool) -> Result<Self> {
        let conn = db.connect()?;
        conn.query("SELECT 1", ()).await?;

        if run_migrations {
            for (filename, sql) in SYSTEM_MIGRATIONS.iter().chain(MIGRATIONS) {
                Self::run_migration(&conn, filename, sql).await?;
            }
        }

        Ok(Database { _db: db, conn })
    }

    async fn is_migration_applied(conn: &Connection, name: &str) -> Result<bool> {
        let query = "SELECT 1 FROM _migrations WHERE name = ?";
        match conn.query(query, libsql::params![name]).await {
            Ok(mut rows) => Ok(rows.next().await?.is_some()),
            Err(e) => {
                if e.to_string().contains("no such table") {
                    Ok(false)
                } else {
                    Err(e.into())
                }
            }
        }
    }

    async fn record_migration(conn: &Connection, name: &str) -> Result<()> {
        let query = r#"
            INSERT INTO _migrations (name, applied_at)
            VALUES (?, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        "#;
        conn.execute(query, libsql::params![name]).await?;
        Ok(())
    }

    async fn run_migration(conn: &Connection, name: &str, sql: &str) -> Result<()> {
        if Self::is_migration_applied(conn, name).await? {
            tracing::debug!("migration {} already applied, skipping", name);
            return Ok(());
        }

        tracing::info!("applying migration: {}", name);
        conn.execute_batch(sql)
            .await
            .map_err(|e| anyhow::anyhow!("failed to execute migration {name}: {e}"))?;

        Self::record_migration(conn, name).await?;
        Ok(())
    }
}

/// Runs `sql` and collects every returned row.
pub async fn fetch_rows(conn: &Connection, sql: &str, params: impl IntoParams) -> Result<Vec<Row>> {
    let mut rows = conn.query(sql, params).await?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().await? {
        out.push(row_to_json(&row)?);
    }
    Ok(out)
}

pub fn row_to_json(row: &libsql::Row) -> Result<Row> {
    let mut out = Map::new();
    for idx in 0..row.column_count() {
        let name = row
            .column_name(idx)
            .ok_or_else(|| anyhow::anyhow!("missing name for column {idx}"))?;
        out.insert(name.to_string(), value_to_json(row.get_value(idx)?));
    }
    Ok(out)
}

pub fn value_to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Integer(i) => JsonValue::from(i),
        Value::Real(f) => Number::from_f64(f).map(JsonValue::Number).unwrap_or(JsonValue::Null),
        Value::Text(s) => JsonValue::String(s),
        Value::Blob(b) => JsonValue::String(hex::encode(b)),
    }
}

pub fn json_to_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Integer(i64::from(*b)),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => n.as_f64().map(Value::Real).unwrap_or(Value::Null),
        },
        JsonValue::String(s) => Value::Text(s.clone()),
        // nested documents are stored as their JSON text
        other => Value::Text(other.to_string()),
    }
}

/// True when `err` reports a violated UNIQUE constraint.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|cause| cause.to_string().contains("UNIQUE constraint failed"))
}
