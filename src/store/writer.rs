use crate::error::{IngestError, Result};
use crate::ingest::encoder::NestedValueEncoder;
use crate::ingest::types::{Cell, Row};
use crate::schema::{FieldKind, Schema};
use crate::store::checkpoint::{self, Checkpoint};
use rusqlite::types::ToSqlOutput;
use rusqlite::{params_from_iter, Connection, ToSql};
use serde_json::Value;
use std::path::Path;
use tracing::debug;

impl ToSql for Cell {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Cell::Text(s) => ToSqlOutput::from(s.as_str()),
            Cell::Integer(n) => ToSqlOutput::from(*n),
            Cell::Float(n) => ToSqlOutput::from(*n),
        })
    }
}

/// Appends rows to SQLite tables, one transaction per batch
pub struct SqliteWriter {
    conn: Connection,
}

impl SqliteWriter {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(Self::from_connection(Connection::open(path)?))
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::from_connection(Connection::open_in_memory()?))
    }

    pub fn from_connection(conn: Connection) -> Self {
        SqliteWriter { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create the target table if it does not exist. An existing table is
    /// left untouched, even if its columns differ from the schema.
    pub fn ensure_table(&self, table: &str, schema: &Schema) -> Result<()> {
        let sql = create_table_sql(table, schema);
        debug!(table, "ensuring table exists");
        self.conn.execute_batch(&sql)?;
        checkpoint::ensure_table(&self.conn)?;
        Ok(())
    }

    /// Append rows in order inside a single transaction, optionally
    /// recording the run's progress in the same commit. Returns the number
    /// of rows inserted.
    pub fn write_batch(
        &mut self,
        table: &str,
        schema: &Schema,
        rows: &[Row],
        progress: Option<&Checkpoint>,
    ) -> Result<usize> {
        let sql = insert_sql(table, schema);
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare_cached(&sql)?;
            for row in rows {
                stmt.execute(params_from_iter(row.cells.iter()))?;
            }
        }

        if let Some(progress) = progress {
            checkpoint::save(&tx, progress)?;
        }

        tx.commit()?;
        Ok(rows.len())
    }

    pub fn load_checkpoint(&self, target: &str) -> Result<Option<Checkpoint>> {
        checkpoint::ensure_table(&self.conn)?;
        checkpoint::load(&self.conn, target)
    }

    pub fn count_rows(&self, table: &str) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Decode every stored value of a nested column, in insertion order
    pub fn read_nested_column(&self, table: &str, column: &str) -> Result<Vec<Value>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY id",
            quote_ident(column),
            quote_ident(table)
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let texts = stmt
            .query_map([], |row| row.get::<_, Option<String>>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        texts
            .into_iter()
            .map(|text| match text {
                Some(text) => NestedValueEncoder::decode(&text).map_err(IngestError::CorruptNestedValue),
                None => Ok(Value::Null),
            })
            .collect()
    }
}

pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

fn create_table_sql(table: &str, schema: &Schema) -> String {
    let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    columns.extend(
        schema
            .fields()
            .iter()
            .map(|field| format!("{} {}", quote_ident(field.column()), field.kind().sql_type())),
    );

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n);",
        quote_ident(table),
        columns.join(",\n    ")
    )
}

fn insert_sql(table: &str, schema: &Schema) -> String {
    let columns: Vec<String> = schema
        .fields()
        .iter()
        .map(|field| quote_ident(field.column()))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        columns.join(", "),
        placeholders.join(", ")
    )
}

/// Column types as SQLite reports them, for checking created tables
pub fn declared_columns(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let sql = format!("PRAGMA table_info({})", quote_ident(table));
    let mut stmt = conn.prepare(&sql)?;
    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}
