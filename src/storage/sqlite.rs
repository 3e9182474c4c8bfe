//! SQLite storage implementation

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params_from_iter};

use super::schema;
use crate::query::builder::{BuiltQuery, build_insert, quote_identifier};
use crate::schema::{Column, DefaultValue, EntitySchema, all_entities};
use crate::{Record, Result, Row, Value};

/// SQLite-backed store holding one loaded feed.
///
/// Opened once per process and passed explicitly to every component.
pub struct GtfsStore {
    conn: Connection,
}

impl GtfsStore {
    /// Open a database file (creates if doesn't exist). `:memory:` opens an in-memory store.
    pub fn open(path: &Path) -> Result<Self> {
        if path.as_os_str() == ":memory:" {
            return Self::open_in_memory();
        }
        let conn = Connection::open(path)?;
        tracing::debug!("Opened store at {}", path.display());
        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Close the underlying connection, surfacing any pending error
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }

    // ========== Table Lifecycle ==========

    /// Drop and recreate one entity's table
    pub fn reset_table(&mut self, entity: &EntitySchema) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(&schema::drop_table_statement(entity), [])?;
        tx.execute(&schema::create_table_statement(entity), [])?;
        tx.commit()?;
        Ok(())
    }

    /// Drop and recreate every entity's table
    pub fn reset_all_tables(&mut self) -> Result<()> {
        for entity in all_entities() {
            self.reset_table(entity)?;
        }
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        let found: Option<String> = self
            .conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [table],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    // ========== Bulk Operations ==========

    /// Insert a batch of records as one statement inside one transaction.
    ///
    /// Only schema-declared columns are written. A column some records lack is
    /// bound to its declared default (or NULL), matching what the store would
    /// apply had the column been omitted.
    pub fn insert_records(&mut self, entity: &EntitySchema, records: &[Record]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let columns: Vec<&Column> = entity
            .columns
            .iter()
            .filter(|c| records.iter().any(|r| r.contains_key(c.name)))
            .collect();

        let tx = self.conn.transaction()?;
        if columns.is_empty() {
            let sql = format!(
                "INSERT INTO {} DEFAULT VALUES",
                quote_identifier(entity.name)
            );
            for _ in records {
                tx.execute(&sql, [])?;
            }
        } else {
            let names: Vec<&str> = columns.iter().map(|c| c.name).collect();
            let rows: Vec<Vec<Value>> = records
                .iter()
                .map(|record| {
                    columns
                        .iter()
                        .map(|c| record.get(c.name).cloned().unwrap_or_else(|| default_for(c)))
                        .collect()
                })
                .collect();
            let query = build_insert(entity.name, &names, rows);
            tx.execute(&query.sql, params_from_iter(query.params.iter()))?;
        }
        tx.commit()?;

        Ok(records.len())
    }

    // ========== Retrieval ==========

    /// Run a rendered SELECT and return rows in store order
    pub fn select(&self, query: &BuiltQuery) -> Result<Vec<Row>> {
        tracing::trace!(sql = %query.sql, params = query.params.len(), "select");
        let mut stmt = self.conn.prepare(&query.sql)?;
        let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

        let rows = stmt
            .query_map(params_from_iter(query.params.iter()), |row| {
                names
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| Ok((name.clone(), row.get::<_, Value>(idx)?)))
                    .collect::<rusqlite::Result<Row>>()
            })?
            .collect::<rusqlite::Result<Vec<Row>>>()?;

        Ok(rows)
    }

    /// Run a SELECT and return its first column, skipping NULLs
    pub fn select_values(&self, query: &BuiltQuery) -> Result<Vec<Value>> {
        let mut stmt = self.conn.prepare(&query.sql)?;
        let values = stmt
            .query_map(params_from_iter(query.params.iter()), |row| row.get::<_, Value>(0))?
            .collect::<rusqlite::Result<Vec<Value>>>()?;

        Ok(values.into_iter().filter(|v| !v.is_null()).collect())
    }

    /// Whether a SELECT yields at least one row
    pub fn exists(&self, query: &BuiltQuery) -> Result<bool> {
        let sql = format!("SELECT EXISTS ({})", query.sql);
        let found: bool = self
            .conn
            .query_row(&sql, params_from_iter(query.params.iter()), |row| row.get(0))?;
        Ok(found)
    }

    /// Count rows in a table
    pub fn count(&self, table: &str) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        let mut tables = Vec::new();
        for entity in all_entities() {
            if self.table_exists(entity.name)? {
                tables.push((entity.name, self.count(entity.name)?));
            }
        }
        Ok(DbStats { tables })
    }

    /// Raw connection access for ad-hoc statements in tests
    #[cfg(test)]
    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn default_for(column: &Column) -> Value {
    match column.default {
        Some(DefaultValue::Integer(i)) => Value::Integer(i),
        Some(DefaultValue::Real(f)) => Value::Real(f),
        Some(DefaultValue::Text(s)) => Value::Text(s.to_string()),
        None => Value::Null,
    }
}

/// Database statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub tables: Vec<(&'static str, usize)>,
}

impl DbStats {
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }

    pub fn rows_in(&self, table: &str) -> Option<usize> {
        self.tables.iter().find(|(name, _)| *name == table).map(|(_, n)| *n)
    }
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        for (table, rows) in &self.tables {
            writeln!(f, "  {}: {}", table, rows)?;
        }
        write!(f, "  Total: {}", self.total_rows())
    }
}
