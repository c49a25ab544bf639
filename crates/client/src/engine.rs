//! Engine capability traits and the values they exchange.
//!
//! Responsibilities:
//! - Define the `Engine` and `Session` seams that database drivers implement.
//! - Define `EngineConstructor`, which turns a resolved descriptor into an engine.
//! - Define table metadata and tabular result values.
//!
//! Does NOT handle:
//! - Connection pooling, retries or timeouts (owned by engine implementations).
//! - Caching of clients or table metadata (see `factory` and `client`).
//!
//! Invariants:
//! - Engines are shared across threads behind `Arc<dyn Engine>`.
//! - A `Session` is owned by exactly one caller at a time.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sql_connectors_config::ConnectionDescriptor;

use crate::error::EngineError;

/// Extra engine construction options (pool sizes, echo flags and so on).
///
/// Sorted by key so that equal option sets compare and serialize identically.
pub type EngineOptions = BTreeMap<String, Value>;

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: Option<String>,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: Option<&str>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.map(str::to_string),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// A column of a reflected table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Reflected metadata for one table or view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub table: TableRef,
    pub columns: Vec<Column>,
    #[serde(default)]
    pub is_view: bool,
}

impl TableMetadata {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// Tabular query result: named columns and rows of JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the named column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let index = self.columns.iter().position(|column| column == name)?;
        Some(self.rows.iter().filter_map(|row| row.get(index)).collect())
    }
}

/// A live database engine.
pub trait Engine: fmt::Debug + Send + Sync {
    /// Opens and immediately releases a connection to verify the engine works.
    fn probe(&self) -> Result<(), EngineError>;

    /// Reflects a single table or view.
    fn reflect_table(&self, table: &TableRef) -> Result<TableMetadata, EngineError>;

    /// Reflects every table and view in `schema` (the engine default when `None`).
    fn reflect_schema(&self, schema: Option<&str>) -> Result<Vec<TableMetadata>, EngineError>;

    /// Runs `sql` and collects the result set.
    fn read_table(&self, sql: &str) -> Result<Frame, EngineError>;

    /// Acquires a session for statements and transactions.
    fn open_session(&self) -> Result<Box<dyn Session>, EngineError>;
}

/// A unit of work against an engine.
pub trait Session: Send {
    /// Executes a statement, returning the number of affected rows.
    fn execute(&mut self, sql: &str) -> Result<u64, EngineError>;

    fn commit(&mut self) -> Result<(), EngineError>;

    fn rollback(&mut self) -> Result<(), EngineError>;

    /// Releases the session. Further use is an error.
    fn close(&mut self) -> Result<(), EngineError>;
}

/// Builds engines from resolved connection descriptors.
pub trait EngineConstructor: Send + Sync {
    fn construct(
        &self,
        descriptor: &ConnectionDescriptor,
        options: &EngineOptions,
    ) -> Result<Arc<dyn Engine>, EngineError>;
}

impl<F> EngineConstructor for F
where
    F: Fn(&ConnectionDescriptor, &EngineOptions) -> Result<Arc<dyn Engine>, EngineError>
        + Send
        + Sync,
{
    fn construct(
        &self,
        descriptor: &ConnectionDescriptor,
        options: &EngineOptions,
    ) -> Result<Arc<dyn Engine>, EngineError> {
        self(descriptor, options)
    }
}
